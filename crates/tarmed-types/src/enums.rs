//! Enumeration types.

use std::fmt;
use std::str::FromStr;

/// The three code lists of a rule.
///
/// # Examples
///
/// ```
/// use tarmed_types::CodeListKind;
///
/// assert_eq!("und".parse::<CodeListKind>(), Ok(CodeListKind::And));
/// assert_eq!(CodeListKind::Not.as_str(), "NOT");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum CodeListKind {
    /// Every code must be present.
    And,
    /// At least one code must be present; vacuously true when empty.
    Or,
    /// No code may be present.
    Not,
}

impl CodeListKind {
    /// All kinds in display order.
    pub const ALL: [CodeListKind; 3] = [Self::And, Self::Or, Self::Not];

    /// Returns the persisted name of this list.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

impl fmt::Display for CodeListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a code list name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCodeListKindError(pub String);

impl fmt::Display for ParseCodeListKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown code list '{}' (expected AND, OR or NOT)", self.0)
    }
}

impl std::error::Error for ParseCodeListKindError {}

impl FromStr for CodeListKind {
    type Err = ParseCodeListKindError;

    /// Accepts the English and German list names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" | "UND" => Ok(Self::And),
            "OR" | "ODER" => Ok(Self::Or),
            "NOT" | "NICHT" => Ok(Self::Not),
            _ => Err(ParseCodeListKindError(s.to_string())),
        }
    }
}
