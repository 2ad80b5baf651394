//! Procedure code type.
//!
//! TARMED positions are written as `NN.NNNN`. Spreadsheet exports frequently
//! turn them into floats (`0.01`, `35.021`), so every code entering the system
//! goes through [`ProcedureCode::normalize`].

use std::fmt;

/// A billable procedure code in canonical form.
///
/// Numeric codes are rendered with exactly four fractional digits and
/// zero-padded to a width of seven characters. Anything that does not look
/// like a number is kept verbatim.
///
/// # Examples
///
/// ```
/// use tarmed_types::ProcedureCode;
///
/// assert_eq!(ProcedureCode::normalize("0.001").as_str(), "00.0010");
/// assert_eq!(ProcedureCode::normalize("35.021").as_str(), "35.0210");
/// assert_eq!(ProcedureCode::normalize("A-12").as_str(), "A-12");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ProcedureCode(String);

impl ProcedureCode {
    /// Normalizes a raw code into canonical `NN.NNNN` format.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        match parse_numeric(trimmed) {
            Some(value) => Self(format!("{:07.4}", value)),
            None => Self(trimmed.to_string()),
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the code contains `needle` as a substring.
    ///
    /// Used for interactive autocomplete, never for rule evaluation.
    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}

/// Accepts plain decimal numbers only; `inf`, `NaN` and exponents stay verbatim.
fn parse_numeric(value: &str) -> Option<f64> {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    if digits.is_empty()
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        || !digits.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl fmt::Display for ProcedureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProcedureCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProcedureCode {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pads_numeric_codes() {
        assert_eq!(ProcedureCode::normalize("0.01").as_str(), "00.0100");
        assert_eq!(ProcedureCode::normalize("00.0010").as_str(), "00.0010");
        assert_eq!(ProcedureCode::normalize("1.1").as_str(), "01.1000");
        assert_eq!(ProcedureCode::normalize("39.5").as_str(), "39.5000");
        assert_eq!(ProcedureCode::normalize(" 17.011 ").as_str(), "17.0110");
    }

    #[test]
    fn test_normalize_keeps_non_numeric_codes() {
        assert_eq!(ProcedureCode::normalize("abc").as_str(), "abc");
        assert_eq!(ProcedureCode::normalize("NaN").as_str(), "NaN");
        assert_eq!(ProcedureCode::normalize("1e3").as_str(), "1e3");
        assert_eq!(ProcedureCode::normalize("").as_str(), "");
        assert_eq!(ProcedureCode::normalize(".").as_str(), ".");
    }

    #[test]
    fn test_codes_order_lexicographically() {
        let mut codes = vec![
            ProcedureCode::normalize("0.002"),
            ProcedureCode::normalize("0.001"),
            ProcedureCode::normalize("10"),
        ];
        codes.sort();
        let rendered: Vec<&str> = codes.iter().map(ProcedureCode::as_str).collect();
        assert_eq!(rendered, vec!["00.0010", "00.0020", "10.0000"]);
    }
}
