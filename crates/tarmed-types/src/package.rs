//! Package key, package and category types.
//!
//! A package is the class of all cases that bill the same set of relevant
//! procedure codes. The [`PackageKey`] is its canonical name.

use std::collections::BTreeSet;
use std::fmt;

use crate::well_known::{KEY_DELIMITER, REMAINDER_CATEGORY, WITHOUT_RELEVANT_CATEGORY};
use crate::ProcedureCode;

/// Canonical, sorted, comma-joined set of procedure codes.
///
/// Two cases with the same code set produce the same key regardless of
/// order or repeats. Cases without relevant codes have the empty key.
///
/// # Examples
///
/// ```
/// use tarmed_types::{PackageKey, ProcedureCode};
///
/// let a = ["00.0020", "00.0010", "00.0020"].map(ProcedureCode::normalize);
/// let b = ["00.0010", "00.0020"].map(ProcedureCode::normalize);
/// assert_eq!(PackageKey::from_codes(&a), PackageKey::from_codes(&b));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PackageKey(String);

impl PackageKey {
    /// The key of a case without relevant codes.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Builds the canonical key from any collection of codes.
    pub fn from_codes<'a, I>(codes: I) -> Self
    where
        I: IntoIterator<Item = &'a ProcedureCode>,
    {
        let unique: BTreeSet<&str> = codes
            .into_iter()
            .map(ProcedureCode::as_str)
            .filter(|c| !c.is_empty())
            .collect();

        let mut key = String::new();
        for code in unique {
            if !key.is_empty() {
                key.push(KEY_DELIMITER);
            }
            key.push_str(code);
        }
        Self(key)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the key has no codes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the codes of this key in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.split(KEY_DELIMITER).filter(|c| !c.is_empty())
    }

    /// Exact token membership.
    ///
    /// `"00.001"` is not contained in `"00.0010"`; only whole codes match.
    pub fn contains(&self, code: &str) -> bool {
        self.codes().any(|c| c == code)
    }

    /// Returns the number of codes in the key.
    pub fn len(&self) -> usize {
        self.codes().count()
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a package.
///
/// Assigned by first match against an ordered list of discriminator codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// The first category code found in the package key.
    Code(ProcedureCode),
    /// Relevant codes present, but none in the category list (`Restgruppe`).
    Remainder,
    /// No relevant codes at all (`OhneTarmed`).
    WithoutRelevant,
}

impl Category {
    /// Assigns the category of a package key.
    ///
    /// The order of `categories` defines priority: the first listed code that
    /// is a member of the key wins.
    pub fn assign(key: &PackageKey, categories: &[ProcedureCode]) -> Self {
        if key.is_empty() {
            return Self::WithoutRelevant;
        }
        categories
            .iter()
            .find(|c| key.contains(c.as_str()))
            .map(|c| Self::Code(c.clone()))
            .unwrap_or(Self::Remainder)
    }

    /// Returns the label used for sheet names and the `Kategorie` column.
    pub fn label(&self) -> &str {
        match self {
            Self::Code(code) => code.as_str(),
            Self::Remainder => REMAINDER_CATEGORY,
            Self::WithoutRelevant => WITHOUT_RELEVANT_CATEGORY,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A package: all cases sharing one key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Package {
    /// Synthetic id, assigned in first-seen order of the key.
    pub id: usize,
    /// The canonical code set.
    pub key: PackageKey,
    /// Number of distinct cases with this key.
    pub count: usize,
    /// Category, if a category list was supplied.
    pub category: Option<Category>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(raw: &[&str]) -> Vec<ProcedureCode> {
        raw.iter().map(|c| ProcedureCode::normalize(c)).collect()
    }

    #[test]
    fn test_key_is_sorted_and_deduplicated() {
        let key = PackageKey::from_codes(&codes(&["00.0030", "00.0010", "00.0030"]));
        assert_eq!(key.as_str(), "00.0010,00.0030");
        assert_eq!(key.len(), 2);
    }

    #[test]
    fn test_empty_key() {
        let key = PackageKey::from_codes(&codes(&[]));
        assert!(key.is_empty());
        assert_eq!(key.len(), 0);
        assert_eq!(key, PackageKey::empty());
    }

    #[test]
    fn test_contains_is_exact_token_match() {
        let key = PackageKey::from_codes(&codes(&["00.0010", "00.0020"]));
        assert!(key.contains("00.0010"));
        assert!(!key.contains("00.001"));
        assert!(!key.contains("0.0010"));
        assert!(!key.contains("00.0010,00.0020"));
    }

    #[test]
    fn test_category_first_match_wins() {
        let key = PackageKey::from_codes(&codes(&["00.0010", "00.0020"]));
        let categories = codes(&["00.0020", "00.0010"]);
        assert_eq!(
            Category::assign(&key, &categories),
            Category::Code(ProcedureCode::normalize("00.0020"))
        );
    }

    #[test]
    fn test_category_sentinels() {
        let categories = codes(&["00.0050"]);
        assert_eq!(
            Category::assign(&PackageKey::empty(), &categories),
            Category::WithoutRelevant
        );
        let key = PackageKey::from_codes(&codes(&["00.0010"]));
        assert_eq!(Category::assign(&key, &categories), Category::Remainder);
        assert_eq!(Category::assign(&key, &[]).label(), "Restgruppe");
        assert_eq!(Category::WithoutRelevant.label(), "OhneTarmed");
    }
}
