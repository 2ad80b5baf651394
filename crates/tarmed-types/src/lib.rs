//! # tarmed-types
//!
//! Type definitions for TARMED billing data.
//!
//! This crate provides the plain data types shared by the packaging engine
//! and the rule model: procedure codes, case identifiers, line items,
//! package keys, categories and rule definitions.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!   Disable this feature for zero-dependency usage.
//!
//! ## Usage
//!
//! ```rust
//! use tarmed_types::{Category, PackageKey, ProcedureCode};
//!
//! let codes = [ProcedureCode::normalize("0.002"), ProcedureCode::normalize("0.001")];
//! let key = PackageKey::from_codes(&codes);
//! assert_eq!(key.as_str(), "00.0010,00.0020");
//!
//! let category = Category::assign(&key, &[ProcedureCode::normalize("0.002")]);
//! assert_eq!(category.label(), "00.0020");
//! ```

#![warn(missing_docs)]

mod case;
mod code;
mod enums;
mod package;
mod rule;
pub mod well_known;

// Re-export all public types at crate root
pub use case::{CaseId, LineItem};
pub use code::ProcedureCode;
pub use enums::{CodeListKind, ParseCodeListKindError};
pub use package::{Category, Package, PackageKey};
pub use rule::RuleDefinition;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_are_exported() {
        let _code = ProcedureCode::normalize("00.0010");
        let _case = CaseId::new("C1");
        let _kind = CodeListKind::And;
        let _key = PackageKey::empty();
        let _rule = RuleDefinition::default();
    }

    #[test]
    fn test_well_known_accessible() {
        assert_eq!(well_known::KEY_DELIMITER, ',');
        assert_eq!(well_known::REMAINDER_CATEGORY, "Restgruppe");
        assert_eq!(well_known::WITHOUT_RELEVANT_CATEGORY, "OhneTarmed");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let mut rule = RuleDefinition::default();
        rule.codes_mut(CodeListKind::And).push(ProcedureCode::normalize("1"));
        rule.codes_mut(CodeListKind::Not).push(ProcedureCode::normalize("2"));

        let json = serde_json::to_string(&rule).unwrap();
        let parsed: RuleDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(rule, parsed);
    }
}
