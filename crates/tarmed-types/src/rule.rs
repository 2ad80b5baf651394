//! Rule definition type.
//!
//! The persisted shape of a rule: three ordered code lists. The name lives in
//! the enclosing map of a rule file.

use crate::{CodeListKind, ProcedureCode};

/// The AND/OR/NOT code lists of one rule.
///
/// Lists may contain duplicates or contradicting codes; nothing is validated
/// here. A code that is both required and forbidden simply never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct RuleDefinition {
    /// Codes that must all be present.
    #[cfg_attr(feature = "serde", serde(rename = "AND"))]
    pub and: Vec<ProcedureCode>,
    /// Codes of which at least one must be present.
    #[cfg_attr(feature = "serde", serde(rename = "OR"))]
    pub or: Vec<ProcedureCode>,
    /// Codes that must all be absent.
    #[cfg_attr(feature = "serde", serde(rename = "NOT"))]
    pub not: Vec<ProcedureCode>,
}

impl RuleDefinition {
    /// Returns the codes of one list.
    pub fn codes(&self, kind: CodeListKind) -> &[ProcedureCode] {
        match kind {
            CodeListKind::And => &self.and,
            CodeListKind::Or => &self.or,
            CodeListKind::Not => &self.not,
        }
    }

    /// Returns a mutable reference to one list.
    pub fn codes_mut(&mut self, kind: CodeListKind) -> &mut Vec<ProcedureCode> {
        match kind {
            CodeListKind::And => &mut self.and,
            CodeListKind::Or => &mut self.or,
            CodeListKind::Not => &mut self.not,
        }
    }

    /// Returns true if all three lists are empty.
    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty() && self.not.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_by_kind() {
        let mut rule = RuleDefinition::default();
        assert!(rule.is_empty());

        rule.codes_mut(CodeListKind::Or).push(ProcedureCode::normalize("3"));
        assert_eq!(rule.codes(CodeListKind::Or).len(), 1);
        assert!(rule.codes(CodeListKind::And).is_empty());
        assert!(!rule.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_missing_list_is_rejected() {
        let result: Result<RuleDefinition, _> =
            serde_json::from_str(r#"{"AND": ["00.0010"], "OR": []}"#);
        assert!(result.is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_unknown_list_is_rejected() {
        let result: Result<RuleDefinition, _> =
            serde_json::from_str(r#"{"AND": [], "OR": [], "NOT": [], "XOR": []}"#);
        assert!(result.is_err());
    }
}
