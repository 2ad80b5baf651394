//! Rule file persistence.
//!
//! A rule file is a JSON object mapping rule names to their code lists, in
//! rule order:
//!
//! ```json
//! {
//!   "Konsultation": { "AND": ["00.0010"], "OR": [], "NOT": ["00.0030"] }
//! }
//! ```
//!
//! Anything of another shape is rejected as a whole, including a file that
//! names the same rule twice.

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use tarmed_types::RuleDefinition;
use tracing::debug;

use crate::types::{PackagerError, PackagerResult};

/// Ordered rule name to code lists mapping.
pub type RuleDefinitions = IndexMap<String, RuleDefinition>;

/// Renders rule definitions as pretty-printed JSON.
pub fn to_json(rules: &RuleDefinitions) -> PackagerResult<String> {
    Ok(serde_json::to_string_pretty(rules)?)
}

/// Parses rule definitions.
///
/// # Errors
/// Returns [`PackagerError::Format`] if the input is not an object of
/// `{AND, OR, NOT}` lists. Nothing is returned on partial success.
pub fn from_json(input: &str) -> PackagerResult<RuleDefinitions> {
    serde_json::from_str::<UniqueRules>(input)
        .map(|rules| rules.0)
        .map_err(|e| PackagerError::Format(e.to_string()))
}

/// Rule map that fails on a repeated name instead of keeping the last entry.
struct UniqueRules(RuleDefinitions);

impl<'de> Deserialize<'de> for UniqueRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(UniqueRulesVisitor)
    }
}

struct UniqueRulesVisitor;

impl<'de> Visitor<'de> for UniqueRulesVisitor {
    type Value = UniqueRules;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of rule names to code lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut rules = RuleDefinitions::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, definition)) = map.next_entry::<String, RuleDefinition>()? {
            if rules.contains_key(&name) {
                return Err(de::Error::custom(format!("duplicate rule name '{name}'")));
            }
            rules.insert(name, definition);
        }
        Ok(UniqueRules(rules))
    }
}

/// Writes rule definitions to a file.
pub fn save_rules(path: impl AsRef<Path>, rules: &RuleDefinitions) -> PackagerResult<()> {
    let path = path.as_ref();
    fs::write(path, to_json(rules)?)?;
    debug!("Saved {} rules to {}", rules.len(), path.display());
    Ok(())
}

/// Reads rule definitions from a file.
pub fn load_rules(path: impl AsRef<Path>) -> PackagerResult<RuleDefinitions> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PackagerError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let rules = from_json(&fs::read_to_string(path)?)?;
    debug!("Loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarmed_types::ProcedureCode;

    fn definition(and: &[&str], or: &[&str], not: &[&str]) -> RuleDefinition {
        let codes = |raw: &[&str]| -> Vec<ProcedureCode> {
            raw.iter().map(|c| ProcedureCode::from(*c)).collect()
        };
        RuleDefinition {
            and: codes(and),
            or: codes(or),
            not: codes(not),
        }
    }

    #[test]
    fn test_json_keeps_rule_order() {
        let mut rules = RuleDefinitions::new();
        rules.insert("Zweite".to_string(), definition(&["00.0020"], &[], &[]));
        rules.insert("Erste".to_string(), definition(&[], &["00.0010"], &["00.0030"]));

        let parsed = from_json(&to_json(&rules).unwrap()).unwrap();
        let names: Vec<&str> = parsed.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Zweite", "Erste"]);
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_malformed_input_is_a_format_error() {
        for input in [
            "",
            "[]",
            r#"{"r": {"AND": []}}"#,
            r#"{"r": {"AND": [], "OR": [], "NOT": [], "XOR": []}}"#,
            r#"{"r": {"AND": "00.0010", "OR": [], "NOT": []}}"#,
            r#"{"r": {"AND": ["1"], "OR": [], "NOT": []}, "r": {"AND": ["2"], "OR": [], "NOT": []}}"#,
        ] {
            assert!(
                matches!(from_json(input), Err(PackagerError::Format(_))),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_duplicate_rule_name_names_the_rule() {
        let input = r#"{
            "Konsultation": {"AND": ["00.0010"], "OR": [], "NOT": []},
            "Besuch": {"AND": [], "OR": [], "NOT": []},
            "Konsultation": {"AND": ["00.0020"], "OR": [], "NOT": []}
        }"#;
        match from_json(input) {
            Err(PackagerError::Format(message)) => {
                assert!(message.contains("duplicate rule name 'Konsultation'"), "{message}")
            }
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regeln.json");

        let mut rules = RuleDefinitions::new();
        rules.insert("r".to_string(), definition(&["00.0010"], &["00.0020"], &["00.0030"]));
        save_rules(&path, &rules).unwrap();

        assert_eq!(load_rules(&path).unwrap(), rules);
        assert!(matches!(
            load_rules(dir.path().join("fehlt.json")),
            Err(PackagerError::FileNotFound { .. })
        ));
    }
}
