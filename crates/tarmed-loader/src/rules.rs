//! Rule collection.
//!
//! An ordered list of [`Rule`]s sharing one case table, with an optional
//! active rule. Out-of-range indices are ignored everywhere; they come from
//! stale selections and are not worth an error.

use std::sync::Arc;

use tarmed_types::CodeListKind;
use tracing::debug;

use crate::observer::{ObserverId, Subject};
use crate::packaging::PackagedTable;
use crate::persist::{self, RuleDefinitions};
use crate::rule::Rule;
use crate::table::Table;
use crate::types::{PackagerError, PackagerResult};

/// Change announced by a [`RuleSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEvent {
    /// A rule was appended.
    Added(usize),
    /// A rule was renamed.
    Renamed(usize),
    /// A rule was removed.
    Removed(usize),
    /// All rules were removed.
    Cleared,
    /// The active rule changed.
    ActiveChanged(Option<usize>),
    /// A code list of a rule changed.
    CodesChanged(usize),
    /// Every rule was re-evaluated against a new table.
    Reevaluated,
    /// The rules were replaced from a rule file.
    Restored(usize),
}

/// The ordered rules of a session.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    active: Option<usize>,
    table: Option<Arc<PackagedTable>>,
    observers: Subject<RuleEvent>,
}

impl RuleSet {
    /// Creates an empty collection without a table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rules in order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns a rule by index.
    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Appends an empty rule bound to the current table. Returns its index.
    pub fn add_rule(&mut self, name: impl Into<String>) -> usize {
        self.rules.push(Rule::new(name, self.table.clone()));
        let index = self.rules.len() - 1;
        self.observers.notify(&RuleEvent::Added(index));
        index
    }

    /// Removes a rule.
    ///
    /// The active rule is cleared if it was removed and shifted if it
    /// followed the removed one.
    pub fn remove_rule(&mut self, index: usize) {
        if index >= self.rules.len() {
            return;
        }
        self.rules.remove(index);
        self.active = match self.active {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        self.observers.notify(&RuleEvent::Removed(index));
    }

    /// Renames a rule.
    pub fn rename_rule(&mut self, index: usize, name: impl Into<String>) {
        if let Some(rule) = self.rules.get_mut(index) {
            rule.set_name(name);
            self.observers.notify(&RuleEvent::Renamed(index));
        }
    }

    /// Removes every rule.
    pub fn clear_all(&mut self) {
        self.rules.clear();
        self.active = None;
        self.observers.notify(&RuleEvent::Cleared);
    }

    /// Returns the index of the active rule.
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Returns the active rule.
    pub fn active(&self) -> Option<&Rule> {
        self.active.and_then(|i| self.rules.get(i))
    }

    /// Marks a rule active, or none.
    pub fn set_active(&mut self, index: Option<usize>) {
        if matches!(index, Some(i) if i >= self.rules.len()) {
            return;
        }
        self.active = index;
        self.observers.notify(&RuleEvent::ActiveChanged(index));
    }

    /// Appends a code to a list of a rule.
    pub fn add_code(&mut self, index: usize, code: &str, kind: CodeListKind) {
        self.edit(index, |rule| rule.add_code(code, kind));
    }

    /// Removes codes by position from a list of a rule.
    pub fn remove_codes(&mut self, index: usize, positions: &[usize], kind: CodeListKind) {
        self.edit(index, |rule| rule.remove_codes(positions, kind));
    }

    /// Empties a list of a rule.
    pub fn clear_codes(&mut self, index: usize, kind: CodeListKind) {
        self.edit(index, |rule| rule.clear(kind));
    }

    fn edit<F>(&mut self, index: usize, f: F)
    where
        F: FnOnce(&mut Rule),
    {
        if let Some(rule) = self.rules.get_mut(index) {
            f(rule);
            self.observers.notify(&RuleEvent::CodesChanged(index));
        }
    }

    /// Binds every rule to a new table and re-evaluates.
    pub fn bind_table(&mut self, table: Option<Arc<PackagedTable>>) {
        for rule in &mut self.rules {
            rule.bind_table(table.clone());
        }
        self.table = table;
        debug!("Re-evaluated {} rules", self.rules.len());
        self.observers.notify(&RuleEvent::Reevaluated);
    }

    /// Returns the table the rules are bound to.
    pub fn table(&self) -> Option<&Arc<PackagedTable>> {
        self.table.as_ref()
    }

    /// Concatenates the matches of every rule, one row per case and rule.
    ///
    /// A case matched by two rules appears twice, once labeled with each
    /// rule name.
    ///
    /// # Errors
    /// [`PackagerError::NoRules`] without rules, then [`PackagerError::NoData`]
    /// without a table.
    pub fn export_all(&self) -> PackagerResult<Table> {
        let Some(first) = self.rules.first() else {
            return Err(PackagerError::NoRules);
        };
        if self.table.is_none() {
            return Err(PackagerError::NoData);
        }

        let mut result = first.unique_case_matches();
        for rule in &self.rules[1..] {
            result.extend(rule.unique_case_matches());
        }
        debug!("Exported {} rule matches", result.len());
        Ok(result)
    }

    /// Returns the code lists of every rule by name.
    ///
    /// # Errors
    /// [`PackagerError::Format`] if two rules share a name, since a rule file
    /// cannot hold both.
    pub fn definitions(&self) -> PackagerResult<RuleDefinitions> {
        let mut definitions = RuleDefinitions::with_capacity(self.rules.len());
        for rule in &self.rules {
            let name = rule.name().to_string();
            if definitions.contains_key(&name) {
                return Err(PackagerError::Format(format!("duplicate rule name '{name}'")));
            }
            definitions.insert(name, rule.definition().clone());
        }
        Ok(definitions)
    }

    /// Replaces every rule, bound to the current table. No rule is active
    /// afterwards.
    pub fn replace_definitions(&mut self, definitions: RuleDefinitions) {
        self.rules = definitions
            .into_iter()
            .map(|(name, definition)| Rule::from_definition(name, definition, self.table.clone()))
            .collect();
        self.active = None;
        self.observers.notify(&RuleEvent::Restored(self.rules.len()));
    }

    /// Serializes the rules to JSON.
    pub fn persist(&self) -> PackagerResult<String> {
        persist::to_json(&self.definitions()?)
    }

    /// Replaces the rules from JSON.
    ///
    /// # Errors
    /// [`PackagerError::Format`] on malformed input; the current rules are
    /// kept in that case.
    pub fn restore(&mut self, input: &str) -> PackagerResult<()> {
        let definitions = persist::from_json(input)?;
        self.replace_definitions(definitions);
        Ok(())
    }

    /// Registers a change callback.
    pub fn subscribe<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(&RuleEvent) + Send + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Removes a change callback.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }
}
