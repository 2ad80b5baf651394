//! Rule model.
//!
//! A rule is a named AND/OR/NOT predicate over the codes of a package key.
//! Its match set is cached and recomputed synchronously after every mutation
//! and whenever the backing table is replaced.

use std::sync::Arc;

use tarmed_types::well_known::RULE_COLUMN;
use tarmed_types::{CodeListKind, PackageKey, ProcedureCode, RuleDefinition};

use crate::packaging::{default_output_columns, PackagedTable};
use crate::table::Table;

/// A named rule bound to the current case table.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    definition: RuleDefinition,
    table: Option<Arc<PackagedTable>>,
    /// Matching row indices in table order; `None` without a table.
    matches: Option<Vec<usize>>,
}

impl Rule {
    /// Creates an empty rule.
    pub fn new(name: impl Into<String>, table: Option<Arc<PackagedTable>>) -> Self {
        Self::from_definition(name, RuleDefinition::default(), table)
    }

    /// Creates a rule from persisted code lists.
    ///
    /// Codes are normalized on the way in.
    pub fn from_definition(
        name: impl Into<String>,
        definition: RuleDefinition,
        table: Option<Arc<PackagedTable>>,
    ) -> Self {
        let mut normalized = RuleDefinition::default();
        for kind in CodeListKind::ALL {
            *normalized.codes_mut(kind) = definition
                .codes(kind)
                .iter()
                .map(|c| ProcedureCode::normalize(c.as_str()))
                .collect();
        }

        let mut rule = Self {
            name: name.into(),
            definition: normalized,
            table,
            matches: None,
        };
        rule.refresh();
        rule
    }

    /// Returns the rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the rule.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the code lists.
    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    /// Returns the codes of one list.
    pub fn codes(&self, kind: CodeListKind) -> &[ProcedureCode] {
        self.definition.codes(kind)
    }

    /// Appends a normalized code to a list.
    pub fn add_code(&mut self, code: &str, kind: CodeListKind) {
        self.definition
            .codes_mut(kind)
            .push(ProcedureCode::normalize(code));
        self.refresh();
    }

    /// Removes the code at `index` from a list.
    pub fn remove_code(&mut self, index: usize, kind: CodeListKind) {
        self.remove_codes(&[index], kind);
    }

    /// Removes the codes at the given positions. Unknown positions are ignored.
    pub fn remove_codes(&mut self, indices: &[usize], kind: CodeListKind) {
        let mut index = 0;
        self.definition.codes_mut(kind).retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
        self.refresh();
    }

    /// Empties a list.
    pub fn clear(&mut self, kind: CodeListKind) {
        self.definition.codes_mut(kind).clear();
        self.refresh();
    }

    /// Binds the rule to another table and re-evaluates.
    pub fn bind_table(&mut self, table: Option<Arc<PackagedTable>>) {
        self.table = table;
        self.refresh();
    }

    /// Returns true if a package key satisfies the rule.
    ///
    /// Membership is exact token membership in the delimited key. An empty
    /// OR list is vacuously satisfied.
    pub fn is_satisfied_by(&self, key: &PackageKey) -> bool {
        let all = self.definition.and.iter().all(|c| key.contains(c.as_str()));
        let any = self.definition.or.is_empty()
            || self.definition.or.iter().any(|c| key.contains(c.as_str()));
        let none = !self.definition.not.iter().any(|c| key.contains(c.as_str()));
        all && any && none
    }

    /// Evaluates the rule against a sequence of package keys.
    pub fn evaluate<'a, I>(&self, keys: I) -> Vec<bool>
    where
        I: IntoIterator<Item = &'a PackageKey>,
    {
        keys.into_iter().map(|k| self.is_satisfied_by(k)).collect()
    }

    /// Recomputes the cached match set.
    fn refresh(&mut self) {
        self.matches = self.table.as_ref().map(|table| {
            let satisfied = self.evaluate(table.packages().iter().map(|p| &p.key));
            table
                .rows()
                .iter()
                .enumerate()
                .filter(|(_, row)| satisfied[row.package_id])
                .map(|(index, _)| index)
                .collect()
        });
    }

    /// Returns the matching row indices, `None` without a table.
    pub fn matched_rows(&self) -> Option<&[usize]> {
        self.matches.as_deref()
    }

    /// Returns the number of distinct matching cases, `None` without a table.
    pub fn match_count(&self) -> Option<usize> {
        let table = self.table.as_ref()?;
        let matches = self.matches.as_ref()?;
        let mut seen = vec![false; table.case_count()];
        Some(
            matches
                .iter()
                .filter(|&&row| {
                    let case = table.rows()[row].case_index;
                    !std::mem::replace(&mut seen[case], true)
                })
                .count(),
        )
    }

    /// Returns the matching rows labeled with the rule name.
    ///
    /// Without a table, or without matches, the result is an empty table that
    /// still has every column including `Regel`.
    pub fn matches(&self) -> Table {
        self.labeled(self.matches.iter().flatten().copied())
    }

    /// Like [`Rule::matches`], but keeps only the first row of each case.
    pub fn unique_case_matches(&self) -> Table {
        let Some(table) = self.table.as_ref() else {
            return self.labeled(std::iter::empty());
        };
        let mut seen = vec![false; table.case_count()];
        let rows: Vec<usize> = self
            .matches
            .iter()
            .flatten()
            .copied()
            .filter(|&row| {
                let case = table.rows()[row].case_index;
                !std::mem::replace(&mut seen[case], true)
            })
            .collect();
        self.labeled(rows)
    }

    fn labeled<I>(&self, rows: I) -> Table
    where
        I: IntoIterator<Item = usize>,
    {
        let Some(table) = self.table.as_ref() else {
            let mut columns = default_output_columns();
            columns.push(RULE_COLUMN.to_string());
            return Table::empty(columns);
        };

        let categories = table.stored_categories();
        let mut columns = table.output_columns(categories.is_some());
        columns.push(RULE_COLUMN.to_string());

        let mut result = Table::empty(columns);
        for index in rows {
            let mut row = table.render_row(index, categories.as_deref());
            row.push(self.name.clone());
            result.push_row(row);
        }
        result
    }
}
