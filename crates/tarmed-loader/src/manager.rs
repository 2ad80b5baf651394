//! Session state: the case store and the rules bound to it.

use std::fmt;
use std::sync::Arc;

use tarmed_types::ProcedureCode;
use tracing::info;

use crate::export::{export_by_category, export_rules, SheetSink};
use crate::loader::{load_input, LoadedInput};
use crate::packaging::PackagedTable;
use crate::rules::RuleSet;
use crate::store::CaseStore;
use crate::types::{InputFiles, PackagerError, PackagerResult, PackagingConfig};

/// Counters shown in the session summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Distinct cases of the loaded table.
    pub case_count: usize,
    /// Packages of the loaded table.
    pub package_count: usize,
    /// Number of rules.
    pub rule_count: usize,
    /// Name of the active rule.
    pub active_rule: Option<String>,
    /// Distinct cases matched by the active rule.
    pub active_matches: Option<usize>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fälle: {}, Pakete: {}, Regeln: {}, aktive Regel: {} ({} Fälle)",
            self.case_count,
            self.package_count,
            self.rule_count,
            self.active_rule.as_deref().unwrap_or("-"),
            self.active_matches
                .map_or_else(|| "-".to_string(), |n| n.to_string())
        )
    }
}

/// Owns the case store and the rule set and keeps them in sync.
///
/// Every table replacement goes through [`PackageManager::apply`], which
/// rebinds the rules.
#[derive(Debug, Default)]
pub struct PackageManager {
    store: CaseStore,
    rules: RuleSet,
    config: PackagingConfig,
}

impl PackageManager {
    /// Creates an empty session.
    pub fn new(config: PackagingConfig) -> Self {
        Self {
            store: CaseStore::new(),
            rules: RuleSet::new(),
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PackagingConfig {
        &self.config
    }

    /// Returns the case store.
    pub fn store(&self) -> &CaseStore {
        &self.store
    }

    /// Returns the case store for category edits and subscriptions.
    pub fn store_mut(&mut self) -> &mut CaseStore {
        &mut self.store
    }

    /// Returns the rules.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the rules for editing.
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// Returns the categories to package with when the input has none.
    pub fn fallback_categories(&self) -> Option<Vec<ProcedureCode>> {
        let categories = self.store.categories();
        (!categories.is_empty()).then(|| categories.to_vec())
    }

    /// Reads, packages and applies the input files.
    ///
    /// Nothing changes if reading or packaging fails.
    pub fn ingest(&mut self, files: &InputFiles) -> PackagerResult<Arc<PackagedTable>> {
        let fallback = self.fallback_categories();
        let loaded = load_input(files, &self.config, fallback.as_deref())?;
        Ok(self.apply(loaded))
    }

    /// Applies an already loaded input.
    pub fn apply(&mut self, loaded: LoadedInput) -> Arc<PackagedTable> {
        if let Some(categories) = loaded.categories {
            self.store.set_categories(categories);
        }
        self.load_table(loaded.table)
    }

    /// Replaces the table and re-evaluates every rule.
    pub fn load_table(&mut self, table: PackagedTable) -> Arc<PackagedTable> {
        let table = self.store.set_table(table);
        self.rules.bind_table(Some(Arc::clone(&table)));
        info!(
            "Table loaded: {} cases, {} packages",
            table.case_count(),
            table.package_count()
        );
        table
    }

    /// Removes the table. Rules keep their code lists.
    pub fn clear_table(&mut self) {
        self.store.clear_table();
        self.rules.bind_table(None);
    }

    /// Returns the session counters.
    pub fn summary(&self) -> Summary {
        let active = self.rules.active();
        Summary {
            case_count: self.store.case_count(),
            package_count: self.store.package_count(),
            rule_count: self.rules.len(),
            active_rule: active.map(|r| r.name().to_string()),
            active_matches: active.and_then(|r| r.match_count()),
        }
    }

    /// Writes the package sheets using the current category list.
    pub fn export_packages(&self, sink: &mut dyn SheetSink) -> PackagerResult<Vec<String>> {
        let table = self.store.table().ok_or(PackagerError::NoData)?;
        let categories = self.store.categories();
        let categories = (!categories.is_empty()).then_some(categories);
        export_by_category(table, categories, sink)
    }

    /// Writes the aggregated rule matches.
    pub fn export_rules(&self, sink: &mut dyn SheetSink) -> PackagerResult<()> {
        export_rules(&self.rules.export_all()?, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use std::collections::BTreeMap;
    use std::fs;
    use tarmed_types::CodeListKind;

    #[derive(Default)]
    struct MemorySink {
        sheets: BTreeMap<String, Table>,
    }

    impl SheetSink for MemorySink {
        fn write_sheet(&mut self, name: &str, table: &Table) -> PackagerResult<()> {
            self.sheets.insert(name.to_string(), table.clone());
            Ok(())
        }
    }

    fn write_input(dir: &tempfile::TempDir) -> InputFiles {
        let data = dir.path().join("daten.csv");
        fs::write(
            &data,
            "FallNr;Datumsfeld;Tarifgruppe;Leistung\n\
             1;2021-03-01;TARMED;0.001\n\
             1;2021-03-01;TARMED;0.002\n\
             2;2021-03-01;TARMED 01.09;0.001\n\
             2;2021-03-01;Tarmed;0.002\n\
             3;2021-03-02;TARMED;0.003\n",
        )
        .unwrap();
        let categories = dir.path().join("daten_kategorien.csv");
        fs::write(&categories, "0.001\n0.003\n").unwrap();
        InputFiles::new(data).with_categories(categories)
    }

    #[test]
    fn test_ingest_binds_rules_and_categories() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = PackageManager::new(PackagingConfig::semicolon());
        let index = manager.rules_mut().add_rule("Konsultation");
        manager.rules_mut().add_code(index, "0.002", CodeListKind::And);
        manager.rules_mut().set_active(Some(index));

        manager.ingest(&write_input(&dir)).unwrap();
        assert_eq!(manager.store().categories().len(), 2);

        let summary = manager.summary();
        assert_eq!(summary.case_count, 3);
        assert_eq!(summary.package_count, 2);
        assert_eq!(summary.rule_count, 1);
        assert_eq!(summary.active_matches, Some(2));
        assert!(summary.to_string().contains("Konsultation"));
    }

    #[test]
    fn test_failed_ingest_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = PackageManager::new(PackagingConfig::semicolon());
        manager.ingest(&write_input(&dir)).unwrap();
        manager.rules_mut().add_rule("r");

        let broken = dir.path().join("kaputt.csv");
        fs::write(&broken, "FallDatum;Leistung\nC1;1\n").unwrap();
        let err = manager.ingest(&InputFiles::new(broken)).unwrap_err();
        assert!(matches!(err, PackagerError::MissingColumn { .. }));

        assert_eq!(manager.store().case_count(), 3);
        assert_eq!(manager.rules().get(0).unwrap().match_count(), Some(3));
    }

    #[test]
    fn test_summary_without_data() {
        let manager = PackageManager::default();
        let summary = manager.summary();
        assert_eq!(summary.case_count, 0);
        assert_eq!(summary.active_matches, None);
        assert!(summary.to_string().ends_with("aktive Regel: - (- Fälle)"));
    }

    #[test]
    fn test_exports() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = PackageManager::new(PackagingConfig::semicolon());
        let mut sink = MemorySink::default();
        assert!(matches!(manager.export_packages(&mut sink), Err(PackagerError::NoData)));
        assert!(matches!(manager.export_rules(&mut sink), Err(PackagerError::NoRules)));

        manager.ingest(&write_input(&dir)).unwrap();
        manager.rules_mut().add_rule("alle");
        let sheets = manager.export_packages(&mut sink).unwrap();
        assert_eq!(sheets, vec!["Rohdaten", "AllePakete", "00.0010", "00.0030"]);

        manager.export_rules(&mut sink).unwrap();
        assert_eq!(sink.sheets["Regeln"].len(), 3);
    }

    #[test]
    fn test_clear_table_unbinds_rules() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = PackageManager::new(PackagingConfig::semicolon());
        manager.rules_mut().add_rule("r");
        manager.ingest(&write_input(&dir)).unwrap();

        manager.clear_table();
        assert!(!manager.store().has_table());
        assert_eq!(manager.rules().get(0).unwrap().match_count(), None);
    }
}
