//! Case table container.
//!
//! Holds the currently loaded packaged table, the sorted list of relevant
//! procedure codes found in it and the ordered category list. Every change
//! is announced through the store's own [`Subject`].

use std::collections::BTreeSet;
use std::sync::Arc;

use tarmed_types::ProcedureCode;
use tracing::debug;

use crate::observer::{ObserverId, Subject};
use crate::packaging::PackagedTable;

/// Change announced by a [`CaseStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The table was replaced.
    TableReplaced {
        /// Number of rows of the new table.
        rows: usize,
        /// Number of distinct cases of the new table.
        cases: usize,
    },
    /// The table was removed.
    TableCleared,
    /// The category list changed.
    CategoriesChanged,
}

/// In-memory container for the loaded case table.
///
/// The table is shared as `Arc` so rules and export snapshots can hold it
/// without copying.
#[derive(Debug, Default)]
pub struct CaseStore {
    table: Option<Arc<PackagedTable>>,
    /// Relevant codes of the table, sorted and unique.
    codes: Vec<ProcedureCode>,
    /// Category discriminators in priority order.
    categories: Vec<ProcedureCode>,
    observers: Subject<StoreEvent>,
}

impl CaseStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the table and recomputes the unique code list.
    pub fn set_table(&mut self, table: PackagedTable) -> Arc<PackagedTable> {
        let unique: BTreeSet<&ProcedureCode> = table.relevant_codes().collect();
        self.codes = unique.into_iter().cloned().collect();

        let event = StoreEvent::TableReplaced {
            rows: table.row_count(),
            cases: table.case_count(),
        };
        let table = Arc::new(table);
        self.table = Some(Arc::clone(&table));
        debug!("Case table replaced, {} unique codes", self.codes.len());

        self.observers.notify(&event);
        table
    }

    /// Removes the table.
    pub fn clear_table(&mut self) {
        self.table = None;
        self.codes.clear();
        self.observers.notify(&StoreEvent::TableCleared);
    }

    /// Returns the loaded table.
    pub fn table(&self) -> Option<&Arc<PackagedTable>> {
        self.table.as_ref()
    }

    /// Returns true if a table is loaded.
    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }

    /// Returns the unique relevant codes in alphabetical order, optionally
    /// restricted to codes containing `filter`.
    pub fn unique_codes(&self, filter: Option<&str>) -> Vec<&ProcedureCode> {
        match filter {
            Some(needle) if !needle.is_empty() => {
                self.codes.iter().filter(|c| c.contains(needle)).collect()
            }
            _ => self.codes.iter().collect(),
        }
    }

    /// Returns true if `code` occurs in the loaded table.
    ///
    /// Always false when no table is loaded.
    pub fn has_code(&self, code: &str) -> bool {
        let code = ProcedureCode::normalize(code);
        self.codes.binary_search(&code).is_ok()
    }

    /// Returns the number of distinct cases, 0 without a table.
    pub fn case_count(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.case_count())
    }

    /// Returns the number of packages, 0 without a table.
    pub fn package_count(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.package_count())
    }

    /// Returns the category list in priority order.
    pub fn categories(&self) -> &[ProcedureCode] {
        &self.categories
    }

    /// Replaces the category list.
    pub fn set_categories(&mut self, categories: Vec<ProcedureCode>) {
        self.categories = categories;
        self.observers.notify(&StoreEvent::CategoriesChanged);
    }

    /// Appends a category unless already present.
    ///
    /// Returns true if the category was added.
    pub fn add_category(&mut self, code: &str) -> bool {
        let code = ProcedureCode::normalize(code);
        if self.categories.contains(&code) {
            return false;
        }
        self.categories.push(code);
        self.observers.notify(&StoreEvent::CategoriesChanged);
        true
    }

    /// Removes the categories at the given positions. Unknown positions are ignored.
    pub fn remove_categories(&mut self, indices: &[usize]) {
        let mut index = 0;
        self.categories.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
        self.observers.notify(&StoreEvent::CategoriesChanged);
    }

    /// Removes all categories.
    pub fn clear_categories(&mut self) {
        self.categories.clear();
        self.observers.notify(&StoreEvent::CategoriesChanged);
    }

    /// Registers a change callback.
    pub fn subscribe<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(&StoreEvent) + Send + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Removes a change callback.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }
}
