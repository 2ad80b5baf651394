//! Packaging engine.
//!
//! Groups line items into packages keyed by the set of relevant procedure
//! codes of their case, counts the cases per package and assigns categories.
//!
//! ## Ordering
//!
//! Cases are visited in first-seen order while scanning rows top to bottom,
//! and package ids are handed out in the order their key is first seen during
//! that scan. The same input therefore always yields the same ids.
//!
//! ```ignore
//! let table = read_table("daten.csv", b',')?;
//! let packaged = build_packages(&table, Some(categories.as_slice()), &PackagingConfig::default())?;
//! for package in packaged.packages() {
//!     println!("{} x{} {}", package.id, package.count, package.key);
//! }
//! ```

use std::cmp::Reverse;

use indexmap::IndexMap;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tarmed_types::well_known::{CASE_ID_COLUMN, CATEGORY_COLUMN, DERIVED_COLUMNS, INPUT_COLUMNS};
use tarmed_types::{CaseId, Category, LineItem, Package, PackageKey, ProcedureCode};
use tracing::debug;

use crate::line_item::CaseSchema;
use crate::table::Table;
use crate::types::{PackagingConfig, PackagerResult};

/// One case of a packaged table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedCase {
    /// Case identifier.
    pub id: CaseId,
    /// Package the case belongs to.
    pub package_id: usize,
    /// Key over every code of the case, regardless of tariff.
    pub key_all: PackageKey,
}

/// One line item of a packaged table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedRow {
    /// The source line item.
    pub item: LineItem,
    /// Index into [`PackagedTable::cases`].
    pub case_index: usize,
    /// Package id, shared by every row of the case.
    pub package_id: usize,
    /// Whether the item belongs to the relevant tariff system.
    pub relevant: bool,
}

/// A line item table augmented with package key, id, count and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedTable {
    columns: Vec<String>,
    rows: Vec<PackagedRow>,
    cases: Vec<PackagedCase>,
    packages: Vec<Package>,
    categorized: bool,
}

/// Computes the packages of a line item table.
///
/// Required columns are checked before any grouping happens. When
/// `categories` is `None` the packages carry no category.
///
/// # Errors
/// Returns [`crate::PackagerError::MissingColumn`] if a required column is
/// absent, or a row-level error if a row cannot be converted.
pub fn build_packages(
    table: &Table,
    categories: Option<&[ProcedureCode]>,
    config: &PackagingConfig,
) -> PackagerResult<PackagedTable> {
    let schema = CaseSchema::resolve(table.columns())?;
    let items = schema.line_items(table)?;
    let columns = schema.output_columns(table.columns());
    Ok(PackagedTable::from_items(columns, items, categories, config))
}

impl PackagedTable {
    /// Packages already converted line items.
    ///
    /// `columns` names the entries of each item's `values`.
    pub fn from_items(
        columns: Vec<String>,
        items: Vec<LineItem>,
        categories: Option<&[ProcedureCode]>,
        config: &PackagingConfig,
    ) -> Self {
        // Rows of each case, cases in first-seen order
        let mut case_rows: IndexMap<CaseId, Vec<usize>> = IndexMap::new();
        for (index, item) in items.iter().enumerate() {
            case_rows.entry(item.case_id.clone()).or_default().push(index);
        }

        let relevant: Vec<bool> = items
            .iter()
            .map(|item| item.is_relevant(&config.relevant_tariff))
            .collect();
        let groups: Vec<(&CaseId, &Vec<usize>)> = case_rows.iter().collect();
        let case_keys = compute_case_keys(&groups, &items, &relevant);

        // Ids in first-seen order of keys; each case is counted once
        let mut package_counts: IndexMap<PackageKey, usize> = IndexMap::new();
        let mut cases = Vec::with_capacity(groups.len());
        for ((case_id, _), (key, key_all)) in groups.iter().zip(case_keys) {
            let entry = package_counts.entry(key);
            let package_id = entry.index();
            *entry.or_insert(0) += 1;
            cases.push(PackagedCase {
                id: (*case_id).clone(),
                package_id,
                key_all,
            });
        }

        let packages: Vec<Package> = package_counts
            .into_iter()
            .enumerate()
            .map(|(id, (key, count))| {
                let category = categories.map(|c| Category::assign(&key, c));
                Package {
                    id,
                    key,
                    count,
                    category,
                }
            })
            .collect();

        let mut row_case = vec![0; items.len()];
        for (case_index, rows) in case_rows.values().enumerate() {
            for &row in rows {
                row_case[row] = case_index;
            }
        }

        let rows: Vec<PackagedRow> = items
            .into_iter()
            .zip(row_case)
            .zip(relevant)
            .map(|((item, case_index), relevant)| PackagedRow {
                item,
                case_index,
                package_id: cases[case_index].package_id,
                relevant,
            })
            .collect();

        debug!(
            "Packaged {} rows of {} cases into {} packages",
            rows.len(),
            cases.len(),
            packages.len()
        );

        Self {
            columns,
            rows,
            cases,
            packages,
            categorized: categories.is_some(),
        }
    }

    /// Returns the source columns (plus a derived `FallDatum`).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows in source order.
    pub fn rows(&self) -> &[PackagedRow] {
        &self.rows
    }

    /// Returns the cases in first-seen order.
    pub fn cases(&self) -> &[PackagedCase] {
        &self.cases
    }

    /// Returns the packages ordered by id.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Returns a package by id.
    pub fn package(&self, id: usize) -> Option<&Package> {
        self.packages.get(id)
    }

    /// Returns the package of a row.
    pub fn package_of(&self, row: &PackagedRow) -> &Package {
        &self.packages[row.package_id]
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of distinct cases.
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// Returns the number of packages.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Returns true if categories were assigned while packaging.
    pub fn is_categorized(&self) -> bool {
        self.categorized
    }

    /// Returns the codes of relevant line items, unsorted and with repeats.
    pub fn relevant_codes(&self) -> impl Iterator<Item = &ProcedureCode> {
        self.rows.iter().filter(|r| r.relevant).map(|r| &r.item.code)
    }

    /// Returns the output columns, optionally with `Kategorie`.
    pub fn output_columns(&self, with_category: bool) -> Vec<String> {
        let mut columns = self.columns.clone();
        columns.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));
        if with_category {
            columns.push(CATEGORY_COLUMN.to_string());
        }
        columns
    }

    /// Returns the category of every package as assigned while packaging.
    pub fn stored_categories(&self) -> Option<Vec<Category>> {
        if !self.categorized {
            return None;
        }
        self.packages.iter().map(|p| p.category.clone()).collect()
    }

    /// Assigns categories for the given list without modifying the table.
    pub fn categorize(&self, categories: &[ProcedureCode]) -> Vec<Category> {
        self.packages
            .iter()
            .map(|p| Category::assign(&p.key, categories))
            .collect()
    }

    /// Renders one row with its derived columns.
    ///
    /// `categories` is indexed by package id and must come from
    /// [`Self::categorize`] or [`Self::stored_categories`] of this table.
    pub(crate) fn render_row(&self, index: usize, categories: Option<&[Category]>) -> Vec<String> {
        let row = &self.rows[index];
        let package = &self.packages[row.package_id];
        let mut values = row.item.values.clone();
        values.push(package.key.as_str().to_string());
        values.push(self.cases[row.case_index].key_all.as_str().to_string());
        values.push(package.id.to_string());
        values.push(package.count.to_string());
        if let Some(categories) = categories {
            values.push(categories[row.package_id].label().to_string());
        }
        values
    }

    /// Builds an output table from selected row indices, all below
    /// [`Self::row_count`].
    pub(crate) fn select<I>(&self, rows: I, categories: Option<&[Category]>) -> Table
    where
        I: IntoIterator<Item = usize>,
    {
        let mut table = Table::empty(self.output_columns(categories.is_some()));
        for index in rows {
            table.push_row(self.render_row(index, categories));
        }
        table
    }

    /// Returns the full augmented table.
    pub fn to_table(&self) -> Table {
        let categories = self.stored_categories();
        self.select(0..self.rows.len(), categories.as_deref())
    }

    /// Picks one representative row per case among `rows`.
    ///
    /// The first row of each case wins. Representatives are ordered by
    /// descending package count; ties keep package id order, and rows of the
    /// same package keep their input order.
    pub fn representatives<I>(&self, rows: I) -> Vec<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut seen = vec![false; self.cases.len()];
        let mut picked: Vec<usize> = rows
            .into_iter()
            .filter(|&index| {
                let case = self.rows[index].case_index;
                !std::mem::replace(&mut seen[case], true)
            })
            .collect();

        picked.sort_by_key(|&index| {
            let package = &self.packages[self.rows[index].package_id];
            (Reverse(package.count), package.id)
        });
        picked
    }
}

/// Columns of an output table before any data has been loaded.
pub fn default_output_columns() -> Vec<String> {
    INPUT_COLUMNS
        .iter()
        .copied()
        .chain([CASE_ID_COLUMN])
        .chain(DERIVED_COLUMNS)
        .map(str::to_string)
        .collect()
}

fn case_key(rows: &[usize], items: &[LineItem], relevant: &[bool]) -> (PackageKey, PackageKey) {
    let key = PackageKey::from_codes(
        rows.iter()
            .filter(|&&r| relevant[r])
            .map(|&r| &items[r].code),
    );
    let key_all = PackageKey::from_codes(rows.iter().map(|&r| &items[r].code));
    (key, key_all)
}

#[cfg(feature = "parallel")]
fn compute_case_keys(
    groups: &[(&CaseId, &Vec<usize>)],
    items: &[LineItem],
    relevant: &[bool],
) -> Vec<(PackageKey, PackageKey)> {
    groups
        .par_iter()
        .map(|(_, rows)| case_key(rows, items, relevant))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn compute_case_keys(
    groups: &[(&CaseId, &Vec<usize>)],
    items: &[LineItem],
    relevant: &[bool],
) -> Vec<(PackageKey, PackageKey)> {
    groups
        .iter()
        .map(|(_, rows)| case_key(rows, items, relevant))
        .collect()
}
