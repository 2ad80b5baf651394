//! Sheet export.
//!
//! The packaged table is written as a series of named sheets: the full
//! augmented table, one representative per case, then one sheet per
//! category. Where a sheet ends up is up to the [`SheetSink`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tarmed_types::well_known::{ALL_PACKAGES_SHEET, PACKAGE_ID_COLUMN, RAW_SHEET, RULES_SHEET};
use tarmed_types::{Category, ProcedureCode};
use tracing::{debug, warn};

use crate::packaging::PackagedTable;
use crate::table::Table;
use crate::types::{PackagerResult, PackagingConfig};

/// Name of the band column written by [`CsvSheetSink`].
pub const BAND_COLUMN: &str = "Band";

/// Destination for named sheets.
pub trait SheetSink {
    /// Writes one sheet.
    fn write_sheet(&mut self, name: &str, table: &Table) -> PackagerResult<()>;
}

/// Band flag per row: toggles wherever the value differs from the previous
/// row. The first run is unshaded.
pub fn band_flags<T: PartialEq>(values: &[T]) -> Vec<bool> {
    let mut shaded = false;
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            if i > 0 && values[i - 1] != *value {
                shaded = !shaded;
            }
            shaded
        })
        .collect()
}

/// Band flags of a table, derived from its package id column.
///
/// All false if the table has no package id column.
pub fn bands(table: &Table) -> Vec<bool> {
    match table.column_values(PACKAGE_ID_COLUMN) {
        Some(ids) => band_flags(&ids.collect::<Vec<_>>()),
        None => vec![false; table.len()],
    }
}

/// Writes every sheet as `<dir>/<sheet>.csv`.
///
/// Characters other than alphanumerics, `.`, `-` and `_` become `_`. Sheets
/// whose names end up on the same file get a `_2`, `_3`, ... suffix in
/// write order.
#[derive(Debug, Clone)]
pub struct CsvSheetSink {
    dir: PathBuf,
    delimiter: u8,
    band_column: bool,
    files: HashMap<String, PathBuf>,
}

impl CsvSheetSink {
    /// Creates the output directory if needed.
    pub fn create(dir: impl AsRef<Path>, config: &PackagingConfig) -> PackagerResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            delimiter: config.delimiter,
            band_column: config.band_column,
            files: HashMap::new(),
        })
    }

    /// Returns the output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a sheet was written to, if it was.
    pub fn sheet_path(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }

    /// Picks the file for a sheet. A sheet written again keeps its file.
    fn assign_path(&mut self, name: &str) -> PathBuf {
        if let Some(path) = self.files.get(name) {
            return path.clone();
        }

        let base: String = name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let taken: HashSet<&PathBuf> = self.files.values().collect();
        let mut path = self.dir.join(format!("{base}.csv"));
        let mut suffix = 2;
        while taken.contains(&path) {
            path = self.dir.join(format!("{base}_{suffix}.csv"));
            suffix += 1;
        }

        if suffix > 2 {
            warn!("Sheet {} shares its file name, writing {}", name, path.display());
        }
        self.files.insert(name.to_string(), path.clone());
        path
    }
}

impl SheetSink for CsvSheetSink {
    fn write_sheet(&mut self, name: &str, table: &Table) -> PackagerResult<()> {
        let path = self.assign_path(name);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&path)?;

        if self.band_column {
            let flags = bands(table);
            writer.write_record(table.columns().iter().map(String::as_str).chain([BAND_COLUMN]))?;
            for (row, shaded) in table.rows().iter().zip(flags) {
                let band = if shaded { "1" } else { "0" };
                writer.write_record(row.iter().map(String::as_str).chain([band]))?;
            }
        } else {
            writer.write_record(table.columns())?;
            for row in table.rows() {
                writer.write_record(row)?;
            }
        }

        writer.flush()?;
        debug!("Wrote sheet {} ({} rows) to {}", name, table.len(), path.display());
        Ok(())
    }
}

/// Writes the raw sheet, the representatives sheet and one sheet per category.
///
/// `categories` overrides the categories assigned while packaging. Category
/// sheets follow the list order (package id order for assigned categories),
/// then `Restgruppe` and `OhneTarmed`. Sheets without rows are skipped.
/// Returns the names of the written sheets.
pub fn export_by_category(
    table: &PackagedTable,
    categories: Option<&[ProcedureCode]>,
    sink: &mut dyn SheetSink,
) -> PackagerResult<Vec<String>> {
    let (assigned, order) = match categories {
        Some(list) => (Some(table.categorize(list)), list.to_vec()),
        None => {
            let stored = table.stored_categories();
            let order = stored
                .iter()
                .flatten()
                .filter_map(|category| match category {
                    Category::Code(code) => Some(code.clone()),
                    _ => None,
                })
                .collect();
            (stored, order)
        }
    };
    let assigned = assigned.as_deref();
    let all_rows = 0..table.row_count();

    let mut written = Vec::new();
    sink.write_sheet(RAW_SHEET, &table.select(all_rows.clone(), assigned))?;
    written.push(RAW_SHEET.to_string());

    sink.write_sheet(
        ALL_PACKAGES_SHEET,
        &table.select(table.representatives(all_rows.clone()), assigned),
    )?;
    written.push(ALL_PACKAGES_SHEET.to_string());

    let Some(assigned) = assigned else {
        return Ok(written);
    };

    let sheets = order
        .into_iter()
        .map(Category::Code)
        .chain([Category::Remainder, Category::WithoutRelevant]);
    let mut seen = HashSet::new();
    for category in sheets {
        let name = category.label().to_string();
        if !seen.insert(name.clone()) {
            continue;
        }

        let rows = all_rows
            .clone()
            .filter(|&i| assigned[table.rows()[i].package_id] == category);
        let picked = table.representatives(rows);
        if picked.is_empty() {
            warn!("Skipping empty sheet {}", name);
            continue;
        }

        sink.write_sheet(&name, &table.select(picked, Some(assigned)))?;
        written.push(name);
    }

    Ok(written)
}

/// Writes the aggregated rule matches as the `Regeln` sheet.
pub fn export_rules(matches: &Table, sink: &mut dyn SheetSink) -> PackagerResult<()> {
    sink.write_sheet(RULES_SHEET, matches)
}
