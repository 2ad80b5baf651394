//! # tarmed-loader
//!
//! Packaging engine and rule evaluation for TARMED case tables.
//!
//! Line items are read from CSV exports, grouped into cases and packaged by
//! the set of relevant procedure codes per case. Rules filter the packaged
//! cases by AND/OR/NOT code membership, and the results are written out as
//! named sheets.
//!
//! ## Features
//!
//! - `parallel` (default): Computes per-case package keys with rayon.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tarmed_loader::{discover_input_files, CodeListKind, PackageManager, PackagingConfig};
//!
//! let files = discover_input_files("daten/leistungen.csv")?;
//! let mut manager = PackageManager::new(PackagingConfig::semicolon());
//! manager.ingest(&files)?;
//!
//! let rule = manager.rules_mut().add_rule("Konsultation");
//! manager.rules_mut().add_code(rule, "00.0010", CodeListKind::And);
//! println!("{}", manager.summary());
//! # Ok::<(), tarmed_loader::PackagerError>(())
//! ```

#![warn(missing_docs)]

pub mod export;
mod line_item;
mod loader;
mod manager;
pub mod observer;
pub mod packaging;
mod parser;
pub mod persist;
mod rule;
mod rules;
mod store;
mod table;
mod types;

pub use export::{band_flags, bands, export_by_category, export_rules, CsvSheetSink, SheetSink};
pub use line_item::CaseSchema;
pub use loader::{discover_input_files, load_input, LoadedInput};
pub use manager::{PackageManager, Summary};
pub use observer::{ObserverId, Subject};
pub use packaging::{build_packages, PackagedCase, PackagedRow, PackagedTable};
pub use parser::{parse, read_categories, read_categories_from_reader, read_table, read_table_from_reader};
pub use persist::{load_rules, save_rules, RuleDefinitions};
pub use rule::Rule;
pub use rules::{RuleEvent, RuleSet};
pub use store::{CaseStore, StoreEvent};
pub use table::Table;
pub use types::{InputFiles, PackagerError, PackagerResult, PackagingConfig};

// Re-export tarmed-types for convenience
pub use tarmed_types;
pub use tarmed_types::{Category, CodeListKind, ProcedureCode, RuleDefinition};
