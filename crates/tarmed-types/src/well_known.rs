//! Well-known column names, sentinels and sheet names.
//!
//! Column names follow the German headers of the billing exports the tool is
//! fed with.
//!
//! # Examples
//!
//! ```
//! use tarmed_types::well_known;
//!
//! assert_eq!(well_known::CODE_COLUMN, "Leistung");
//! assert_eq!(well_known::RULE_COLUMN, "Regel");
//! ```

// =============================================================================
// Input Columns
// =============================================================================

/// Case number column.
pub const CASE_NUMBER_COLUMN: &str = "FallNr";

/// Encounter date column.
pub const DATE_COLUMN: &str = "Datumsfeld";

/// Tariff group column, marks which billing system an item belongs to.
pub const TARIFF_COLUMN: &str = "Tarifgruppe";

/// Procedure code column.
pub const CODE_COLUMN: &str = "Leistung";

/// Case id column (case number + serial date). Derived when absent.
pub const CASE_ID_COLUMN: &str = "FallDatum";

// =============================================================================
// Derived Columns
// =============================================================================

/// Package key over relevant codes.
pub const KEY_COLUMN: &str = "key";

/// Package key over all codes of the case.
pub const KEY_ALL_COLUMN: &str = "keyAlle";

/// Package id.
pub const PACKAGE_ID_COLUMN: &str = "paketID";

/// Number of distinct cases in the package.
pub const COUNT_COLUMN: &str = "Anzahl";

/// Package category.
pub const CATEGORY_COLUMN: &str = "Kategorie";

/// Name of the rule a row matched.
pub const RULE_COLUMN: &str = "Regel";

// =============================================================================
// Packaging
// =============================================================================

/// Delimiter between codes of a package key.
pub const KEY_DELIMITER: char = ',';

/// Default marker of the relevant tariff system.
pub const DEFAULT_RELEVANT_TARIFF: &str = "TARMED";

/// Category for packages with relevant codes but no category match.
pub const REMAINDER_CATEGORY: &str = "Restgruppe";

/// Category for packages without relevant codes.
pub const WITHOUT_RELEVANT_CATEGORY: &str = "OhneTarmed";

// =============================================================================
// Sheets
// =============================================================================

/// Sheet with the full augmented table.
pub const RAW_SHEET: &str = "Rohdaten";

/// Sheet with one representative per case.
pub const ALL_PACKAGES_SHEET: &str = "AllePakete";

/// Sheet with the matches of all rules.
pub const RULES_SHEET: &str = "Regeln";

/// Columns of an input table that has to derive the case id.
pub const INPUT_COLUMNS: [&str; 4] = [CASE_NUMBER_COLUMN, DATE_COLUMN, TARIFF_COLUMN, CODE_COLUMN];

/// Columns appended by packaging, in output order.
pub const DERIVED_COLUMNS: [&str; 4] = [KEY_COLUMN, KEY_ALL_COLUMN, PACKAGE_ID_COLUMN, COUNT_COLUMN];
