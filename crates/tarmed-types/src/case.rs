//! Case identifier and billing line item types.

use std::fmt;

use crate::ProcedureCode;

/// Identifier of a case (one patient encounter on one date).
///
/// Usually built from the case number and the serial date of the encounter,
/// see the `FallDatum` column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CaseId(String);

impl CaseId {
    /// Creates a case id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the case id from a case number and a serial day count.
    ///
    /// ```
    /// use tarmed_types::CaseId;
    ///
    /// assert_eq!(CaseId::from_number_and_day("4711", 43831).as_str(), "471143831");
    /// ```
    pub fn from_number_and_day(number: &str, serial_day: i64) -> Self {
        Self(format!("{}{}", number.trim(), serial_day))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One billing record of a case.
///
/// Line items are immutable once loaded. `values` holds the complete source
/// row (in source column order) so that exports can reproduce it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineItem {
    /// The case this item belongs to.
    pub case_id: CaseId,
    /// Normalized procedure code.
    pub code: ProcedureCode,
    /// Tariff group tag (e.g. `TARMED`, `Labor`, `Medikamente`).
    pub tariff_group: String,
    /// The full source row.
    pub values: Vec<String>,
}

impl LineItem {
    /// Returns true if this item belongs to the relevant tariff system.
    ///
    /// The marker is matched case-insensitively as a substring, so both
    /// `"TARMED"` and `"Tarmed 01.09"` count for marker `"tarmed"`.
    pub fn is_relevant(&self, marker: &str) -> bool {
        self.tariff_group
            .to_lowercase()
            .contains(&marker.to_lowercase())
    }
}
