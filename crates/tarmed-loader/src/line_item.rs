//! Line item schema resolution.
//!
//! Maps the columns of a raw [`Table`] onto [`LineItem`] fields. All required
//! columns are checked up front, before a single row is converted.

use tarmed_types::well_known::{
    CASE_ID_COLUMN, CASE_NUMBER_COLUMN, CODE_COLUMN, DATE_COLUMN, TARIFF_COLUMN,
};
use tarmed_types::{CaseId, LineItem, ProcedureCode};

use crate::parser::parse;
use crate::table::Table;
use crate::types::{PackagerError, PackagerResult};

/// Where the case id of a row comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseColumn {
    /// A `FallDatum` column is present.
    Direct(usize),
    /// Built from `FallNr` and the serial day of `Datumsfeld`.
    Derived { number: usize, date: usize },
}

/// Resolved column positions of a line item table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSchema {
    case: CaseColumn,
    tariff: usize,
    code: usize,
    width: usize,
}

impl CaseSchema {
    /// Resolves the schema from a header.
    ///
    /// # Errors
    /// Returns [`PackagerError::MissingColumn`] naming the first missing
    /// required column. Without `FallDatum`, both `FallNr` and `Datumsfeld`
    /// are required.
    pub fn resolve(columns: &[String]) -> PackagerResult<Self> {
        let find = |name: &str| columns.iter().position(|c| c == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| PackagerError::MissingColumn {
                column: name.to_string(),
            })
        };

        let case = match find(CASE_ID_COLUMN) {
            Some(index) => CaseColumn::Direct(index),
            None => CaseColumn::Derived {
                number: require(CASE_NUMBER_COLUMN)?,
                date: require(DATE_COLUMN)?,
            },
        };

        Ok(Self {
            case,
            tariff: require(TARIFF_COLUMN)?,
            code: require(CODE_COLUMN)?,
            width: columns.len(),
        })
    }

    /// Returns true if the case id column is derived and appended to rows.
    pub fn derives_case_id(&self) -> bool {
        matches!(self.case, CaseColumn::Derived { .. })
    }

    /// Returns the output columns: the source columns plus `FallDatum` if derived.
    pub fn output_columns(&self, source: &[String]) -> Vec<String> {
        let mut columns = source.to_vec();
        if self.derives_case_id() {
            columns.push(CASE_ID_COLUMN.to_string());
        }
        columns
    }

    /// Converts one source row into a line item.
    ///
    /// The procedure code is normalized in place so the exported row shows the
    /// canonical form.
    pub fn line_item(&self, row_index: usize, row: &[String]) -> PackagerResult<LineItem> {
        if row.len() != self.width {
            return Err(PackagerError::RowLength {
                row: row_index,
                expected: self.width,
                found: row.len(),
            });
        }

        let code = ProcedureCode::normalize(&row[self.code]);
        let mut values = row.to_vec();
        values[self.code] = code.as_str().to_string();

        let case_id = match self.case {
            CaseColumn::Direct(index) => CaseId::new(row[index].trim()),
            CaseColumn::Derived { number, date } => {
                let case_id =
                    CaseId::from_number_and_day(&row[number], parse::serial_day(&row[date])?);
                values.push(case_id.as_str().to_string());
                case_id
            }
        };

        Ok(LineItem {
            case_id,
            code,
            tariff_group: row[self.tariff].clone(),
            values,
        })
    }

    /// Converts every row of a table.
    pub fn line_items(&self, table: &Table) -> PackagerResult<Vec<LineItem>> {
        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| self.line_item(i, row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_resolve_with_case_id_column() {
        let schema = CaseSchema::resolve(&columns(&["FallDatum", "Tarifgruppe", "Leistung"])).unwrap();
        assert!(!schema.derives_case_id());

        let item = schema.line_item(0, &row(&["C1", "TARMED", "0.01"])).unwrap();
        assert_eq!(item.case_id.as_str(), "C1");
        assert_eq!(item.code.as_str(), "00.0100");
        assert_eq!(item.values, row(&["C1", "TARMED", "00.0100"]));
    }

    #[test]
    fn test_resolve_derives_case_id() {
        let source = columns(&["FallNr", "Datumsfeld", "Tarifgruppe", "Leistung", "Menge"]);
        let schema = CaseSchema::resolve(&source).unwrap();
        assert!(schema.derives_case_id());
        assert_eq!(schema.output_columns(&source).last().unwrap(), "FallDatum");

        let item = schema
            .line_item(0, &row(&["17", "1900-01-11", "TARMED", "00.0010", "1"]))
            .unwrap();
        assert_eq!(item.case_id.as_str(), "1710");
        assert_eq!(item.values.len(), 6);
        assert_eq!(item.values[5], "1710");
    }

    #[test]
    fn test_missing_columns_are_named() {
        let err = CaseSchema::resolve(&columns(&["FallNr", "Tarifgruppe", "Leistung"])).unwrap_err();
        assert!(matches!(err, PackagerError::MissingColumn { ref column } if column == "Datumsfeld"));

        let err = CaseSchema::resolve(&columns(&["FallDatum", "Leistung"])).unwrap_err();
        assert!(matches!(err, PackagerError::MissingColumn { ref column } if column == "Tarifgruppe"));

        let err = CaseSchema::resolve(&columns(&["FallDatum", "Tarifgruppe"])).unwrap_err();
        assert!(matches!(err, PackagerError::MissingColumn { ref column } if column == "Leistung"));
    }

    #[test]
    fn test_row_length_mismatch() {
        let schema = CaseSchema::resolve(&columns(&["FallDatum", "Tarifgruppe", "Leistung"])).unwrap();
        assert!(matches!(
            schema.line_item(3, &row(&["C1", "TARMED"])),
            Err(PackagerError::RowLength { row: 3, expected: 3, found: 2 })
        ));
    }

    #[test]
    fn test_invalid_date() {
        let schema =
            CaseSchema::resolve(&columns(&["FallNr", "Datumsfeld", "Tarifgruppe", "Leistung"])).unwrap();
        assert!(matches!(
            schema.line_item(0, &row(&["1", "morgen", "TARMED", "1"])),
            Err(PackagerError::InvalidDate { .. })
        ));
    }
}
