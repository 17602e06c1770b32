//! Typed HR records and their validation from raw spreadsheet rows.
//!
//! Spreadsheet backends hand back rows as loose `header -> cell` maps. This module
//! converts them into one of three tagged variants, one per source table, so a
//! missing column is reported here as a [`ContextError::Schema`] instead of turning
//! into a half-empty document further down the pipeline.
//!
//! | Table           | Required columns                                               |
//! |-----------------|----------------------------------------------------------------|
//! | `Policies`      | `Title`, `Section`, `Content`                                  |
//! | `Benefits`      | `BenefitName`, `Description`, `Eligibility`, `Notes`           |
//! | `LeaveBalances` | `EmployeeEmail`, `CasualLeave`, `SickLeave`, `LastUpdated`     |
//!
//! A column that exists with a blank cell is a legal empty value; spreadsheets
//! report blank cells as empty strings.
//!
//! ```
//! use hr_assistant_context::{RawRow, Record, TableKind};
//!
//! let row: RawRow = [
//!     ("Title", "WFH"),
//!     ("Section", "Remote Work"),
//!     ("Content", "Max 2 days/week"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v.to_string()))
//! .collect();
//!
//! let record = Record::from_row(TableKind::Policies, 2, &row).unwrap();
//! assert!(matches!(record, Record::Policy(_)));
//! ```

use crate::error::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One spreadsheet row: column header to cell text.
pub type RawRow = BTreeMap<String, String>;

/// The three HR tables the assistant reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    Policies,
    Benefits,
    LeaveBalances,
}

impl TableKind {
    /// All source tables, in the order their documents enter the corpus.
    pub const ALL: [TableKind; 3] = [
        TableKind::Policies,
        TableKind::Benefits,
        TableKind::LeaveBalances,
    ];

    /// Worksheet name the table is stored under.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            TableKind::Policies => "Policies",
            TableKind::Benefits => "Benefits",
            TableKind::LeaveBalances => "LeaveBalances",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub title: String,
    pub section: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benefit {
    pub benefit_name: String,
    pub description: String,
    pub eligibility: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub employee_email: String,
    pub casual_leave: String,
    pub sick_leave: String,
    pub last_updated: String,
}

/// A validated row from one of the HR tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Record {
    Policy(Policy),
    Benefit(Benefit),
    LeaveBalance(LeaveBalance),
}

/// What to do with a row that is missing a required column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    /// Abort loading on the first malformed row
    #[default]
    Fail,
    /// Drop the row, emit a warning and keep going
    Skip,
}

impl Record {
    /// Validates a raw row against the columns its table requires.
    ///
    /// `row_number` is the 1-based spreadsheet row, used only for error reporting.
    pub fn from_row(table: TableKind, row_number: usize, row: &RawRow) -> Result<Self> {
        let get = |field: &'static str| {
            lookup(row, field).ok_or_else(|| ContextError::Schema {
                table,
                row: row_number,
                field,
            })
        };

        let record = match table {
            TableKind::Policies => Record::Policy(Policy {
                title: get("Title")?,
                section: get("Section")?,
                content: get("Content")?,
            }),
            TableKind::Benefits => Record::Benefit(Benefit {
                benefit_name: get("BenefitName")?,
                description: get("Description")?,
                eligibility: get("Eligibility")?,
                notes: get("Notes")?,
            }),
            TableKind::LeaveBalances => Record::LeaveBalance(LeaveBalance {
                employee_email: get("EmployeeEmail")?,
                casual_leave: get("CasualLeave")?,
                sick_leave: get("SickLeave")?,
                last_updated: get("LastUpdated")?,
            }),
        };
        Ok(record)
    }

    /// The table this record was loaded from.
    pub fn table(&self) -> TableKind {
        match self {
            Record::Policy(_) => TableKind::Policies,
            Record::Benefit(_) => TableKind::Benefits,
            Record::LeaveBalance(_) => TableKind::LeaveBalances,
        }
    }
}

// Headers are matched after trimming; exported sheets often carry stray spaces.
fn lookup(row: &RawRow, field: &str) -> Option<String> {
    row.get(field).cloned().or_else(|| {
        row.iter()
            .find(|(header, _)| header.trim() == field)
            .map(|(_, value)| value.clone())
    })
}

fn is_blank(row: &RawRow) -> bool {
    row.values().all(|value| value.trim().is_empty())
}

/// Converts every row of a table into records.
///
/// Rows are numbered as they appear in the sheet: the header is row 1, so the
/// first data row is row 2. Blank rows are always skipped.
pub fn load_records(
    table: TableKind,
    rows: &[RawRow],
    policy: MalformedRowPolicy,
) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 2;
        if is_blank(row) {
            tracing::debug!("Skipping blank {} row {}", table, row_number);
            continue;
        }

        match Record::from_row(table, row_number, row) {
            Ok(record) => records.push(record),
            Err(err) => match policy {
                MalformedRowPolicy::Fail => return Err(err),
                MalformedRowPolicy::Skip => {
                    tracing::warn!("Skipping malformed row: {}", err);
                }
            },
        }
    }

    tracing::debug!("Loaded {} records from {}", records.len(), table);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_row_policy() {
        let r = row(&[
            ("Title", "WFH"),
            ("Section", "Remote Work"),
            ("Content", "Max 2 days/week"),
        ]);
        let record = Record::from_row(TableKind::Policies, 2, &r).unwrap();
        assert_eq!(
            record,
            Record::Policy(Policy {
                title: "WFH".to_string(),
                section: "Remote Work".to_string(),
                content: "Max 2 days/week".to_string(),
            })
        );
        assert_eq!(record.table(), TableKind::Policies);
    }

    #[test]
    fn test_from_row_missing_field() {
        let r = row(&[
            ("BenefitName", "Gym"),
            ("Description", "Free membership"),
            ("Notes", ""),
        ]);
        let err = Record::from_row(TableKind::Benefits, 7, &r).unwrap_err();
        match err {
            ContextError::Schema { table, row, field } => {
                assert_eq!(table, TableKind::Benefits);
                assert_eq!(row, 7);
                assert_eq!(field, "Eligibility");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_cell_is_allowed() {
        let r = row(&[
            ("BenefitName", "Gym"),
            ("Description", "Free membership"),
            ("Eligibility", "All staff"),
            ("Notes", ""),
        ]);
        let record = Record::from_row(TableKind::Benefits, 2, &r).unwrap();
        match record {
            Record::Benefit(b) => assert_eq!(b.notes, ""),
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn test_headers_are_trimmed() {
        let r = row(&[
            (" EmployeeEmail ", "a@example.com"),
            ("CasualLeave", "4"),
            ("SickLeave ", "6"),
            ("LastUpdated", "2024-05-01"),
        ]);
        let record = Record::from_row(TableKind::LeaveBalances, 2, &r).unwrap();
        match record {
            Record::LeaveBalance(l) => {
                assert_eq!(l.employee_email, "a@example.com");
                assert_eq!(l.sick_leave, "6");
            }
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn test_load_records_fail_policy() {
        let rows = vec![
            row(&[("Title", "A"), ("Section", "B"), ("Content", "C")]),
            row(&[("Title", "A"), ("Content", "C")]),
        ];
        let err = load_records(TableKind::Policies, &rows, MalformedRowPolicy::Fail).unwrap_err();
        assert!(matches!(err, ContextError::Schema { row: 3, field: "Section", .. }));
    }

    #[test]
    fn test_load_records_skip_policy_and_blank_rows() {
        let rows = vec![
            row(&[("Title", "A"), ("Section", "B"), ("Content", "C")]),
            row(&[("Title", "A"), ("Content", "C")]),
            row(&[("Title", ""), ("Section", " "), ("Content", "")]),
            row(&[("Title", "D"), ("Section", "E"), ("Content", "F")]),
        ];
        let records = load_records(TableKind::Policies, &rows, MalformedRowPolicy::Skip).unwrap();
        assert_eq!(records.len(), 2);

        // Blank rows are skipped even under the strict policy
        let strict = load_records(
            TableKind::Policies,
            &[rows[0].clone(), rows[2].clone()],
            MalformedRowPolicy::Fail,
        )
        .unwrap();
        assert_eq!(strict.len(), 1);
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let policy: MalformedRowPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, MalformedRowPolicy::Skip);
        assert_eq!(MalformedRowPolicy::default(), MalformedRowPolicy::Fail);
    }
}
