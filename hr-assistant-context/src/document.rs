//! Single-line text rendering of HR records.

use crate::record::{Benefit, LeaveBalance, Policy, Record};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A formatted, human-readable line derived from exactly one [`Record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(String);

impl Document {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Renders a record with its table's fixed template.
///
/// # Examples
///
/// ```
/// use hr_assistant_context::{Policy, Record, format};
///
/// let record = Record::Policy(Policy {
///     title: "WFH".to_string(),
///     section: "Remote Work".to_string(),
///     content: "Max 2 days/week".to_string(),
/// });
/// assert_eq!(format(&record).as_str(), "Policy: WFH (Remote Work) → Max 2 days/week");
/// ```
pub fn format(record: &Record) -> Document {
    let text = match record {
        Record::Policy(Policy {
            title,
            section,
            content,
        }) => format!("Policy: {title} ({section}) → {content}"),
        Record::Benefit(Benefit {
            benefit_name,
            description,
            eligibility,
            notes,
        }) => format!(
            "Benefit: {benefit_name} → {description} | Eligibility: {eligibility} | Notes: {notes}"
        ),
        Record::LeaveBalance(LeaveBalance {
            employee_email,
            casual_leave,
            sick_leave,
            last_updated,
        }) => format!(
            "Leave balance for {employee_email}: Casual={casual_leave}, Sick={sick_leave} (Last updated {last_updated})"
        ),
    };
    // The templates are single-line, so only cell contents can carry breaks
    Document(collapse_line_breaks(&text))
}

fn line_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]*[\r\n]+[ \t]*").expect("line break regex is valid"))
}

/// Replaces each run of line breaks, with the blanks around it, by one space.
fn collapse_line_breaks(text: &str) -> String {
    line_break_regex().replace_all(text, " ").into_owned()
}
