use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Abbreviated french month names, as shown in the bill list.
const MONTHS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Jui", "Jui", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

/// Used when the pct field is empty, unparsable or zero.
pub const DEFAULT_PCT: i32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    #[default]
    Pending,
    Accepted,
    Refused,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::Accepted => "accepted",
            BillStatus::Refused => "refused",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BillStatus::Pending => "En attente",
            BillStatus::Accepted => "Accepté",
            BillStatus::Refused => "Refusé",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BillStatus::Pending),
            "accepted" => Ok(BillStatus::Accepted),
            "refused" => Ok(BillStatus::Refused),
            other => Err(format!("unknown bill status '{other}'")),
        }
    }
}

/// A persisted expense report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    #[serde(rename = "type")]
    pub bill_type: String,
    pub name: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub vat: String,
    pub pct: i32,
    pub commentary: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub status: BillStatus,
    pub comment_admin: Option<String>,
    pub email: String,
}

impl AsRef<Bill> for Bill {
    fn as_ref(&self) -> &Bill {
        self
    }
}

/// A bill as assembled from the new-bill form, before the store assigns an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDraft {
    pub email: String,
    #[serde(rename = "type")]
    pub bill_type: String,
    pub name: String,
    pub date: String,
    pub amount: f64,
    pub vat: String,
    pub pct: i32,
    pub commentary: String,
    pub file_url: String,
    pub file_name: String,
    pub status: BillStatus,
}

/// Receipt file picked in the new-bill form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Lowercased text after the last `.` of the file name.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.file_name)
    }

    /// Name under which the receipt of bill `id` is kept by the store.
    pub fn storage_name(&self, id: &Uuid) -> String {
        match self.extension() {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        }
    }
}

pub fn extension_of(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// A bill prepared for the list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillRow {
    #[serde(flatten)]
    pub bill: Bill,
    pub formatted_date: String,
    pub status_label: &'static str,
}

impl From<Bill> for BillRow {
    fn from(bill: Bill) -> Self {
        Self {
            formatted_date: format_date(&bill.date),
            status_label: bill.status.label(),
            bill,
        }
    }
}

impl AsRef<Bill> for BillRow {
    fn as_ref(&self) -> &Bill {
        &self.bill
    }
}

/// `2004-04-04` becomes `4 Avr. 04`.
pub fn format_date(date: &NaiveDate) -> String {
    format!(
        "{} {}. {}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.format("%y")
    )
}

/// Reads a numeric form field the way a browser's `Number(value)` does:
/// blank is zero, `Infinity` is the only spelled-out number and anything
/// unparsable is NaN.
pub fn parse_amount(value: &str) -> f64 {
    let value = value.trim();
    match value {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) =>
        {
            value.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// Leading integer of the field, falling back to [`DEFAULT_PCT`].
pub fn parse_pct(value: &str) -> i32 {
    let value = value.trim_start();
    let digits_end = value
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map_or(value.len(), |(i, _)| i);

    match value[..digits_end].parse::<i32>() {
        Ok(0) | Err(_) => DEFAULT_PCT,
        Ok(pct) => pct,
    }
}
