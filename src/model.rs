// src/model.rs

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Lifecycle state of a stored invoice. Only confirmed invoices are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Processed,
}

/// Fields produced by an extraction provider, before the user reviews them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub vendor: String,
    pub invoice_number: String,
    pub amount: f64,
    pub date: Date,
    pub confidence: f64,
}

/// A confirmed invoice. Never mutated once created.
///
/// Serialized with the camelCase field names of the persisted `invoices`
/// layout; `created_at` is stored under `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: u64,
    pub vendor: String,
    pub invoice_number: String,
    pub amount: f64,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub status: RecordStatus,
}

impl InvoiceRecord {
    /// Calendar day the record was confirmed on, in the offset it was stamped with.
    pub fn created_on(&self) -> Date {
        self.created_at.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn test_record_uses_persisted_field_names() {
        let record = InvoiceRecord {
            id: 1_704_067_200_000,
            vendor: "ABC Corp".to_string(),
            invoice_number: "INV-42".to_string(),
            amount: 250.0,
            date: date!(2024 - 01 - 01),
            created_at: datetime!(2024-01-01 09:30:00 UTC),
            status: RecordStatus::Processed,
        };

        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["invoiceNumber"], "INV-42");
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["timestamp"], "2024-01-01T09:30:00Z");
        assert_eq!(json["status"], "processed");

        let back: InvoiceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
