// src/review.rs

use crate::error::ReviewError;
use crate::model::{ExtractedFields, InvoiceRecord, RecordStatus};
use regex::Regex;
use std::io::{self, BufRead, Write};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Vendor,
    InvoiceNumber,
    Amount,
    Date,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Vendor, Field::InvoiceNumber, Field::Amount, Field::Date];

    pub fn label(self) -> &'static str {
        match self {
            Field::Vendor => "Vendor",
            Field::InvoiceNumber => "Invoice number",
            Field::Amount => "Amount",
            Field::Date => "Date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Save,
    Cancel,
}

/// Editable draft of an invoice, pre-filled from extraction.
#[derive(Debug, Clone)]
pub struct ReviewForm {
    vendor: String,
    invoice_number: String,
    amount: String,
    date: String,
    confidence: f64,
}

impl ReviewForm {
    pub fn from_extracted(fields: &ExtractedFields) -> Self {
        Self {
            vendor: fields.vendor.clone(),
            invoice_number: fields.invoice_number.clone(),
            amount: format!("{:.2}", fields.amount),
            date: fields.date.to_string(),
            confidence: fields.confidence,
        }
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Vendor => &self.vendor,
            Field::InvoiceNumber => &self.invoice_number,
            Field::Amount => &self.amount,
            Field::Date => &self.date,
        }
    }

    pub fn edit(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        debug!(field = field.label(), value = %value, "Field edited");
        match field {
            Field::Vendor => self.vendor = value,
            Field::InvoiceNumber => self.invoice_number = value,
            Field::Amount => self.amount = value,
            Field::Date => self.date = value,
        }
    }

    /// Build the record. Vendor and invoice number may be empty; the amount
    /// must read as a non-negative number and the date as `YYYY-MM-DD`.
    pub fn save(&self, id: u64, now: OffsetDateTime) -> Result<InvoiceRecord, ReviewError> {
        let (amount, date) = self.parsed()?;
        Ok(InvoiceRecord {
            id,
            vendor: self.vendor.clone(),
            invoice_number: self.invoice_number.clone(),
            amount,
            date,
            created_at: now,
            status: RecordStatus::Processed,
        })
    }

    /// Check the typed amount and date without building a record.
    pub fn validate(&self) -> Result<(), ReviewError> {
        self.parsed().map(|_| ())
    }

    fn parsed(&self) -> Result<(f64, Date), ReviewError> {
        let amount = parse_amount(&self.amount)
            .filter(|a| a.is_finite() && *a >= 0.0)
            .ok_or_else(|| ReviewError::InvalidAmount(self.amount.clone()))?;

        let date = Date::parse(self.date.trim(), format_description!("[year]-[month]-[day]"))
            .map_err(|_| ReviewError::InvalidDate(self.date.clone()))?;
        Ok((amount, date))
    }

    /// Discard the draft.
    pub fn cancel(self) {
        info!(invoice_number = %self.invoice_number, "Review cancelled, draft discarded");
    }

    /// Walk the fields on a terminal. Enter keeps the shown value; the final
    /// question decides between save and cancel.
    pub fn prompt<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> io::Result<Decision> {
        writeln!(out, "Review extracted fields (confidence {:.0}%)", self.confidence * 100.0)?;

        for field in Field::ALL {
            write!(out, "{} [{}]: ", field.label(), self.value(field))?;
            out.flush()?;

            let Some(line) = read_line(&mut input)? else {
                return Ok(Decision::Cancel);
            };
            if !line.is_empty() {
                self.edit(field, line);
            }
        }

        write!(out, "Save invoice? [Y/n]: ")?;
        out.flush()?;
        let answer = read_line(&mut input)?.unwrap_or_else(|| "n".to_string());
        let decision = match answer.to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => Decision::Save,
            _ => Decision::Cancel,
        };
        Ok(decision)
    }

    /// Prompt until the user cancels or saves a draft that validates. A
    /// rejected value is reported and the walk starts over with the edits kept.
    pub fn prompt_until_valid<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut out: W,
    ) -> io::Result<Decision> {
        loop {
            if self.prompt(&mut input, &mut out)? == Decision::Cancel {
                return Ok(Decision::Cancel);
            }
            match self.validate() {
                Ok(()) => return Ok(Decision::Save),
                Err(e) => {
                    warn!(error = %e, "Draft rejected, prompting again");
                    writeln!(out, "{e}. Please correct it.")?;
                }
            }
        }
    }
}

/// One trimmed line, or `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Read the leading number of a typed amount, the way a lenient float parser does:
/// surrounding spaces, a `$` sign and thousands separators are tolerated and
/// trailing junk is ignored (`"250.00 USD"` reads as 250).
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_start_matches('$').trim_start().replace(',', "");
    let re = Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").ok()?;
    let m = re.find(&cleaned)?;
    m.as_str().parse().ok()
}
