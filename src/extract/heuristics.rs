use super::ExtractionProvider;
use crate::capture::ImagePayload;
use crate::clock::Clock;
use crate::error::ExtractError;
use crate::model::ExtractedFields;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use time::macros::format_description;
use time::{Date, Month};
use tracing::info;

/// Number of scalar fields the heuristics look for.
const FIELD_COUNT: usize = 4;

/// Reads a text layer (e.g. exported alongside a scan) with keyword-anchored
/// regexes. Payloads that are not UTF-8 text are rejected.
pub struct HeuristicOcr {
    clock: Arc<dyn Clock>,
}

impl HeuristicOcr {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl ExtractionProvider for HeuristicOcr {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn extract(&self, image: &ImagePayload) -> Result<ExtractedFields, ExtractError> {
        let text = std::str::from_utf8(&image.bytes).map_err(|_| ExtractError::Unreadable {
            name: image.name.clone(),
        })?;

        let scanned = scan(text);
        let filled = scanned.filled();
        info!(
            file = %image.name,
            filled = filled,
            total = FIELD_COUNT,
            invoice_number = ?scanned.invoice_number,
            vendor = ?scanned.vendor,
            amount = ?scanned.amount,
            "Heuristic extraction result"
        );

        if filled == 0 {
            return Err(ExtractError::NothingFound {
                name: image.name.clone(),
            });
        }

        Ok(ExtractedFields {
            vendor: scanned.vendor.unwrap_or_default(),
            invoice_number: scanned.invoice_number.unwrap_or_default(),
            amount: scanned.amount.unwrap_or(0.0),
            date: scanned.date.unwrap_or_else(|| self.clock.today()),
            confidence: filled as f64 / FIELD_COUNT as f64,
        })
    }
}

#[derive(Debug, Default)]
struct Scanned {
    vendor: Option<String>,
    invoice_number: Option<String>,
    amount: Option<f64>,
    date: Option<Date>,
}

impl Scanned {
    fn filled(&self) -> usize {
        [
            self.vendor.is_some(),
            self.invoice_number.is_some(),
            self.amount.is_some(),
            self.date.is_some(),
        ]
        .iter()
        .filter(|&&v| v)
        .count()
    }
}

fn scan(text: &str) -> Scanned {
    Scanned {
        vendor: extract_vendor(text),
        invoice_number: extract_invoice_number(text),
        amount: extract_total(text),
        date: extract_date(text),
    }
}

// ---------------------------------------------------------------------------
// Field extractors
// ---------------------------------------------------------------------------

fn extract_invoice_number(text: &str) -> Option<String> {
    // "Invoice No.", "Invoice Number", "Invoice #" followed by the value
    let re = Regex::new(r"(?i)Invoice\s*(?:No\.?|Number|#)\s*:?\s*([A-Za-z0-9][A-Za-z0-9\-/]*)")
        .ok()?;
    re.captures(text).map(|c| c[1].trim().to_string())
}

fn extract_vendor(text: &str) -> Option<String> {
    // An explicit label beats a guessed company line.
    let labelled = Regex::new(r"(?im)^\s*(?:From|Vendor|Supplier|Seller)\s*:\s*(.+?)\s*$").ok()?;
    if let Some(c) = labelled.captures(text) {
        return Some(c[1].to_string());
    }

    let company = Regex::new(
        r"(?m)^\s*([A-Z][A-Za-z0-9&.,' ]*?\b(?:Corp\.?|Corporation|Ltd\.?|Inc\.?|Co\.?|LLC|GmbH|PTE\.?\s*LTD\.?|Services|Solutions))\s*$",
    )
    .ok()?;
    company.captures(text).map(|c| c[1].trim().to_string())
}

fn extract_total(text: &str) -> Option<f64> {
    // Take the last TOTAL on the page so sub-totals are skipped.
    let re = Regex::new(
        r"(?i)\b(?:Grand\s+)?Total(?:\s+Due)?\s*:?\s*(?:[A-Z]{3}\s*)?\$?\s*(\d[\d,]*(?:\.\d+)?)",
    )
    .ok()?;
    re.captures_iter(text)
        .filter_map(|c| c[1].replace(',', "").parse::<f64>().ok())
        .last()
}

fn extract_date(text: &str) -> Option<Date> {
    let re = Regex::new(
        r"(?i)(?:Invoice\s+)?Date\s*:?\s*(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4}|[A-Za-z]+\.?\s+\d{1,2},?\s+\d{4})",
    )
    .ok()?;
    let raw = re.captures(text)?[1].trim().to_string();
    parse_date(&raw)
}

/// ISO `2024-01-31`, day-first `31/01/2024`, or `January 31, 2024`.
fn parse_date(raw: &str) -> Option<Date> {
    if let Ok(d) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Some(d);
    }

    if raw.contains('/') {
        let mut parts = raw.split('/').map(|p| p.parse::<i32>().ok());
        let (day, month, year) = (parts.next()??, parts.next()??, parts.next()??);
        let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
        return Date::from_calendar_date(year, month, u8::try_from(day).ok()?).ok();
    }

    let re = Regex::new(r"^([A-Za-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})$").ok()?;
    let c = re.captures(raw)?;
    let month = month_from_name(&c[1])?;
    Date::from_calendar_date(c[3].parse().ok()?, month, c[2].parse().ok()?).ok()
}

fn month_from_name(name: &str) -> Option<Month> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => Month::January,
        "feb" => Month::February,
        "mar" => Month::March,
        "apr" => Month::April,
        "may" => Month::May,
        "jun" => Month::June,
        "jul" => Month::July,
        "aug" => Month::August,
        "sep" => Month::September,
        "oct" => Month::October,
        "nov" => Month::November,
        "dec" => Month::December,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSource;
    use crate::clock::FixedClock;
    use time::macros::{date, datetime};

    const SAMPLE: &str = "Office Supplies Co\n\
        12 Market Street\n\
        Invoice No: OS-2024-0193\n\
        Invoice Date: March 4, 2024\n\
        Paper A4            12.00\n\
        Subtotal            1,180.00\n\
        Total: USD 1,234.50\n";

    fn provider() -> HeuristicOcr {
        HeuristicOcr::new(Arc::new(FixedClock(datetime!(2024-05-01 10:00:00 UTC))))
    }

    #[tokio::test]
    async fn test_reads_text_layer() {
        let image = ImagePayload::new("scan.txt", CaptureSource::FilePicker, SAMPLE.into());
        let fields = provider().extract(&image).await.unwrap();

        assert_eq!(fields.vendor, "Office Supplies Co");
        assert_eq!(fields.invoice_number, "OS-2024-0193");
        assert_eq!(fields.amount, 1234.5);
        assert_eq!(fields.date, date!(2024 - 03 - 04));
        assert_eq!(fields.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_partial_text_scales_confidence() {
        let image = ImagePayload::new(
            "partial.txt",
            CaptureSource::FilePicker,
            "Invoice # 881\nTotal $40".into(),
        );
        let fields = provider().extract(&image).await.unwrap();

        assert_eq!(fields.invoice_number, "881");
        assert_eq!(fields.amount, 40.0);
        assert_eq!(fields.vendor, "");
        assert_eq!(fields.date, date!(2024 - 05 - 01));
        assert_eq!(fields.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_binary_payload_is_unreadable() {
        let image = ImagePayload::new("photo.jpg", CaptureSource::Camera, vec![0xff, 0xd8, 0xff, 0xe0]);
        let err = provider().extract(&image).await.unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_plain_prose_finds_nothing() {
        let image = ImagePayload::new("note.txt", CaptureSource::DragDrop, "hello there".into());
        let err = provider().extract(&image).await.unwrap_err();
        assert!(matches!(err, ExtractError::NothingFound { .. }));
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_date("2024-01-31"), Some(date!(2024 - 01 - 31)));
        assert_eq!(parse_date("31/01/2024"), Some(date!(2024 - 01 - 31)));
        assert_eq!(parse_date("Jan. 31, 2024"), Some(date!(2024 - 01 - 31)));
        assert_eq!(parse_date("31/13/2024"), None);
    }
}
