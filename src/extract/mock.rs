use super::ExtractionProvider;
use crate::capture::ImagePayload;
use crate::clock::Clock;
use crate::error::ExtractError;
use crate::model::ExtractedFields;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use time::Date;
use tracing::info;

pub const VENDORS: [&str; 5] = [
    "ABC Corp",
    "XYZ Ltd",
    "Tech Solutions",
    "Office Supplies Co",
    "Global Services",
];

pub const MOCK_CONFIDENCE: f64 = 0.95;

/// Stand-in OCR: waits a fixed latency, then returns synthetic fields.
/// The image bytes are never inspected.
pub struct MockOcr {
    latency: Duration,
    clock: Arc<dyn Clock>,
}

impl MockOcr {
    pub fn new(latency: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { latency, clock }
    }
}

#[async_trait]
impl ExtractionProvider for MockOcr {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn extract(&self, image: &ImagePayload) -> Result<ExtractedFields, ExtractError> {
        tokio::time::sleep(self.latency).await;

        let fields = synthesize(&mut rand::thread_rng(), self.clock.today());
        info!(
            file = %image.name,
            vendor = %fields.vendor,
            invoice_number = %fields.invoice_number,
            amount = fields.amount,
            "Mock OCR result"
        );
        Ok(fields)
    }
}

fn synthesize<R: Rng + ?Sized>(rng: &mut R, today: Date) -> ExtractedFields {
    let vendor = VENDORS[rng.gen_range(0..VENDORS.len())];
    let amount: f64 = rng.gen_range(100.0..5100.0);

    ExtractedFields {
        vendor: vendor.to_string(),
        invoice_number: format!("INV-{}", rng.gen_range(0..10_000u32)),
        amount: (amount * 100.0).round() / 100.0,
        date: today,
        confidence: MOCK_CONFIDENCE,
    }
}
