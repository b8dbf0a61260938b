// src/app.rs

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{AppError, StoreError};
use crate::model::InvoiceRecord;
use crate::present::{SAVED_TOAST, ToastQueue};
use crate::record_store::RecordStore;
use crate::review::ReviewForm;
use crate::stats::{StatsAggregator, StatsCounters};
use crate::storage::StoragePort;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Record store, counters and notifications over one storage port.
pub struct Session<P> {
    store: RecordStore<P>,
    stats: StatsAggregator<P>,
    toasts: ToastQueue,
    clock: Arc<dyn Clock>,
}

impl<P: StoragePort + Clone> Session<P> {
    /// Load persisted state and run the once-per-start daily rollover check.
    pub fn open(port: P, clock: Arc<dyn Clock>, cfg: &Config) -> Result<Self, StoreError> {
        let store = RecordStore::load_all(port.clone())?;
        let mut stats = StatsAggregator::load(port, cfg.stats.minutes_saved_per_invoice)?;

        let today = clock.today();
        stats.check_daily_rollover(today, store.created_on(today))?;

        Ok(Self {
            store,
            stats,
            toasts: ToastQueue::new(cfg.display.toast_ttl()),
            clock,
        })
    }

    /// Turn a reviewed draft into a stored record and count it.
    pub fn confirm(&mut self, form: &ReviewForm) -> Result<InvoiceRecord, AppError> {
        let now = self.clock.now();
        let record = form.save(self.store.next_id(now), now)?;
        let id = record.id;

        self.store.append(record.clone())?;
        let counters = self.stats.record_processed()?;
        self.toasts.push(SAVED_TOAST, Instant::now());

        info!(id = id, total = counters.total_processed, "Invoice confirmed");
        Ok(record)
    }

    pub fn store(&self) -> &RecordStore<P> {
        &self.store
    }

    pub fn counters(&self) -> StatsCounters {
        self.stats.counters()
    }

    pub fn toasts(&mut self) -> Vec<&str> {
        self.toasts.active(Instant::now())
    }

    /// Drop every record. Counters are cumulative history and stay as they are.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureSource, ImagePayload};
    use crate::clock::FixedClock;
    use crate::extract::{MockOcr, VENDORS};
    use crate::pipeline::Pipeline;
    use crate::review::{Decision, Field};
    use crate::storage::MemoryStorage;
    use regex::Regex;
    use std::time::Duration;
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn clock_at(now: OffsetDateTime) -> Arc<dyn Clock> {
        Arc::new(FixedClock(now))
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_edit_save_scenario() {
        let storage = MemoryStorage::default();
        let clock = clock_at(datetime!(2024-07-01 09:00:00 UTC));
        let cfg = Config::default();
        let mut session = Session::open(&storage, Arc::clone(&clock), &cfg).unwrap();
        let mut pipeline = Pipeline::new(Arc::new(MockOcr::new(cfg.extraction.latency(), clock)));

        let image = ImagePayload::new("invoice.jpg", CaptureSource::Camera, b"jpeg".to_vec());
        let started = tokio::time::Instant::now();
        let fields = pipeline.submit(image).outcome().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));

        let mut form = ReviewForm::from_extracted(&fields);
        assert!(VENDORS.contains(&form.value(Field::Vendor)));
        assert!(Regex::new(r"^INV-\d+$").unwrap().is_match(form.value(Field::InvoiceNumber)));
        let prefilled: f64 = form.value(Field::Amount).parse().unwrap();
        assert!((100.0..=5100.0).contains(&prefilled));

        form.edit(Field::Amount, "250.00");
        let saved = session.confirm(&form).unwrap();
        assert_eq!(saved.amount, 250.0);
        assert_eq!(session.store().records().first(), Some(&saved));

        assert_eq!(
            session.counters(),
            StatsCounters {
                total_processed: 1,
                processed_today: 1,
                cumulative_minutes_saved: 15,
            }
        );
        assert_eq!(session.toasts(), vec![SAVED_TOAST]);
    }

    #[test]
    fn test_n_saves_accumulate() {
        let storage = MemoryStorage::default();
        let clock = clock_at(datetime!(2024-07-01 09:00:00 UTC));
        let mut session = Session::open(&storage, clock, &Config::default()).unwrap();

        let form = ReviewForm::from_extracted(&crate::model::ExtractedFields {
            vendor: "ABC Corp".to_string(),
            invoice_number: "INV-1".to_string(),
            amount: 100.0,
            date: time::macros::date!(2024 - 07 - 01),
            confidence: 0.95,
        });
        for _ in 0..6 {
            session.confirm(&form).unwrap();
        }

        assert_eq!(session.store().len(), 6);
        let ids: Vec<u64> = session.store().records().iter().map(|r| r.id).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(session.counters().total_processed, 6);
        assert_eq!(session.counters().cumulative_minutes_saved, 90);
    }

    #[test]
    fn test_rejected_amount_is_corrected_and_saved_once() {
        let storage = MemoryStorage::default();
        let clock = clock_at(datetime!(2024-07-01 09:00:00 UTC));
        let mut session = Session::open(&storage, clock, &Config::default()).unwrap();

        let mut form = ReviewForm::from_extracted(&crate::model::ExtractedFields {
            vendor: "Tech Solutions".to_string(),
            invoice_number: "INV-77".to_string(),
            amount: 410.0,
            date: time::macros::date!(2024 - 07 - 01),
            confidence: 0.95,
        });
        let input = std::io::Cursor::new("\n\nabc\n\ny\n\n\n250\n\ny\n");
        let decision = form.prompt_until_valid(input, Vec::new()).unwrap();
        assert_eq!(decision, Decision::Save);

        let saved = session.confirm(&form).unwrap();
        assert_eq!(saved.amount, 250.0);
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.counters().total_processed, 1);
    }

    #[test]
    fn test_invalid_draft_leaves_state_untouched() {
        let storage = MemoryStorage::default();
        let clock = clock_at(datetime!(2024-07-01 09:00:00 UTC));
        let mut session = Session::open(&storage, clock, &Config::default()).unwrap();

        let mut form = ReviewForm::from_extracted(&crate::model::ExtractedFields {
            vendor: "Tech Solutions".to_string(),
            invoice_number: "INV-78".to_string(),
            amount: 410.0,
            date: time::macros::date!(2024 - 07 - 01),
            confidence: 0.95,
        });
        form.edit(Field::Amount, "abc");

        assert!(matches!(session.confirm(&form), Err(AppError::Review(_))));
        assert!(session.store().is_empty());
        assert_eq!(session.counters(), StatsCounters::default());
    }

    #[test]
    fn test_reopen_next_day_resets_today() {
        let storage = MemoryStorage::default();
        let cfg = Config::default();
        let form = ReviewForm::from_extracted(&crate::model::ExtractedFields {
            vendor: "XYZ Ltd".to_string(),
            invoice_number: "INV-9".to_string(),
            amount: 300.0,
            date: time::macros::date!(2024 - 07 - 01),
            confidence: 0.95,
        });

        {
            let clock = clock_at(datetime!(2024-07-01 18:00:00 UTC));
            let mut session = Session::open(&storage, clock, &cfg).unwrap();
            session.confirm(&form).unwrap();
            session.confirm(&form).unwrap();
        }

        let same_day = Session::open(&storage, clock_at(datetime!(2024-07-01 20:00:00 UTC)), &cfg).unwrap();
        assert_eq!(same_day.counters().processed_today, 2);

        let next_day = Session::open(&storage, clock_at(datetime!(2024-07-02 08:00:00 UTC)), &cfg).unwrap();
        assert_eq!(next_day.counters().processed_today, 0);
        assert_eq!(next_day.counters().total_processed, 2);
        assert_eq!(next_day.store().len(), 2);
    }
}
