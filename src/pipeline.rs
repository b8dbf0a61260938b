// src/pipeline.rs

use crate::capture::ImagePayload;
use crate::error::ExtractError;
use crate::extract::ExtractionProvider;
use crate::model::ExtractedFields;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{Instrument, info, info_span, warn};

/// Runs at most one extraction at a time and drives the loading indicator.
///
/// A new submission aborts the job in flight; the aborted job resolves to
/// [`ExtractError::Superseded`].
pub struct Pipeline {
    provider: Arc<dyn ExtractionProvider>,
    loading: Arc<watch::Sender<bool>>,
    generation: Arc<AtomicU64>,
    in_flight: Option<AbortHandle>,
}

/// Handle to one submitted extraction.
pub struct ExtractionJob {
    handle: JoinHandle<Result<ExtractedFields, ExtractError>>,
}

impl ExtractionJob {
    pub async fn outcome(self) -> Result<ExtractedFields, ExtractError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ExtractError::Superseded),
            Err(e) => Err(ExtractError::Task(e.to_string())),
        }
    }
}

impl Pipeline {
    pub fn new(provider: Arc<dyn ExtractionProvider>) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            provider,
            loading: Arc::new(loading),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
        }
    }

    /// Subscribe to the loading indicator (`true` while a job runs).
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn submit(&mut self, image: ImagePayload) -> ExtractionJob {
        if let Some(previous) = self.in_flight.take() {
            if !previous.is_finished() {
                warn!(file = %image.name, "New submission supersedes the extraction in flight");
            }
            previous.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.loading.send_replace(true);

        let provider = Arc::clone(&self.provider);
        let loading = Arc::clone(&self.loading);
        let current = Arc::clone(&self.generation);
        let span = info_span!(
            "extract",
            file = %image.name,
            provider = provider.name(),
            generation = generation
        );

        let handle = tokio::spawn(
            async move {
                info!(sha256 = %image.fingerprint(), "Extraction started");
                let result = provider.extract(&image).await;
                clear_if_current(&loading, &current, generation);
                match &result {
                    Ok(fields) => info!(confidence = fields.confidence, "Extraction finished"),
                    Err(e) => warn!(error = %e, "Extraction failed"),
                }
                result
            }
            .instrument(span),
        );

        self.in_flight = Some(handle.abort_handle());
        ExtractionJob { handle }
    }

    /// Abort the job in flight, if any, and switch the indicator off.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.loading.send_replace(false);
            info!("Extraction cancelled");
        }
    }
}

/// Only the newest job may switch the indicator off.
fn clear_if_current(loading: &watch::Sender<bool>, current: &AtomicU64, generation: u64) {
    loading.send_if_modified(|busy| {
        if current.load(Ordering::SeqCst) == generation && *busy {
            *busy = false;
            true
        } else {
            false
        }
    });
}
