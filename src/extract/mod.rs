// src/extract/mod.rs

mod heuristics;
mod mock;

pub use heuristics::HeuristicOcr;
pub use mock::MockOcr;
#[cfg(test)]
pub use mock::{MOCK_CONFIDENCE, VENDORS};

use crate::capture::ImagePayload;
use crate::clock::Clock;
use crate::config::{ExtractionConfig, ProviderKind};
use crate::error::ExtractError;
use crate::model::ExtractedFields;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Turns a captured image into reviewable fields.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, image: &ImagePayload) -> Result<ExtractedFields, ExtractError>;
}

/// Build the provider selected in `[extraction]`.
pub fn provider_from_config(
    cfg: &ExtractionConfig,
    clock: Arc<dyn Clock>,
) -> Arc<dyn ExtractionProvider> {
    let provider: Arc<dyn ExtractionProvider> = match cfg.provider {
        ProviderKind::Mock => Arc::new(MockOcr::new(cfg.latency(), clock)),
        ProviderKind::Heuristic => Arc::new(HeuristicOcr::new(clock)),
    };
    info!(provider = provider.name(), "Extraction provider selected");
    provider
}
