// src/capture.rs

use clap::ValueEnum;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where an image came from. Only affects logging; every source is read the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptureSource {
    Camera,
    FilePicker,
    DragDrop,
}

/// A captured file, handed as-is to the extraction stage.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub name: String,
    pub source: CaptureSource,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(name: impl Into<String>, source: CaptureSource, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source,
            bytes,
        }
    }

    /// SHA-256 of the payload bytes, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// One file per invocation: the first one wins.
pub fn select_first<I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut paths = paths.into_iter();
    let first = paths.next()?;
    let ignored = paths.count();
    if ignored > 0 {
        warn!(
            file = %first.display(),
            ignored = ignored,
            "Several files supplied; only the first is processed"
        );
    }
    Some(first)
}

/// Read a file into a payload. No type or size checks are made.
pub async fn read_payload(path: &Path, source: CaptureSource) -> std::io::Result<ImagePayload> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let payload = ImagePayload::new(name, source, bytes);
    info!(
        file = %payload.name,
        source = ?payload.source,
        bytes = payload.bytes.len(),
        sha256 = %payload.fingerprint(),
        "Captured file"
    );
    Ok(payload)
}
