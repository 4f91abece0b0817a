//! Pipeline configuration

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::consensus::AggregationPolicy;
use crate::enums::SortBy;

/// Default archive ceiling, 500 MiB.
pub const DEFAULT_MAX_ARCHIVE_BYTES: usize = 500 * 1024 * 1024;

/// Environment variable overriding the archive ceiling, in MiB.
pub const MAX_ARCHIVE_MB_ENV: &str = "MEDSCREEN_MAX_ARCHIVE_MB";

/// Parameters shared by every archive processed with the same pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Payloads larger than this are rejected before the container is
    /// opened (default: 500 MiB)
    pub max_archive_bytes: usize,

    /// Slice ordering for multi-entry DICOM series (default: InstanceNumber)
    pub sort_by: SortBy,

    /// Study-level aggregation of sampled slice votes
    /// (default: simple threshold at 0.1)
    pub policy: AggregationPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            sort_by: SortBy::default(),
            policy: AggregationPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration with the archive ceiling taken from
    /// `MEDSCREEN_MAX_ARCHIVE_MB` when it is set to a positive integer.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_ARCHIVE_MB_ENV) {
            match parse_archive_mb(&raw) {
                Some(bytes) => config.max_archive_bytes = bytes,
                None => log::warn!("Ignoring invalid {MAX_ARCHIVE_MB_ENV}={raw:?}"),
            }
        }
        config
    }
}

/// Positive MiB count as bytes, `None` if unparsable, zero or too large.
fn parse_archive_mb(raw: &str) -> Option<usize> {
    let mb = raw.trim().parse::<usize>().ok().filter(|&mb| mb > 0)?;
    mb.checked_mul(1024 * 1024)
}

/// Caller-owned cancellation signal, checked between archive entries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
