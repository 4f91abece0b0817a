//! Processing of many archives at once.
//!
//! Archives are independent: each runs through its own pipeline on the
//! rayon pool and only the classifier is shared. A failing archive turns
//! into a [`ArchiveOutcome::Failed`] row and never stops the batch.

use rayon::prelude::*;
use std::time::Duration;

use crate::{
    archive_reader::Archive,
    classifier::{SliceClassifier, run_inference},
    config::{CancelFlag, PipelineConfig},
    consensus::StudyVerdict,
    metadata::Metadata,
    parse_archive_with_cancel,
    validation::{ValidationReport, validate},
};

/// Result for one series of a processed archive.
#[derive(Debug, Clone)]
pub struct StudyOutcome {
    pub series_id: String,
    pub metadata: Metadata,
    pub report: ValidationReport,
    /// `None` when validation failed and the classifier was not run.
    pub verdict: Option<StudyVerdict>,
    pub processing_time: Duration,
}

impl StudyOutcome {
    pub fn has_pathology(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| v.has_pathology)
    }
}

#[derive(Debug, Clone)]
pub enum ArchiveOutcome {
    Processed {
        archive_name: String,
        studies: Vec<StudyOutcome>,
        skipped_entries: usize,
    },
    Failed {
        archive_name: String,
        message: String,
    },
}

impl ArchiveOutcome {
    pub fn archive_name(&self) -> &str {
        match self {
            ArchiveOutcome::Processed { archive_name, .. }
            | ArchiveOutcome::Failed { archive_name, .. } => archive_name,
        }
    }
}

/// Parse, validate and, for valid series, classify one archive.
pub fn process_archive(
    archive: &Archive,
    classifier: &dyn SliceClassifier,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> ArchiveOutcome {
    let parsed = match parse_archive_with_cancel(archive, config, cancel) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::warn!("{}: {err}", archive.name);
            return ArchiveOutcome::Failed {
                archive_name: archive.name.clone(),
                message: err.to_string(),
            };
        }
    };

    let studies = parsed
        .series
        .into_values()
        .map(|series| {
            let (series_id, volume, metadata) = series.into_parts();
            let report = validate(&metadata);

            let (verdict, processing_time) = if report.overall_valid() {
                let result = run_inference(&volume, classifier, &config.policy);
                (Some(result.verdict), result.processing_time)
            } else {
                log::info!(
                    "{}/{series_id}: {} validation checks failed, skipping inference",
                    archive.name,
                    report.failures().count()
                );
                (None, Duration::ZERO)
            };

            StudyOutcome {
                series_id,
                metadata,
                report,
                verdict,
                processing_time,
            }
        })
        .collect();

    ArchiveOutcome::Processed {
        archive_name: archive.name.clone(),
        studies,
        skipped_entries: parsed.skipped_entries,
    }
}

/// Process archives in parallel, one outcome per archive in input order.
pub fn process_batch(
    archives: &[Archive],
    classifier: &dyn SliceClassifier,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Vec<ArchiveOutcome> {
    archives
        .par_iter()
        .map(|archive| process_archive(archive, classifier, config, cancel))
        .collect()
}
