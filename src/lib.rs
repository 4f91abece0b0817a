//! # medscreen
//!
//! This crate turns an uploaded ZIP archive holding one imaging study into
//! calibrated 3-D volumes with uniform metadata, screens them against
//! chest CT criteria and aggregates sparse per-slice classifier votes into
//! a study-level pathology decision.
//!
//! Supported archive contents, detected in this order:
//!  - a single NIfTI volume (`.nii` or `.nii.gz`)
//!  - a sequence of PNG/JPEG slices, ordered by file name
//!  - DICOM files, either one multi-frame object or a series of
//!    single-frame objects grouped by Series Instance UID
//!
//! DICOM pixel values are converted with Rescale Slope/Intercept, so CT
//! volumes are in Hounsfield units. Volumes are always ordered
//! (depth, height, width).
//!
//! The classifier itself is not part of this crate. Callers implement
//! [`SliceClassifier`] and hand it to [`run_inference`] or the batch
//! driver.
//!
//! # Examples
//!
//! ## Parsing and screening an archive
//!
//! ```no_run
//! # use medscreen::{Archive, PipelineConfig, parse_archive, validate, plan_slices};
//! let bytes = std::fs::read("study.zip").expect("should have read archive");
//! let archive = Archive::new("study.zip", bytes);
//! let parsed = parse_archive(&archive, &PipelineConfig::default())
//!     .expect("should have assembled at least one series");
//! for (series_id, series) in &parsed.series {
//!     let report = validate(series.metadata());
//!     let plan = plan_slices(series.volume().depth());
//!     println!("{series_id}: valid={} sampled={}", report.overall_valid(), plan.len());
//! }
//! ```

pub mod archive_reader;
pub mod batch;
pub mod classifier;
pub mod config;
pub mod consensus;
pub mod enums;
pub mod error;
pub mod format;
pub mod image_loader;
pub mod metadata;
pub mod nifti_loader;
pub mod orientation;
pub mod sampler;
pub mod validation;
pub mod volume;
pub mod volume_loader;

pub use archive_reader::{Archive, ArchiveReader, Entry};
pub use batch::{ArchiveOutcome, StudyOutcome, process_archive, process_batch};
pub use classifier::{ClassifierError, InferenceResult, SliceClassifier, run_inference};
pub use config::{CancelFlag, PipelineConfig};
pub use consensus::{
    AggregationPolicy, StudyVerdict, VoteRecord, aggregate, aggregate_with_threshold,
};
pub use enums::{Label, Orientation, SortBy, SourceFormat};
pub use error::ArchiveError;
pub use format::{ArchiveFormat, FormatClassifier};
pub use metadata::{Metadata, ParsedArchive, Series};
pub use sampler::{SlicePlan, plan_slices, select_step};
pub use validation::{ValidationCheck, ValidationReport, validate};
pub use volume::Volume;

use format::ParseContext;

/// Assemble every series contained in `archive`.
///
/// # Errors
///
/// Returns error if the archive is too large, unreadable, empty, of an
/// unsupported or ambiguous format, or yields no volume
pub fn parse_archive(
    archive: &Archive,
    config: &PipelineConfig,
) -> Result<ParsedArchive, ArchiveError> {
    parse_archive_with_cancel(archive, config, &CancelFlag::new())
}

/// [`parse_archive`] that stops with [`ArchiveError::Cancelled`] once
/// `cancel` is raised. A cancelled archive never yields partial series.
pub fn parse_archive_with_cancel(
    archive: &Archive,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Result<ParsedArchive, ArchiveError> {
    let entries = ArchiveReader::read_entries(&archive.bytes, config.max_archive_bytes, cancel)?;
    let context = ParseContext {
        archive_file_name: archive.file_name(),
        config,
        cancel,
    };
    let parsed = FormatClassifier::parse(entries, &context)?;

    log::info!(
        "{}: {} series assembled",
        archive.name,
        parsed.series.len()
    );
    Ok(parsed)
}
