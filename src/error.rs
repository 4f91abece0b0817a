use thiserror::Error;

/// Archive-scoped failures. None of these are fatal to a batch: the batch
/// driver records the message against the archive and moves on.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive is {size} bytes, above the {limit} byte limit")]
    Oversize { size: usize, limit: usize },

    #[error("Archive is not a readable ZIP container: {0}")]
    CorruptContainer(#[from] zip::result::ZipError),

    #[error("Archive is empty")]
    EmptyArchive,

    #[error("Archive must contain exactly one NIfTI volume, found {count}")]
    AmbiguousArchive { count: usize },

    #[error("No supported files (.nii, .png, .jpg) found and archive is not a DICOM series")]
    UnsupportedFormat,

    #[error("No readable DICOM series in archive ({skipped} entries skipped)")]
    NoDicomSeries { skipped: usize },

    #[error("Failed to read NIfTI file: {0}")]
    NiftiDecode(String),

    #[error("No images found in archive")]
    NoImages,

    #[error("Failed to decode image {name}: {source}")]
    ImageDecode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Inconsistent image dimensions in series {series_id}")]
    InconsistentDimensions { series_id: String },

    #[error("Archive processing was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
