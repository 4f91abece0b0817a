use std::fmt;

/// Anatomical plane of the slices in a volume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
    #[default]
    Unknown,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Axial => "Axial",
            Orientation::Coronal => "Coronal",
            Orientation::Sagittal => "Sagittal",
            Orientation::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Ordering key for slices of a multi-entry DICOM series.
///
/// Missing values sort as `0.0`, so incomplete ordering metadata still
/// yields a reproducible order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    ImagePositionPatient,
    TablePosition,
    #[default]
    InstanceNumber,
    None,
}

/// Encoding an archive was assembled from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    DicomSeries,
    MultiFrameDicom,
    Nifti,
    ImageSeries,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::DicomSeries => "DICOM Series",
            SourceFormat::MultiFrameDicom => "Multi-frame DICOM",
            SourceFormat::Nifti => "NIfTI",
            SourceFormat::ImageSeries => "Image Series",
        };
        f.write_str(name)
    }
}

/// Per-slice label returned by a classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    Normal,
    Anomaly,
    Unknown,
}

impl Label {
    /// Parse a generated answer of the form `label: <normal|anomaly>`.
    ///
    /// Only the first line after `label:` is inspected. Anything that
    /// does not name a label is [`Label::Unknown`].
    pub fn from_text(text: &str) -> Self {
        let Some((_, rest)) = text.split_once("label:") else {
            return Label::Unknown;
        };
        let lowered = rest.lines().next().unwrap_or_default().trim().to_lowercase();
        if lowered.contains("anomaly") {
            Label::Anomaly
        } else if lowered.contains("normal") {
            Label::Normal
        } else {
            Label::Unknown
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::Normal => "normal",
            Label::Anomaly => "anomaly",
            Label::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
