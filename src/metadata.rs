use std::collections::BTreeMap;

use crate::enums::{Orientation, SourceFormat};
use crate::volume::Volume;

/// Modality reported for NIfTI volumes, which carry no modality tag.
pub const NIFTI_MODALITY: &str = "NIFTI";

/// Modality reported for plain image sequences.
pub const IMAGE_MODALITY: &str = "IMAGE";

/// Uniform per-series metadata. Fields that a source format cannot
/// provide are `None` rather than absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub source_format: Option<SourceFormat>,
    pub modality: Option<String>,
    pub orientation: Orientation,
    pub num_frames: usize,
    pub study_id: Option<String>,
    /// Row and column spacing in mm
    pub pixel_spacing: Option<[f64; 2]>,
    pub slice_thickness: Option<f64>,
    pub body_part_examined: Option<String>,
}

/// One assembled stack of slices with its metadata.
#[derive(Debug, Clone)]
pub struct Series {
    id: String,
    volume: Volume,
    metadata: Metadata,
}

impl Series {
    /// `metadata.num_frames` is overwritten with the volume depth.
    pub fn new(id: impl Into<String>, volume: Volume, mut metadata: Metadata) -> Self {
        metadata.num_frames = volume.depth();
        Self {
            id: id.into(),
            volume,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn into_parts(self) -> (String, Volume, Metadata) {
        (self.id, self.volume, self.metadata)
    }
}

/// Every series assembled from one archive.
#[derive(Debug, Default)]
pub struct ParsedArchive {
    pub series: BTreeMap<String, Series>,
    /// DICOM entries dropped because they could not be read or decoded.
    /// Dropped entries shift the indices of the slices that follow them.
    pub skipped_entries: usize,
}

impl ParsedArchive {
    pub(crate) fn single(series: Series) -> Self {
        let mut parsed = Self::default();
        parsed.insert(series);
        parsed
    }

    pub(crate) fn insert(&mut self, series: Series) {
        self.series.insert(series.id().to_owned(), series);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn num_frames_follows_volume_depth() {
        let volume = Volume::new(Array3::zeros((7, 2, 2))).unwrap();
        let metadata = Metadata {
            num_frames: 99,
            ..Metadata::default()
        };
        let series = Series::new("1.2.3", volume, metadata);
        assert_eq!(series.metadata().num_frames, 7);
        assert_eq!(series.id(), "1.2.3");
    }
}
