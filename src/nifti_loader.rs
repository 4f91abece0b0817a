//! NIfTI-1 volumes read from archive entries.
//!
//! The voxel array is reordered so that depth is the leading axis whenever
//! the affine says the first two voxel axes run left/right then
//! anterior/posterior. Pixel spacing and slice thickness follow the
//! reordered axes.

use std::io::Cursor;

use flate2::read::GzDecoder;
use ndarray::{ArrayD, Axis, Ix3, IxDyn};
use nifti::{InMemNiftiObject, IntoNdArray, NiftiHeader, NiftiObject};

use crate::{
    archive_reader::Entry,
    enums::{Orientation, SourceFormat},
    error::ArchiveError,
    metadata::{Metadata, NIFTI_MODALITY, ParsedArchive, Series},
    volume::Volume,
};

pub const NIFTI_SUFFIXES: [&str; 2] = [".nii", ".nii.gz"];

type Matrix3 = [[f64; 3]; 3];

pub struct NiftiLoader;

impl NiftiLoader {
    /// Load the single NIfTI entry of an archive.
    ///
    /// # Errors
    ///
    /// Returns error if more than one entry is supplied or the entry cannot
    /// be decoded into a 3-D volume
    pub fn load_from_entries(entries: &[Entry]) -> Result<ParsedArchive, ArchiveError> {
        let entry = match entries {
            [entry] => entry,
            _ => {
                return Err(ArchiveError::AmbiguousArchive {
                    count: entries.len(),
                });
            }
        };

        let series = Self::load_entry(entry).map_err(ArchiveError::NiftiDecode)?;
        log::info!(
            "Read NIfTI {} with {} slices",
            entry.name,
            series.volume().depth()
        );
        Ok(ParsedArchive::single(series))
    }

    fn load_entry(entry: &Entry) -> Result<Series, String> {
        let object = Self::read_object(&entry.data)?;
        let header = object.header().clone();

        let array = object
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| format!("cannot convert voxels to f32: {e}"))?;

        // Rebuilt through shape and values so the decoder's ndarray version
        // does not leak into ours.
        let shape = array.shape().to_vec();
        let values: Vec<f32> = array.iter().copied().collect();
        let mut array = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| format!("invalid volume shape {shape:?}: {e}"))?;

        if array.ndim() < 3 {
            return Err(format!("expected at least 3D volume, got {}D", array.ndim()));
        }
        while array.ndim() > 3 {
            let last = Axis(array.ndim() - 1);
            array = array.index_axis_move(last, 0);
        }
        let array = array
            .into_dimensionality::<Ix3>()
            .map_err(|e| e.to_string())?;

        let zooms = [
            f64::from(header.pixdim[1]),
            f64::from(header.pixdim[2]),
            f64::from(header.pixdim[3]),
        ];
        let codes = axis_codes(&best_affine(&header));
        let leading_in_plane = matches!(codes[0], Some('L' | 'R'))
            && matches!(codes[1], Some('A' | 'P'));
        log::debug!("NIfTI axis codes {codes:?}, zooms {zooms:?}");

        let (array, pixel_spacing) = if leading_in_plane {
            let transposed = array.permuted_axes([2, 1, 0]).as_standard_layout().into_owned();
            (transposed, [zooms[1], zooms[0]])
        } else {
            (array, [zooms[0], zooms[1]])
        };

        let volume = Volume::new(array).ok_or_else(|| "volume has no slices".to_owned())?;
        let metadata = Metadata {
            source_format: Some(SourceFormat::Nifti),
            modality: Some(NIFTI_MODALITY.to_owned()),
            orientation: Orientation::Axial,
            num_frames: 0,
            study_id: None,
            pixel_spacing: Some(pixel_spacing),
            slice_thickness: Some(zooms[2]),
            body_part_examined: None,
        };

        Ok(Series::new(format!("NIfTI_{}", entry.name), volume, metadata))
    }

    fn read_object(bytes: &[u8]) -> Result<InMemNiftiObject, String> {
        if is_gzip(bytes) {
            InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes)))
                .map_err(|e| format!("gzip stream: {e}"))
        } else {
            InMemNiftiObject::from_reader(Cursor::new(bytes))
                .map_err(|e| e.to_string())
        }
    }
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Rotation/scale part of the voxel-to-world transform: sform, then qform,
/// then a pixdim diagonal with the x axis flipped.
fn best_affine(header: &NiftiHeader) -> Matrix3 {
    let pixdim = |i: usize| f64::from(header.pixdim[i]);

    if header.sform_code > 0 {
        let row = |r: &[f32; 4]| [f64::from(r[0]), f64::from(r[1]), f64::from(r[2])];
        return [row(&header.srow_x), row(&header.srow_y), row(&header.srow_z)];
    }

    if header.qform_code > 0 {
        let (b, c, d) = (
            f64::from(header.quatern_b),
            f64::from(header.quatern_c),
            f64::from(header.quatern_d),
        );
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let rotation = [
            [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
            [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
            [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - b * b - c * c],
        ];
        let scale = [pixdim(1), pixdim(2), pixdim(3) * qfac];
        return rotation.map(|row| [row[0] * scale[0], row[1] * scale[1], row[2] * scale[2]]);
    }

    [
        [-pixdim(1), 0.0, 0.0],
        [0.0, pixdim(2), 0.0],
        [0.0, 0.0, pixdim(3)],
    ]
}

/// Anatomical direction each voxel axis points towards (`R`/`L`, `A`/`P`,
/// `S`/`I`), assigning world axes greedily by largest magnitude.
fn axis_codes(affine: &Matrix3) -> [Option<char>; 3] {
    const LABELS: [(char, char); 3] = [('R', 'L'), ('A', 'P'), ('S', 'I')];

    let mut codes = [None; 3];
    let mut used_world = [false; 3];
    let mut used_voxel = [false; 3];

    for _ in 0..3 {
        let mut best: Option<(usize, usize, f64)> = None;
        for (world, row) in affine.iter().enumerate() {
            for (voxel, &value) in row.iter().enumerate() {
                if used_world[world] || used_voxel[voxel] || !value.is_finite() || value == 0.0 {
                    continue;
                }
                if best.is_none_or(|(_, _, b)| value.abs() > b.abs()) {
                    best = Some((world, voxel, value));
                }
            }
        }

        let Some((world, voxel, value)) = best else {
            break;
        };
        used_world[world] = true;
        used_voxel[voxel] = true;
        let (positive, negative) = LABELS[world];
        codes[voxel] = Some(if value > 0.0 { positive } else { negative });
    }

    codes
}
