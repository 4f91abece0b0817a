use crate::{
    archive_reader::Entry,
    config::CancelFlag,
    enums::{Orientation, SortBy, SourceFormat},
    error::ArchiveError,
    metadata::{Metadata, ParsedArchive, Series},
    orientation::OrientationResolver,
    volume::Volume,
};

use dicom::{
    core::Tag,
    object::{
        DefaultDicomObject, FileMetaTableBuilder, InMemDicomObject, OpenFileOptions,
        file::ReadPreamble,
    },
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
    transfer_syntax::entries::IMPLICIT_VR_LITTLE_ENDIAN,
};
use dicom_dictionary_std::{tags, uids};
use ndarray::{Array2, Array3, s};
use std::collections::BTreeMap;

/// Series id used for entries without a SeriesInstanceUID.
pub const DEFAULT_SERIES_ID: &str = "default_series";

/// Series id used for a multi-frame object without a SeriesInstanceUID.
pub const MULTI_FRAME_SERIES_ID: &str = "MultiFrame_DICOM";

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Calibration and descriptive attributes read from one DICOM object.
#[derive(Debug, Clone)]
struct SliceHeader {
    slope: f32,
    intercept: f32,
    modality: Option<String>,
    orientation: Orientation,
    study_id: Option<String>,
    pixel_spacing: Option<[f64; 2]>,
    slice_thickness: Option<f64>,
    body_part_examined: Option<String>,
}

impl SliceHeader {
    fn read(dicom_object: &DefaultDicomObject) -> Self {
        let pixel_spacing = multi_float(dicom_object, tags::PIXEL_SPACING)
            .and_then(|values| Some([*values.first()?, *values.get(1)?]));

        Self {
            slope: float(dicom_object, tags::RESCALE_SLOPE).unwrap_or(1.0) as f32,
            intercept: float(dicom_object, tags::RESCALE_INTERCEPT).unwrap_or(0.0) as f32,
            modality: string(dicom_object, tags::MODALITY),
            orientation: OrientationResolver::from_direction_cosines(
                multi_float(dicom_object, tags::IMAGE_ORIENTATION_PATIENT).as_deref(),
            ),
            study_id: string(dicom_object, tags::STUDY_INSTANCE_UID),
            pixel_spacing,
            slice_thickness: float(dicom_object, tags::SLICE_THICKNESS),
            body_part_examined: string(dicom_object, tags::BODY_PART_EXAMINED),
        }
    }

    fn into_metadata(self, source_format: SourceFormat) -> Metadata {
        Metadata {
            source_format: Some(source_format),
            modality: self.modality,
            orientation: self.orientation,
            num_frames: 0,
            study_id: self.study_id,
            pixel_spacing: self.pixel_spacing,
            slice_thickness: self.slice_thickness,
            body_part_examined: self.body_part_examined,
        }
    }
}

/// One decoded single-frame entry awaiting grouping.
struct DicomSlice {
    order: Option<f32>,
    image: Array2<f32>,
    header: SliceHeader,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Check whether an entry holds a readable DICOM header. Pixel data is
    /// not read for Part 10 files.
    pub fn sniff(entry: &Entry) -> bool {
        Self::open(&entry.data, true).is_some()
    }

    /// Assemble every DICOM series found in `entries`.
    ///
    /// A lone entry declaring more than one frame is read as a multi-frame
    /// volume. Otherwise entries are grouped by SeriesInstanceUID and each
    /// group is stacked in `sort_by` order. Entries that cannot be read or
    /// carry no decodable pixel data are skipped and counted.
    ///
    /// # Errors
    ///
    /// Returns error if no group yields pixel data, a group mixes slice
    /// dimensions, or `cancel` is raised
    pub fn load_from_entries(
        entries: &[Entry],
        sort_by: SortBy,
        cancel: &CancelFlag,
    ) -> Result<ParsedArchive, ArchiveError> {
        if let [entry] = entries {
            if let Some(series) = Self::load_multi_frame(entry) {
                return Ok(ParsedArchive::single(series));
            }
        }

        let mut groups: BTreeMap<String, Vec<DicomSlice>> = BTreeMap::new();
        let mut skipped = 0;

        for entry in entries {
            if cancel.is_cancelled() {
                return Err(ArchiveError::Cancelled);
            }

            match Self::extract_slice(entry, &sort_by) {
                Some((series_id, slice)) => groups.entry(series_id).or_default().push(slice),
                None => {
                    log::debug!("Skipping {}: no readable DICOM pixel data", entry.name);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {skipped} of {} DICOM entries", entries.len());
        }

        if groups.is_empty() {
            return Err(ArchiveError::NoDicomSeries { skipped });
        }

        let mut parsed = ParsedArchive {
            skipped_entries: skipped,
            ..ParsedArchive::default()
        };
        for (series_id, mut slices) in groups {
            Self::sort_slices(&mut slices, sort_by);
            parsed.insert(Self::build_series(series_id, slices)?);
        }

        log::info!("Assembled {} DICOM series", parsed.series.len());
        Ok(parsed)
    }

    fn load_multi_frame(entry: &Entry) -> Option<Series> {
        let dicom_object = Self::open(&entry.data, false)?;
        let frames = int(&dicom_object, tags::NUMBER_OF_FRAMES).unwrap_or(1);
        if frames <= 1 {
            return None;
        }

        let header = SliceHeader::read(&dicom_object);
        let mut volume = Volume::new(Self::decode_frames(&dicom_object)?)?;
        volume.rescale(header.slope, header.intercept);

        let series_id = string(&dicom_object, tags::SERIES_INSTANCE_UID)
            .unwrap_or_else(|| MULTI_FRAME_SERIES_ID.to_owned());
        log::info!(
            "Read multi-frame DICOM {} with {} frames",
            entry.name,
            volume.depth()
        );

        Some(Series::new(
            series_id,
            volume,
            header.into_metadata(SourceFormat::MultiFrameDicom),
        ))
    }

    fn extract_slice(entry: &Entry, sort_by: &SortBy) -> Option<(String, DicomSlice)> {
        let dicom_object = Self::open(&entry.data, false)?;
        dicom_object.element(tags::PIXEL_DATA).ok()?;

        let image = Self::decode_frames(&dicom_object)?.slice_move(s![0, .., ..]);
        let series_id = string(&dicom_object, tags::SERIES_INSTANCE_UID)
            .unwrap_or_else(|| DEFAULT_SERIES_ID.to_owned());

        let slice = DicomSlice {
            order: Self::get_sort_order(&dicom_object, sort_by),
            image,
            header: SliceHeader::read(&dicom_object),
        };
        Some((series_id, slice))
    }

    fn get_sort_order(dicom_object: &DefaultDicomObject, sort_by: &SortBy) -> Option<f32> {
        match sort_by {
            SortBy::ImagePositionPatient => multi_float(dicom_object, tags::IMAGE_POSITION_PATIENT)
                .and_then(|pos| pos.get(2).map(|z| *z as f32)),
            SortBy::TablePosition => {
                float(dicom_object, tags::TABLE_POSITION).map(|pos| pos as f32)
            }
            SortBy::InstanceNumber => int(dicom_object, tags::INSTANCE_NUMBER).map(|n| n as f32),
            SortBy::None => None,
        }
    }

    /// Decode all frames as stored values, (frames, rows, columns).
    fn decode_frames(dicom_object: &DefaultDicomObject) -> Option<Array3<f32>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::None)
            .with_voi_lut(VoiLutOption::Identity);
        pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![.., .., .., 0]))
    }

    fn sort_slices(slices: &mut [DicomSlice], sort_by: SortBy) {
        if matches!(sort_by, SortBy::None) {
            return;
        }

        slices.sort_by(|a, b| {
            let a = a.order.unwrap_or(0.0);
            let b = b.order.unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        });

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            slices.reverse();
        }
    }

    fn build_series(series_id: String, slices: Vec<DicomSlice>) -> Result<Series, ArchiveError> {
        let (images, headers): (Vec<_>, Vec<_>) = slices
            .into_iter()
            .map(|slice| (slice.image, slice.header))
            .unzip();

        let Some(mut volume) = Volume::from_slices(&images) else {
            return Err(ArchiveError::InconsistentDimensions { series_id });
        };

        // Calibration of the first slice in order stands in for the series.
        let proxy = headers[0].clone();
        volume.rescale(proxy.slope, proxy.intercept);

        log::debug!("Series {series_id}: {} slices", volume.depth());
        Ok(Series::new(
            series_id,
            volume,
            proxy.into_metadata(SourceFormat::DicomSeries),
        ))
    }

    /// Open a Part 10 file, with or without its 128-byte preamble. Bytes
    /// without the `DICM` magic are read as a bare implicit VR little
    /// endian data set.
    fn open(bytes: &[u8], header_only: bool) -> Option<DefaultDicomObject> {
        let has_preamble = bytes.len() >= PREAMBLE_LEN + MAGIC.len()
            && &bytes[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] == MAGIC;
        let body = if has_preamble {
            &bytes[PREAMBLE_LEN..]
        } else {
            bytes
        };

        if !body.starts_with(MAGIC) {
            return Self::open_bare_dataset(body);
        }

        let options = OpenFileOptions::new().read_preamble(ReadPreamble::Never);
        let result = if header_only {
            options.read_until(tags::PIXEL_DATA).from_reader(body)
        } else {
            options.from_reader(body)
        };
        result.ok()
    }

    fn open_bare_dataset(bytes: &[u8]) -> Option<DefaultDicomObject> {
        let dataset =
            InMemDicomObject::read_dataset_with_ts(bytes, &IMPLICIT_VR_LITTLE_ENDIAN.erased())
                .ok()?;
        // An empty or unrelated payload can parse as a few opaque elements.
        if dataset.get(tags::SOP_CLASS_UID).is_none() && dataset.get(tags::MODALITY).is_none() {
            return None;
        }
        dataset
            .with_meta(FileMetaTableBuilder::new().transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN))
            .ok()
    }
}

fn string(dicom_object: &DefaultDicomObject, tag: Tag) -> Option<String> {
    let value = dicom_object.element(tag).ok()?.to_str().ok()?;
    let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn float(dicom_object: &DefaultDicomObject, tag: Tag) -> Option<f64> {
    dicom_object.element(tag).ok()?.to_float64().ok()
}

fn multi_float(dicom_object: &DefaultDicomObject, tag: Tag) -> Option<Vec<f64>> {
    dicom_object.element(tag).ok()?.to_multi_float64().ok()
}

fn int(dicom_object: &DefaultDicomObject, tag: Tag) -> Option<i32> {
    dicom_object.element(tag).ok()?.to_int::<i32>().ok()
}
