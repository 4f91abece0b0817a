use ndarray::Array2;

use crate::{
    archive_reader::Entry,
    enums::{Orientation, SourceFormat},
    error::ArchiveError,
    metadata::{IMAGE_MODALITY, Metadata, ParsedArchive, Series},
    volume::Volume,
};

pub const IMAGE_SUFFIXES: [&str; 3] = [".png", ".jpg", ".jpeg"];

pub struct ImageLoader;

impl ImageLoader {
    /// Stack raster images as grayscale slices, ordered by entry name.
    ///
    /// # Errors
    ///
    /// Returns error if there are no images, one fails to decode, or the
    /// images differ in size
    pub fn load_from_entries(
        mut entries: Vec<Entry>,
        archive_file_name: &str,
    ) -> Result<ParsedArchive, ArchiveError> {
        if entries.is_empty() {
            return Err(ArchiveError::NoImages);
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let slices = entries
            .iter()
            .map(Self::decode_image)
            .collect::<Result<Vec<_>, _>>()?;

        let series_id = format!("ImageSeries_{archive_file_name}");
        let Some(volume) = Volume::from_slices(&slices) else {
            return Err(ArchiveError::InconsistentDimensions { series_id });
        };

        let metadata = Metadata {
            source_format: Some(SourceFormat::ImageSeries),
            modality: Some(IMAGE_MODALITY.to_owned()),
            orientation: Orientation::Unknown,
            ..Metadata::default()
        };

        log::info!("Read image series of {} slices", volume.depth());
        Ok(ParsedArchive::single(Series::new(series_id, volume, metadata)))
    }

    fn decode_image(entry: &Entry) -> Result<Array2<f32>, ArchiveError> {
        let gray = image::load_from_memory(&entry.data)
            .map_err(|source| ArchiveError::ImageDecode {
                name: entry.name.clone(),
                source,
            })?
            .into_luma8();

        let (width, height) = gray.dimensions();
        let pixels: Vec<f32> = gray.into_raw().into_iter().map(f32::from).collect();
        Array2::from_shape_vec((height as usize, width as usize), pixels).map_err(|_| {
            ArchiveError::InconsistentDimensions {
                series_id: entry.name.clone(),
            }
        })
    }
}
