//! Archive format detection.
//!
//! Formats are tried in a fixed priority order, once per archive. Formats
//! identified by file extension come first; DICOM is the fallback because
//! DICOM files commonly carry no extension and are only recognised by
//! parsing a header.

use std::fmt;

use crate::{
    archive_reader::Entry,
    config::{CancelFlag, PipelineConfig},
    error::ArchiveError,
    image_loader::{IMAGE_SUFFIXES, ImageLoader},
    metadata::ParsedArchive,
    nifti_loader::{NIFTI_SUFFIXES, NiftiLoader},
    volume_loader::VolumeLoader,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Nifti,
    ImageSeries,
    Dicom,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveFormat::Nifti => "NIfTI",
            ArchiveFormat::ImageSeries => "image series",
            ArchiveFormat::Dicom => "DICOM",
        };
        f.write_str(name)
    }
}

/// Per-archive inputs the format parsers need besides the entries.
pub(crate) struct ParseContext<'a> {
    pub archive_file_name: &'a str,
    pub config: &'a PipelineConfig,
    pub cancel: &'a CancelFlag,
}

struct FormatHandler {
    format: ArchiveFormat,
    detect: fn(&[Entry]) -> Result<bool, ArchiveError>,
    parse: fn(Vec<Entry>, &ParseContext<'_>) -> Result<ParsedArchive, ArchiveError>,
}

static HANDLERS: [FormatHandler; 3] = [
    FormatHandler {
        format: ArchiveFormat::Nifti,
        detect: detect_nifti,
        parse: parse_nifti,
    },
    FormatHandler {
        format: ArchiveFormat::ImageSeries,
        detect: detect_images,
        parse: parse_images,
    },
    FormatHandler {
        format: ArchiveFormat::Dicom,
        detect: detect_dicom,
        parse: parse_dicom,
    },
];

pub struct FormatClassifier;

impl FormatClassifier {
    /// Pick the format of an archive from its entries.
    ///
    /// # Errors
    ///
    /// Returns error if several NIfTI volumes are present or no format
    /// matches
    pub fn detect(entries: &[Entry]) -> Result<ArchiveFormat, ArchiveError> {
        Self::handler_for(entries).map(|handler| handler.format)
    }

    pub(crate) fn parse(
        entries: Vec<Entry>,
        context: &ParseContext<'_>,
    ) -> Result<ParsedArchive, ArchiveError> {
        let handler = Self::handler_for(&entries)?;
        log::debug!(
            "{} detected as {}",
            context.archive_file_name,
            handler.format
        );
        (handler.parse)(entries, context)
    }

    fn handler_for(entries: &[Entry]) -> Result<&'static FormatHandler, ArchiveError> {
        for handler in &HANDLERS {
            if (handler.detect)(entries)? {
                return Ok(handler);
            }
        }
        Err(ArchiveError::UnsupportedFormat)
    }
}

fn detect_nifti(entries: &[Entry]) -> Result<bool, ArchiveError> {
    match entries.iter().filter(|e| e.has_suffix(&NIFTI_SUFFIXES)).count() {
        0 => Ok(false),
        1 => Ok(true),
        count => Err(ArchiveError::AmbiguousArchive { count }),
    }
}

fn parse_nifti(
    entries: Vec<Entry>,
    _context: &ParseContext<'_>,
) -> Result<ParsedArchive, ArchiveError> {
    let volumes: Vec<_> = entries
        .into_iter()
        .filter(|e| e.has_suffix(&NIFTI_SUFFIXES))
        .collect();
    NiftiLoader::load_from_entries(&volumes)
}

fn detect_images(entries: &[Entry]) -> Result<bool, ArchiveError> {
    Ok(entries.iter().any(|e| e.has_suffix(&IMAGE_SUFFIXES)))
}

fn parse_images(
    entries: Vec<Entry>,
    context: &ParseContext<'_>,
) -> Result<ParsedArchive, ArchiveError> {
    let images = entries
        .into_iter()
        .filter(|e| e.has_suffix(&IMAGE_SUFFIXES))
        .collect();
    ImageLoader::load_from_entries(images, context.archive_file_name)
}

fn detect_dicom(entries: &[Entry]) -> Result<bool, ArchiveError> {
    Ok(entries.first().is_some_and(VolumeLoader::sniff))
}

fn parse_dicom(
    entries: Vec<Entry>,
    context: &ParseContext<'_>,
) -> Result<ParsedArchive, ArchiveError> {
    VolumeLoader::load_from_entries(&entries, context.config.sort_by, context.cancel)
}
