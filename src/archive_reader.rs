use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::config::CancelFlag;
use crate::error::ArchiveError;

/// Path prefixes and file names written by desktop platforms that never
/// carry study data.
const JUNK_PREFIXES: [&str; 1] = ["__MACOSX/"];
const JUNK_FILE_NAMES: [&str; 2] = [".DS_Store", "Thumbs.db"];

/// An uploaded archive: the raw payload plus a display name.
#[derive(Debug, Clone)]
pub struct Archive {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Archive {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an archive from disk, named after its path.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(Self::new(path.display().to_string(), bytes))
    }

    /// Last path component of the display name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(&self.name)
    }
}

/// A single file read from an archive.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

impl Entry {
    pub(crate) fn has_suffix(&self, suffixes: &[&str]) -> bool {
        let lowered = self.name.to_lowercase();
        suffixes.iter().any(|suffix| lowered.ends_with(suffix))
    }
}

pub struct ArchiveReader;

impl ArchiveReader {
    /// Read every non-directory, non-junk entry of a ZIP payload.
    ///
    /// # Errors
    ///
    /// Returns error if the payload exceeds `max_bytes`, the container
    /// cannot be read, or it holds no usable entries
    pub fn read_entries(
        bytes: &[u8],
        max_bytes: usize,
        cancel: &CancelFlag,
    ) -> Result<Vec<Entry>, ArchiveError> {
        if bytes.len() > max_bytes {
            return Err(ArchiveError::Oversize {
                size: bytes.len(),
                limit: max_bytes,
            });
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            if cancel.is_cancelled() {
                return Err(ArchiveError::Cancelled);
            }

            let mut file = archive.by_index(index)?;
            if file.is_dir() || Self::is_junk(file.name()) {
                continue;
            }

            let name = file.name().to_owned();
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)
                .map_err(|err| ArchiveError::CorruptContainer(err.into()))?;
            entries.push(Entry { name, data });
        }

        if entries.is_empty() {
            return Err(ArchiveError::EmptyArchive);
        }

        log::debug!("Read {} entries from archive", entries.len());
        Ok(entries)
    }

    fn is_junk(name: &str) -> bool {
        if name.ends_with('/') || JUNK_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
            return true;
        }
        let file_name = name.rsplit('/').next().unwrap_or(name);
        JUNK_FILE_NAMES.contains(&file_name)
    }
}
