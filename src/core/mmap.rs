use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::core::{Error, Result};

/// Read-only snapshot of a log file.
///
/// The length is fixed when the file is opened; bytes appended by the writer
/// afterwards are not visible through this mapping. Dropping the value
/// releases the mapping and the file handle.
pub struct MmapFile {
    _file: File,
    map: Option<Mmap>,
    len: usize,
}

impl MmapFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(path.display().to_string()));
            }
            Err(err) => return Err(Error::Io(err)),
        };
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let len = meta.len() as usize;
        // Zero-length files cannot be mapped.
        let map = if len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().len(len).map(&file)? })
        };
        Ok(Self {
            _file: file,
            map,
            len,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.map {
            Some(map) => map,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
