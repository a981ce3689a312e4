use alloc::{boxed::Box, string::String, vec::Vec};
use core::cell::RefCell;
use embedded_io::{Read, Seek};
use embedded_zip::{Compression, ZipFileEntry};
use log::{debug, info, warn};

use crate::fs::{Error, IoSystem, Mode, Result};
use crate::memory::MemoryStream;
use crate::path;

/// Exposes the members of a ZIP archive as files.
///
/// The central directory is read once on construction. Opening a member
/// inflates it completely into a [`MemoryStream`], so the returned stream
/// seeks freely and does not borrow the archive.
///
/// The backing reader sits in a `RefCell`; share the system between threads
/// by opening one archive per thread.
pub struct ZipIoSystem<R> {
    reader: RefCell<R>,
    entries: Box<[ZipFileEntry]>,
    // normalized member names, parallel to `entries`; `None` for members
    // that cannot be opened
    names: Box<[Option<String>]>,
}

impl<R: Read + Seek> ZipIoSystem<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let entries = embedded_zip::parse_zip(&mut reader)?;
        let names: Vec<Option<String>> = entries
            .iter()
            .map(|entry| {
                if entry.is_dir() {
                    None
                } else if entry.encrypted || matches!(entry.compression, Compression::Other(_)) {
                    debug!("Skipping unreadable member {}", entry.name);
                    None
                } else {
                    path::normalize(&entry.name)
                }
            })
            .collect();
        info!("Mounted ZIP archive with {} entries", entries.len());
        Ok(Self {
            reader: RefCell::new(reader),
            entries,
            names: names.into_boxed_slice(),
        })
    }
}

impl<R> ZipIoSystem<R> {
    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn find(&self, path: &str) -> Option<&ZipFileEntry> {
        let wanted = path::normalize(path)?;
        let names = self.names.iter().enumerate();
        let idx = names
            .clone()
            .find(|(_, name)| name.as_deref() == Some(wanted.as_str()))
            .or_else(|| {
                names.clone().find(|(_, name)| {
                    name.as_deref()
                        .is_some_and(|name| path::eq_ignore_case(name, &wanted))
                })
            })
            .map(|(idx, _)| idx);
        if idx.is_none() {
            debug!("{wanted} not in archive");
        }
        self.entries.get(idx?)
    }
}

impl<R: Read + Seek> IoSystem for ZipIoSystem<R> {
    type Stream = MemoryStream;

    fn exists(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<MemoryStream> {
        if mode.is_write() {
            return Err(Error::ReadOnly);
        }
        let entry = self.find(path).ok_or(Error::NotFound)?;
        let mut reader = self.reader.borrow_mut();
        let data = embedded_zip::read_entry(&mut *reader, entry).map_err(|e| {
            warn!("Failed to read {} from archive: {e}", entry.name);
            Error::from(e)
        })?;
        Ok(MemoryStream::new(data))
    }

    fn compare_paths(&self, a: &str, b: &str) -> bool {
        match (path::normalize(a), path::normalize(b)) {
            (Some(a), Some(b)) => path::eq_ignore_case(&a, &b),
            _ => false,
        }
    }
}
