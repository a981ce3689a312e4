use alloc::{collections::BTreeMap, format, string::String, sync::Arc};
use embedded_io::{ErrorKind, ErrorType, SeekFrom};
use log::debug;

use crate::fs::{Error, IoSystem, Mode, Result};
use crate::io::{Stream, seek_target};
use crate::path;

/// Name under which [`MemoryIoSystem::from_buffer`] registers its buffer.
pub const MAGIC_FILE_NAME: &str = "$$$___magic___$$$";

/// Read-only stream over shared bytes.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    data: Arc<[u8]>,
    pos: usize,
}

impl MemoryStream {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        MemoryStream {
            data: data.into(),
            pos: 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ErrorType for MemoryStream {
    type Error = ErrorKind;
}

impl embedded_io::Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, ErrorKind> {
        let remaining = self.data.get(self.pos..).unwrap_or_default();
        let n = core::cmp::min(remaining.len(), buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl embedded_io::Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> core::result::Result<u64, ErrorKind> {
        self.pos = seek_target(pos, self.pos, self.data.len())?;
        Ok(self.pos as u64)
    }
}

impl embedded_io::Write for MemoryStream {
    fn write(&mut self, _buf: &[u8]) -> core::result::Result<usize, ErrorKind> {
        Err(ErrorKind::Unsupported)
    }

    fn flush(&mut self) -> core::result::Result<(), ErrorKind> {
        Ok(())
    }
}

impl Stream for MemoryStream {
    fn size(&self) -> usize {
        self.data.len()
    }
}

/// Files held in memory, keyed by normalized path.
///
/// Used as a fixture in tests and to hand a caller-owned buffer to a loader
/// that expects a file name. Mount it above another provider in a
/// [`LayeredIoSystem`](crate::layered::LayeredIoSystem) to fall back to that
/// provider for everything else.
#[derive(Debug, Default, Clone)]
pub struct MemoryIoSystem {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryIoSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `data` under the magic file name, suffixed with the
    /// extension `hint` so loaders can still pick a format by extension.
    /// Returns the system and the name to open.
    pub fn from_buffer(data: impl Into<Arc<[u8]>>, hint: &str) -> (Self, String) {
        let hint = hint.trim_start_matches('.');
        let name = if hint.is_empty() {
            String::from(MAGIC_FILE_NAME)
        } else {
            // the returned name must be the key it is stored under
            path::normalize(&format!("{MAGIC_FILE_NAME}.{hint}"))
                .unwrap_or_else(|| String::from(MAGIC_FILE_NAME))
        };
        let mut system = Self::new();
        system.files.insert(name.clone(), data.into());
        (system, name)
    }

    /// Adds or replaces a file. Returns the previous contents, if any.
    ///
    /// Paths that do not name a resource are ignored.
    pub fn insert(&mut self, path: &str, data: impl Into<Arc<[u8]>>) -> Option<Arc<[u8]>> {
        let Some(key) = path::normalize(path) else {
            debug!("Ignoring memory file with invalid path {path:?}");
            return None;
        };
        self.files.insert(key, data.into())
    }

    pub fn remove(&mut self, path: &str) -> Option<Arc<[u8]>> {
        self.files.remove(&path::normalize(path)?)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    fn get(&self, path: &str) -> Option<&Arc<[u8]>> {
        self.files.get(&path::normalize(path)?)
    }
}

impl IoSystem for MemoryIoSystem {
    type Stream = MemoryStream;

    fn exists(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<MemoryStream> {
        if mode.is_write() {
            return Err(Error::ReadOnly);
        }
        let data = self.get(path).ok_or(Error::NotFound)?;
        Ok(MemoryStream {
            data: data.clone(),
            pos: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Seek, Write};

    const MESH: &[u8] = b"solid tri\nendsolid tri\n";

    #[test]
    fn test_exists_and_open() {
        let mut fs = MemoryIoSystem::new();
        assert!(fs.is_empty());
        fs.insert("models\\tri.stl", MESH);
        assert_eq!(fs.len(), 1);

        assert!(fs.exists("models/tri.stl"));
        assert!(fs.exists("./models//tri.stl"));
        assert!(!fs.exists("models/TRI.stl"));
        assert!(!fs.exists("models"));

        let mut stream = fs.open("models/tri.stl").unwrap();
        assert_eq!(stream.size(), MESH.len());
        assert_eq!(stream.read_all().unwrap(), MESH);
        fs.close(stream);
    }

    #[test]
    fn test_missing_is_not_found() {
        let fs = MemoryIoSystem::new();
        for path in ["missing.obj", "", "/", "a/.."] {
            assert!(!fs.exists(path));
            assert_eq!(fs.open(path).unwrap_err(), Error::NotFound);
        }
    }

    #[test]
    fn test_read_only() {
        let mut fs = MemoryIoSystem::new();
        fs.insert("tri.stl", MESH);
        assert_eq!(fs.open_with_mode("tri.stl", Mode::Write).unwrap_err(), Error::ReadOnly);

        let mut stream = fs.open("tri.stl").unwrap();
        assert_eq!(stream.write(b"x"), Err(ErrorKind::Unsupported));
        assert_eq!(stream.flush(), Ok(()));
    }

    #[test]
    fn test_stream_seek() {
        let mut stream = MemoryStream::new(MESH);
        assert_eq!(stream.seek(SeekFrom::End(-4)).unwrap(), (MESH.len() - 4) as u64);
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"tri\n");

        assert_eq!(stream.seek(SeekFrom::Start(6)).unwrap(), 6);
        assert_eq!(stream.seek(SeekFrom::Current(-1)).unwrap(), 5);
        assert_eq!(stream.tell().unwrap(), 5);
        assert_eq!(stream.seek(SeekFrom::Current(-6)), Err(ErrorKind::InvalidInput));

        // past the end reads nothing
        assert_eq!(stream.seek(SeekFrom::Start(100)).unwrap(), 100);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert!(stream.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut fs = MemoryIoSystem::new();
        assert!(fs.insert("a.obj", &b"one"[..]).is_none());
        let previous = fs.insert("./a.obj", &b"two"[..]).unwrap();
        assert_eq!(&*previous, b"one");
        assert!(fs.insert("..", &b"ignored"[..]).is_none());
        assert_eq!(fs.paths().collect::<alloc::vec::Vec<_>>(), ["a.obj"]);

        assert!(fs.remove("a.obj").is_some());
        assert!(!fs.exists("a.obj"));
        assert!(fs.remove("a.obj").is_none());
    }

    #[test]
    fn test_from_buffer() {
        let (fs, name) = MemoryIoSystem::from_buffer(MESH, ".stl");
        assert_eq!(name, "$$$___magic___$$$.stl");
        assert_eq!(path::extension(&name), Some("stl"));
        assert_eq!(fs.open(&name).unwrap().read_all().unwrap(), MESH);

        let (_, bare) = MemoryIoSystem::from_buffer(MESH, "");
        assert_eq!(bare, MAGIC_FILE_NAME);
    }

    #[test]
    fn test_from_buffer_odd_hints() {
        for (hint, expected) in [
            ("x\\stl", "$$$___magic___$$$.x/stl"),
            ("stl/", "$$$___magic___$$$.stl"),
            ("x/../../..", MAGIC_FILE_NAME),
            ("st\0l", MAGIC_FILE_NAME),
        ] {
            let (fs, name) = MemoryIoSystem::from_buffer(MESH, hint);
            assert_eq!(name, expected, "{hint:?}");
            assert_eq!(fs.paths().collect::<alloc::vec::Vec<_>>(), [name.as_str()]);
            assert!(fs.exists(&name), "{hint:?}");
            assert_eq!(fs.open(&name).unwrap().read_all().unwrap(), MESH);
        }
    }
}
