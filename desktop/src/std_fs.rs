use std::fs;
use std::io::{Read as _, Seek as _, Write as _};
use std::path::{Component, Path, PathBuf};

use asset_io_core::fs::{Error, IoSystem, Mode, Result};
use asset_io_core::io::Stream;
use asset_io_core::path;
use embedded_io::{ErrorKind, ErrorType, SeekFrom};
use log::{debug, info};

fn kind(err: std::io::Error) -> ErrorKind {
    embedded_io::Error::kind(&err)
}

/// Provider over the host filesystem, rooted at a base directory.
pub struct StdIoSystem {
    base_path: PathBuf,
}

impl StdIoSystem {
    pub fn new_with_base_path(base_path: PathBuf) -> Self {
        info!("Using StdIoSystem with base path: {:?}", base_path);
        StdIoSystem { base_path }
    }

    /// Maps `path` below the base path. Paths that would replace the base,
    /// such as `C:/x` on Windows, resolve to nothing.
    ///
    /// Symbolic links inside the base directory are followed and may point
    /// anywhere.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = path::normalize(path)?;
        if !Path::new(&relative)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            debug!("Refusing to resolve {path:?} outside the base path");
            return None;
        }
        Some(self.base_path.join(relative))
    }
}

impl IoSystem for StdIoSystem {
    type Stream = StdStream;

    fn exists(&self, path: &str) -> bool {
        let Some(path) = self.resolve(path) else {
            return false;
        };
        path.is_file() && fs::File::open(&path).is_ok()
    }

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<StdStream> {
        let path = self.resolve(path).ok_or(Error::NotFound)?;
        if path.is_dir() {
            return Err(Error::NotFound);
        }
        let options = match mode {
            Mode::Read => fs::OpenOptions::new().read(true).clone(),
            Mode::Write => fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .clone(),
            Mode::ReadWrite => fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .clone(),
        };
        let file = options.open(&path).map_err(|e| {
            debug!("Failed to open {:?}: {e}", path);
            Error::from(kind(e))
        })?;
        StdStream::new(file).map_err(|e| Error::from(kind(e)))
    }

    fn os_separator(&self) -> char {
        std::path::MAIN_SEPARATOR
    }

    fn compare_paths(&self, a: &str, b: &str) -> bool {
        match (path::normalize(a), path::normalize(b)) {
            (Some(a), Some(b)) if cfg!(windows) => a.eq_ignore_ascii_case(&b),
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

pub struct StdStream {
    file: std::io::BufReader<fs::File>,
    size: usize,
}

impl StdStream {
    pub fn new(mut file: fs::File) -> std::io::Result<Self> {
        let size = file.seek(std::io::SeekFrom::End(0))? as usize;
        file.seek(std::io::SeekFrom::Start(0))?;
        Ok(StdStream {
            file: std::io::BufReader::new(file),
            size,
        })
    }
}

impl Stream for StdStream {
    fn size(&self) -> usize {
        self.size
    }
}

impl ErrorType for StdStream {
    type Error = ErrorKind;
}

impl embedded_io::Seek for StdStream {
    fn seek(&mut self, pos: SeekFrom) -> core::result::Result<u64, ErrorKind> {
        self.file.seek(pos.into()).map_err(kind)
    }
}

impl embedded_io::Read for StdStream {
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, ErrorKind> {
        self.file.read(buf).map_err(kind)
    }
}

impl embedded_io::Write for StdStream {
    fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, ErrorKind> {
        // drop read-ahead so the file cursor matches the logical position
        self.file.seek(std::io::SeekFrom::Current(0)).map_err(kind)?;
        let file = self.file.get_mut();
        let written = file.write(buf).map_err(kind)?;
        let end = file.stream_position().map_err(kind)? as usize;
        self.size = self.size.max(end);
        Ok(written)
    }

    fn flush(&mut self) -> core::result::Result<(), ErrorKind> {
        self.file.get_mut().flush().map_err(kind)
    }
}
