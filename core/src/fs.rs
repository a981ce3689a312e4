use embedded_io::ErrorKind;
use embedded_io::Write as _;
use log::warn;

use crate::io::Stream;
use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    NotFound,
    PermissionDenied,
    /// The provider cannot open resources for writing.
    ReadOnly,
    Io(ErrorKind),
}

impl Error {
    /// True when the resource could not be located or accessed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound | Error::PermissionDenied)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotFound => write!(f, "resource not found"),
            Error::PermissionDenied => write!(f, "permission denied"),
            Error::ReadOnly => write!(f, "resource is read-only"),
            Error::Io(kind) => write!(f, "I/O failure: {kind:?}"),
        }
    }
}

impl embedded_io::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound => ErrorKind::NotFound,
            Error::PermissionDenied | Error::ReadOnly => ErrorKind::PermissionDenied,
            Error::Io(kind) => *kind,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => Error::NotFound,
            ErrorKind::PermissionDenied => Error::PermissionDenied,
            other => Error::Io(other),
        }
    }
}

impl From<embedded_zip::ZipError> for Error {
    fn from(err: embedded_zip::ZipError) -> Self {
        Error::from(embedded_io::Error::kind(&err))
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Access mode, parsed from C-style `fopen` mode strings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum_macros::EnumString)]
pub enum Mode {
    #[default]
    #[strum(serialize = "rb", serialize = "r", serialize = "rt")]
    Read,
    #[strum(serialize = "wb", serialize = "w", serialize = "wt")]
    Write,
    #[strum(
        serialize = "r+",
        serialize = "rb+",
        serialize = "r+b",
        serialize = "w+",
        serialize = "wb+",
        serialize = "w+b"
    )]
    ReadWrite,
}

impl Mode {
    pub fn is_write(self) -> bool {
        !matches!(self, Mode::Read)
    }
}

/// File access for importers.
///
/// Loaders only ever see this trait, so the same code reads from disk, from
/// an archive or from a buffer handed over by the caller.
///
/// `exists` and `open` are independent queries: nothing keeps the answer of
/// the first valid for the second if the backing store changes in between.
pub trait IoSystem {
    type Stream: Stream;

    /// Whether `path` names a resource that can currently be opened for
    /// reading. Never fails; anything unreachable is simply `false`.
    fn exists(&self, path: &str) -> bool;

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<Self::Stream>;

    /// Opens `path` for reading.
    fn open(&self, path: &str) -> Result<Self::Stream> {
        self.open_with_mode(path, Mode::Read)
    }

    /// Releases a stream obtained from this system.
    fn close(&self, mut stream: Self::Stream) {
        if let Err(e) = stream.flush() {
            warn!("Failed to flush stream on close: {e:?}");
        }
    }

    fn os_separator(&self) -> char {
        path::SEPARATOR
    }

    /// Whether two paths name the same resource.
    fn compare_paths(&self, a: &str, b: &str) -> bool {
        match (path::normalize(a), path::normalize(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: IoSystem + ?Sized> IoSystem for &T {
    type Stream = T::Stream;

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<Self::Stream> {
        (**self).open_with_mode(path, mode)
    }

    fn close(&self, stream: Self::Stream) {
        (**self).close(stream)
    }

    fn os_separator(&self) -> char {
        (**self).os_separator()
    }

    fn compare_paths(&self, a: &str, b: &str) -> bool {
        (**self).compare_paths(a, b)
    }
}

impl<T: IoSystem + ?Sized> IoSystem for alloc::boxed::Box<T> {
    type Stream = T::Stream;

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<Self::Stream> {
        (**self).open_with_mode(path, mode)
    }

    fn close(&self, stream: Self::Stream) {
        (**self).close(stream)
    }

    fn os_separator(&self) -> char {
        (**self).os_separator()
    }

    fn compare_paths(&self, a: &str, b: &str) -> bool {
        (**self).compare_paths(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn test_mode_strings() {
        assert_eq!(Mode::from_str("rb"), Ok(Mode::Read));
        assert_eq!(Mode::from_str("r"), Ok(Mode::Read));
        assert_eq!(Mode::from_str("wb"), Ok(Mode::Write));
        assert_eq!(Mode::from_str("r+b"), Ok(Mode::ReadWrite));
        assert_eq!(Mode::from_str("wb+"), Ok(Mode::ReadWrite));
        assert!(Mode::from_str("x").is_err());
        assert_eq!(Mode::default(), Mode::Read);
        assert!(!Mode::Read.is_write());
        assert!(Mode::ReadWrite.is_write());
    }

    use alloc::rc::Rc;
    use core::cell::Cell;

    struct Flushing {
        flushes: Rc<Cell<usize>>,
        fail: bool,
    }

    impl embedded_io::ErrorType for Flushing {
        type Error = ErrorKind;
    }

    impl embedded_io::Read for Flushing {
        fn read(&mut self, _buf: &mut [u8]) -> core::result::Result<usize, ErrorKind> {
            Ok(0)
        }
    }

    impl embedded_io::Seek for Flushing {
        fn seek(&mut self, _pos: embedded_io::SeekFrom) -> core::result::Result<u64, ErrorKind> {
            Ok(0)
        }
    }

    impl embedded_io::Write for Flushing {
        fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, ErrorKind> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> core::result::Result<(), ErrorKind> {
            self.flushes.set(self.flushes.get() + 1);
            if self.fail { Err(ErrorKind::Other) } else { Ok(()) }
        }
    }

    impl Stream for Flushing {
        fn size(&self) -> usize {
            0
        }
    }

    struct Flushes {
        count: Rc<Cell<usize>>,
        fail: bool,
    }

    impl IoSystem for Flushes {
        type Stream = Flushing;

        fn exists(&self, path: &str) -> bool {
            path == "tri.obj"
        }

        fn open_with_mode(&self, path: &str, _mode: Mode) -> Result<Flushing> {
            if !self.exists(path) {
                return Err(Error::NotFound);
            }
            Ok(Flushing {
                flushes: self.count.clone(),
                fail: self.fail,
            })
        }
    }

    #[test]
    fn test_default_close_flushes() {
        for fail in [false, true] {
            let fs = Flushes {
                count: Rc::new(Cell::new(0)),
                fail,
            };
            let stream = fs.open("tri.obj").unwrap();
            assert_eq!(fs.count.get(), 0);
            // a failing flush is logged, not reported
            fs.close(stream);
            assert_eq!(fs.count.get(), 1);

            let boxed = alloc::boxed::Box::new(&fs);
            boxed.close(boxed.open("tri.obj").unwrap());
            assert_eq!(fs.count.get(), 2);
        }
    }

    #[test]
    fn test_error_kinds() {
        use embedded_io::Error as _;

        assert_eq!(Error::from(ErrorKind::NotFound), Error::NotFound);
        assert_eq!(Error::from(ErrorKind::Interrupted), Error::Io(ErrorKind::Interrupted));
        assert_eq!(Error::ReadOnly.kind(), ErrorKind::PermissionDenied);
        assert!(Error::PermissionDenied.is_not_found());
        assert!(!Error::Io(ErrorKind::Other).is_not_found());
        assert_eq!(
            Error::from(embedded_zip::ZipError::InvalidSignature),
            Error::Io(ErrorKind::InvalidData)
        );
    }
}
