use alloc::{boxed::Box, vec::Vec};
use embedded_io::{ErrorKind, ErrorType, Read, Seek, Write};

/// A handle to an opened resource.
///
/// All streams share `ErrorKind` as their error type so that they can be
/// boxed behind `dyn Stream`. Read-only streams fail writes with
/// `ErrorKind::Unsupported`.
pub trait Stream: ErrorType<Error = ErrorKind> + Read + Seek + Write {
    /// Total size of the resource in bytes.
    fn size(&self) -> usize;

    fn tell(&mut self) -> Result<u64, ErrorKind> {
        self.stream_position()
    }

    /// Reads everything from the current position to the end.
    fn read_all(&mut self) -> Result<Vec<u8>, ErrorKind> {
        let pos = self.stream_position()? as usize;
        let mut out = alloc::vec![0u8; self.size().saturating_sub(pos)];
        let mut filled = 0;
        while filled < out.len() {
            let read = self.read(&mut out[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        out.truncate(filled);
        Ok(out)
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn size(&self) -> usize {
        (**self).size()
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    fn size(&self) -> usize {
        (**self).size()
    }
}

/// Resolves a seek request against the current position and the size.
pub(crate) fn seek_target(pos: embedded_io::SeekFrom, current: usize, size: usize) -> Result<usize, ErrorKind> {
    let target = match pos {
        embedded_io::SeekFrom::Start(n) => i128::from(n),
        embedded_io::SeekFrom::End(n) => size as i128 + i128::from(n),
        embedded_io::SeekFrom::Current(n) => current as i128 + i128::from(n),
    };
    usize::try_from(target).map_err(|_| ErrorKind::InvalidInput)
}
