use alloc::{boxed::Box, string::String, vec, vec::Vec};
use crc::{CRC_32_ISO_HDLC, Crc, Digest};
use embedded_io::{Read, Seek, SeekFrom};
use miniz_oxide::{
    DataFormat, MZError, MZFlush, MZStatus,
    inflate,
};
use zerocopy::FromBytes;
use zerocopy::little_endian::{U16, U32};

use crate::ZipError;

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Compression method of an archive member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Stored,
    Deflate,
    Other(u16),
}

impl From<u16> for Compression {
    fn from(method: u16) -> Self {
        match method {
            COMPRESSION_STORED => Compression::Stored,
            COMPRESSION_DEFLATE => Compression::Deflate,
            other => Compression::Other(other),
        }
    }
}

impl core::fmt::Display for Compression {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Compression::Stored => write!(f, "stored"),
            Compression::Deflate => write!(f, "deflate"),
            Compression::Other(method) => write!(f, "method {method}"),
        }
    }
}

/// A member as described by the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileEntry {
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u32,
    pub compressed_size: u32,
    pub compression: Compression,
    pub crc32: u32,
    pub encrypted: bool,
    pub(crate) offset: u32,
}

impl ZipFileEntry {
    /// Directory members are stored with a trailing slash and carry no data.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

#[repr(C)]
#[derive(zerocopy::FromBytes)]
struct LocalFileHeader {
    signature: [u8; 4],
    version_needed: U16,
    flags: U16,
    compression: U16,
    mod_time: U16,
    mod_date: U16,
    crc32: U32,
    compressed_size: U32,
    uncompressed_size: U32,
    filename_len: U16,
    extra_len: U16,
}
const LOCAL_FILE_HEADER_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const COMPRESSION_STORED: u16 = 0;
const COMPRESSION_DEFLATE: u16 = 8;
// Upper bound for the up-front allocation of `read_to_end`.
const MAX_PREALLOC: usize = 64 * 1024;

/// A streaming reader for a single zip entry.
/// Supports both stored (uncompressed) and deflate-compressed entries.
///
/// Sizes are taken from the central directory, so entries written with a
/// trailing data descriptor read correctly. The CRC-32 is checked once the
/// last byte has been produced.
pub struct ZipEntryReader<'a, R> {
    reader: &'a mut R,
    compression: Compression,
    compressed_remaining: usize,
    uncompressed_size: usize,
    uncompressed_remaining: usize,
    expected_crc: u32,
    digest: Option<Digest<'static, u32>>,
    // Inflate state for deflate decompression
    inflater: Option<Box<inflate::stream::InflateState>>,
    // Input buffer for compressed data
    in_buf: [u8; 512],
    in_buf_start: usize,
    in_buf_end: usize,
    finished: bool,
}

impl<'a, R: Read + Seek> ZipEntryReader<'a, R> {
    /// Create a new streaming reader for a zip entry.
    /// This seeks to the entry's data and prepares for reading.
    pub fn new(reader: &'a mut R, entry: &ZipFileEntry) -> Result<Self, ZipError> {
        if entry.encrypted {
            return Err(ZipError::Encrypted);
        }
        let inflater = match entry.compression {
            Compression::Stored => None,
            Compression::Deflate => Some(Box::new(inflate::stream::InflateState::new(
                DataFormat::Raw,
            ))),
            Compression::Other(method) => return Err(ZipError::UnsupportedCompression(method)),
        };

        reader
            .seek(SeekFrom::Start(entry.offset as u64))
            .map_err(ZipError::from_io_error)?;

        let mut lfh_bytes = [0u8; core::mem::size_of::<LocalFileHeader>()];
        reader
            .read_exact(&mut lfh_bytes)
            .map_err(ZipError::from_read_exact_error)?;
        let lfh = LocalFileHeader::read_from_bytes(&lfh_bytes).map_err(|_| ZipError::InvalidData)?;

        if lfh.signature != LOCAL_FILE_HEADER_MAGIC {
            return Err(ZipError::InvalidSignature);
        }

        // Skip filename and extra field
        let offset = lfh.filename_len.get() as i64 + lfh.extra_len.get() as i64;
        reader
            .seek(SeekFrom::Current(offset))
            .map_err(ZipError::from_io_error)?;

        Ok(Self {
            reader,
            compression: entry.compression,
            compressed_remaining: entry.compressed_size as usize,
            uncompressed_size: entry.size as usize,
            uncompressed_remaining: entry.size as usize,
            expected_crc: entry.crc32,
            digest: Some(CRC32.digest()),
            inflater,
            in_buf: [0u8; 512],
            in_buf_start: 0,
            in_buf_end: 0,
            finished: false,
        })
    }
}

impl<'a, R: Read> ZipEntryReader<'a, R> {
    /// Returns the total uncompressed size of the entry
    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    /// Returns true once the whole entry has been produced and verified
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read decompressed data into the provided buffer.
    /// Returns the number of bytes written to the buffer.
    pub fn read(&mut self, out_buf: &mut [u8]) -> Result<usize, ZipError> {
        if self.finished || out_buf.is_empty() {
            return Ok(0);
        }

        let read = match self.compression {
            Compression::Deflate => self.read_deflate(out_buf)?,
            _ => self.read_stored(out_buf)?,
        };
        if let Some(digest) = self.digest.as_mut() {
            digest.update(&out_buf[..read]);
        }
        if self.finished {
            self.verify()?;
        }
        Ok(read)
    }

    fn verify(&mut self) -> Result<(), ZipError> {
        if self.uncompressed_remaining != 0 {
            return Err(ZipError::InvalidData);
        }
        let Some(digest) = self.digest.take() else {
            return Ok(());
        };
        let actual = digest.finalize();
        if actual != self.expected_crc {
            return Err(ZipError::ChecksumMismatch {
                expected: self.expected_crc,
                actual,
            });
        }
        Ok(())
    }

    /// Read from a stored (uncompressed) entry
    fn read_stored(&mut self, out_buf: &mut [u8]) -> Result<usize, ZipError> {
        let to_read = core::cmp::min(out_buf.len(), self.compressed_remaining);
        if to_read == 0 {
            self.finished = true;
            return Ok(0);
        }

        let read = self
            .reader
            .read(&mut out_buf[..to_read])
            .map_err(ZipError::from_io_error)?;
        if read == 0 {
            // archive truncated
            return Err(ZipError::InvalidData);
        }

        self.compressed_remaining -= read;
        self.uncompressed_remaining = self.uncompressed_remaining.saturating_sub(read);

        if self.compressed_remaining == 0 {
            self.finished = true;
        }

        Ok(read)
    }

    /// Read from a deflate-compressed entry
    fn read_deflate(&mut self, out_buf: &mut [u8]) -> Result<usize, ZipError> {
        let Some(inflater) = self.inflater.as_mut() else {
            return Err(ZipError::DecompressionError);
        };
        let mut total_out = 0;

        while total_out < out_buf.len() {
            // Refill input buffer if needed
            if self.in_buf_start >= self.in_buf_end && self.compressed_remaining > 0 {
                let to_read = core::cmp::min(self.in_buf.len(), self.compressed_remaining);
                let read = self
                    .reader
                    .read(&mut self.in_buf[..to_read])
                    .map_err(ZipError::from_io_error)?;
                if read == 0 {
                    return Err(ZipError::InvalidData);
                }
                self.in_buf_start = 0;
                self.in_buf_end = read;
                self.compressed_remaining -= read;
            }

            let in_slice = &self.in_buf[self.in_buf_start..self.in_buf_end];
            let out_slice = &mut out_buf[total_out..];
            let result = inflate::stream::inflate(inflater, in_slice, out_slice, MZFlush::None);

            self.in_buf_start += result.bytes_consumed;
            total_out += result.bytes_written;
            trace!(
                "Inflate result: {:?}, bytes consumed: {}, bytes written: {}",
                result.status,
                result.bytes_consumed,
                result.bytes_written
            );

            match result.status {
                // `Done` can be reported while the window still holds output,
                // the stream only ends once that has been handed out too.
                Ok(MZStatus::StreamEnd) => {
                    self.finished = true;
                    break;
                }
                Ok(MZStatus::Ok) => {}
                // no input left but the decoder wants more
                Err(MZError::Buf) => return Err(ZipError::InvalidData),
                _ => return Err(ZipError::DecompressionError),
            }
        }

        if total_out > self.uncompressed_remaining {
            return Err(ZipError::InvalidData);
        }
        self.uncompressed_remaining -= total_out;
        Ok(total_out)
    }

    /// Read the entire entry into a Vec.
    ///
    /// The buffer grows with the data instead of trusting the size in the
    /// central directory.
    pub fn read_to_end(mut self) -> Result<Vec<u8>, ZipError> {
        let mut result = vec![0u8; core::cmp::min(self.uncompressed_size, MAX_PREALLOC)];
        let mut filled = 0;

        // `read` only returns 0 once the entry is finished and verified
        loop {
            if filled == result.len() {
                let grow = filled.clamp(512, MAX_PREALLOC);
                result.resize(filled + grow, 0);
            }
            let read = self.read(&mut result[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }

        result.truncate(filled);
        Ok(result)
    }

    pub fn skip(&mut self, n: u64) -> Result<u64, ZipError> {
        let mut buf = [0u8; 512];
        let mut remaining = n;

        while remaining > 0 {
            let to_read = core::cmp::min(buf.len() as u64, remaining) as usize;
            let read = self.read(&mut buf[..to_read])?;
            if read == 0 {
                break;
            }
            remaining -= read as u64;
        }

        Ok(n - remaining)
    }
}

/// Convenience function to read an entire zip entry into a Vec
pub fn read_entry<Reader: Read + Seek>(
    reader: &mut Reader,
    entry: &ZipFileEntry,
) -> Result<Vec<u8>, ZipError> {
    let entry_reader = ZipEntryReader::new(reader, entry)?;
    entry_reader.read_to_end()
}

impl<Reader> embedded_io::ErrorType for ZipEntryReader<'_, Reader> {
    type Error = ZipError;
}

impl<Reader: Read> embedded_io::Read for ZipEntryReader<'_, Reader> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read(buf)
    }
}

impl<Reader: Read> embedded_io::Seek for ZipEntryReader<'_, Reader> {
    fn seek(&mut self, pos: embedded_io::SeekFrom) -> Result<u64, Self::Error> {
        match pos {
            SeekFrom::Current(n) if n >= 0 => {
                self.skip(n as u64)?;
                Ok((self.uncompressed_size - self.uncompressed_remaining) as u64)
            }
            _ => Err(ZipError::IoError(embedded_io::ErrorKind::Unsupported)),
        }
    }
}
