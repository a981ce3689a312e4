use crate::{Compression, ZipError, ZipFileEntry};
use alloc::{boxed::Box, string::String, vec, vec::Vec};
use embedded_io::{Read, Seek, SeekFrom};
use zerocopy::FromBytes;
use zerocopy::little_endian::{U16, U32};

/// Reads the central directory of the archive behind `reader`.
///
/// Entries are returned in central directory order. The reader position is
/// unspecified afterwards.
pub fn parse_zip<Reader>(reader: &mut Reader) -> Result<Box<[ZipFileEntry]>, ZipError>
where
    Reader: Read + Seek,
{
    let end_dir = find_end_central_directory(reader)?;
    read_central_directory(reader, &end_dir)
}

#[repr(C)]
#[derive(zerocopy::FromBytes)]
struct EndCentralDir {
    signature: [u8; 4],
    disk_number: U16,
    central_dir_start_disk: U16,
    num_entries_this_disk: U16,
    total_num_entries: U16,
    central_dir_size: U32,
    central_dir_offset: U32,
    comment_length: U16,
}

#[repr(C)]
#[derive(zerocopy::FromBytes)]
struct CentralDirEntry {
    signature: [u8; 4],
    version_made: U16,
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
    comment_len: U16,
    disk_start: U16,
    internal_attr: U16,
    external_attr: U32,
    local_header_offset: U32,
}

const END_CENTRAL_DIR_MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const CENTRAL_DIR_ENTRY_MAGIC: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const END_CENTRAL_DIR_SIZE: usize = core::mem::size_of::<EndCentralDir>();
// The record is followed by a comment of at most u16::MAX bytes.
const MAX_END_CENTRAL_DIR_SEARCH: usize = END_CENTRAL_DIR_SIZE + u16::MAX as usize;
const FLAG_ENCRYPTED: u16 = 1 << 0;
// 32-bit fields holding this value live in the ZIP64 extra field instead.
const ZIP64_MARKER: u32 = u32::MAX;

fn find_end_central_directory<Reader>(reader: &mut Reader) -> Result<EndCentralDir, ZipError>
where
    Reader: Read + Seek,
{
    let file_size = reader
        .seek(SeekFrom::End(0))
        .map_err(ZipError::from_io_error)? as usize;
    if file_size < END_CENTRAL_DIR_SIZE {
        return Err(ZipError::InvalidData);
    }

    let window = core::cmp::min(file_size, MAX_END_CENTRAL_DIR_SEARCH);
    let mut buf = vec![0u8; window];
    reader
        .seek(SeekFrom::Start((file_size - window) as u64))
        .map_err(ZipError::from_io_error)?;
    reader
        .read_exact(&mut buf)
        .map_err(ZipError::from_read_exact_error)?;

    // The signature can show up inside the comment, so only accept a record
    // whose comment runs exactly to the end of the file.
    for i in memchr::memmem::rfind_iter(&buf, &END_CENTRAL_DIR_MAGIC) {
        let Some(record) = buf.get(i..i + END_CENTRAL_DIR_SIZE) else {
            continue;
        };
        let dir = EndCentralDir::read_from_bytes(record).map_err(|_| ZipError::InvalidData)?;
        if i + END_CENTRAL_DIR_SIZE + dir.comment_length.get() as usize == buf.len() {
            trace!(
                "Found end of central directory at {} ({} entries)",
                file_size - window + i,
                dir.total_num_entries.get()
            );
            return Ok(dir);
        }
    }

    Err(ZipError::InvalidData)
}

fn read_central_directory<Reader>(
    reader: &mut Reader,
    dir: &EndCentralDir,
) -> Result<Box<[ZipFileEntry]>, ZipError>
where
    Reader: Read + Seek,
{
    if dir.signature != END_CENTRAL_DIR_MAGIC
        || dir.disk_number.get() != dir.central_dir_start_disk.get()
        || dir.num_entries_this_disk.get() != dir.total_num_entries.get()
    {
        // multi-disk archives
        return Err(ZipError::InvalidData);
    }

    if dir.central_dir_offset.get() == ZIP64_MARKER || dir.central_dir_size.get() == ZIP64_MARKER {
        return Err(ZipError::Zip64);
    }

    let entry_count = dir.total_num_entries.get() as usize;
    let mut entries = Vec::with_capacity(entry_count);
    reader
        .seek(SeekFrom::Start(dir.central_dir_offset.get() as u64))
        .map_err(ZipError::from_io_error)?;
    for _ in 0..entry_count {
        let mut cde_buf = [0u8; core::mem::size_of::<CentralDirEntry>()];
        reader
            .read_exact(&mut cde_buf)
            .map_err(ZipError::from_read_exact_error)?;
        let cde = CentralDirEntry::read_from_bytes(&cde_buf).map_err(|_| ZipError::InvalidData)?;
        if cde.signature != CENTRAL_DIR_ENTRY_MAGIC {
            return Err(ZipError::InvalidSignature);
        }

        let mut name_buf = vec![0u8; cde.filename_len.get() as usize];
        reader
            .read_exact(&mut name_buf)
            .map_err(ZipError::from_read_exact_error)?;

        // Skip extra and comment
        let skip = cde.extra_len.get() as i64 + cde.comment_len.get() as i64;
        reader
            .seek(SeekFrom::Current(skip))
            .map_err(ZipError::from_io_error)?;
        let name = String::from_utf8(name_buf).map_err(|_| ZipError::InvalidData)?;
        if [
            cde.compressed_size.get(),
            cde.uncompressed_size.get(),
            cde.local_header_offset.get(),
        ]
        .contains(&ZIP64_MARKER)
        {
            trace!("{} needs ZIP64 extra fields", name);
            return Err(ZipError::Zip64);
        }
        entries.push(ZipFileEntry {
            name,
            size: cde.uncompressed_size.get(),
            compressed_size: cde.compressed_size.get(),
            compression: Compression::from(cde.compression.get()),
            crc32: cde.crc32.get(),
            encrypted: cde.flags.get() & FLAG_ENCRYPTED != 0,
            offset: cde.local_header_offset.get(),
        });
    }

    Ok(entries.into_boxed_slice())
}
