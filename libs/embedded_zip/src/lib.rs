/*!
A no_std ZIP reader using embedded-io for memory constrainted environment.

## Features
- no_std (alloc required)
- stored and deflate members
- streaming decompression with CRC-32 verification

## Usage
```
# use embedded_zip as zip;
fn dump<R>(archive: &mut R) -> Result<(), zip::ZipError>
where
    R: embedded_io::Read + embedded_io::Seek,
{
    let entries = zip::parse_zip(archive)?;
    for entry in entries.iter().filter(|e| !e.is_dir()) {
        let data = zip::read_entry(archive, entry)?;
        println!("{}: {} bytes", entry.name, data.len());
    }
    Ok(())
}
```

## Limitations & non-goals
- no ZIP64
- no encryption
- no multi-disk archives
- no writing
*/

#![no_std]

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!($($arg)*);
    };
}

mod entry;
mod error;
mod parser;


pub use entry::{Compression, ZipEntryReader, ZipFileEntry, read_entry};
pub use error::ZipError;
pub use parser::parse_zip;
extern crate alloc;
