//! File access layer for asset importers.
//!
//! Importers open their input and every referenced file (materials,
//! textures, external buffers) through an [`IoSystem`](fs::IoSystem). The
//! providers here read from memory, ZIP archives or user callbacks, and can
//! be stacked with [`LayeredIoSystem`](layered::LayeredIoSystem).

#![no_std]

pub mod archive;
pub mod callback;
pub mod fs;
pub mod io;
pub mod layered;
pub mod memory;
pub mod path;

extern crate alloc;
