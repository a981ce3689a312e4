use alloc::{boxed::Box, vec::Vec};
use core::any::Any;
use embedded_io::{ErrorKind, ErrorType, Read, Seek, SeekFrom, Write};
use log::{debug, info, warn};

use crate::fs::{Error, IoSystem, Mode, Result};
use crate::io::Stream;

/// A stream that can be handed back to the provider that created it.
pub trait AnyStream: Stream + Any {
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<S: Stream + Any> AnyStream for S {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

pub type BoxedStream = Box<dyn AnyStream>;
pub type BoxedIoSystem = Box<dyn IoSystem<Stream = BoxedStream>>;

/// Adapter hiding a provider's stream type behind [`BoxedStream`].
///
/// Closing recovers the concrete stream so the provider's own `close` runs.
pub struct Erased<S>(pub S);

impl<S> IoSystem for Erased<S>
where
    S: IoSystem,
    S::Stream: 'static,
{
    type Stream = BoxedStream;

    fn exists(&self, path: &str) -> bool {
        self.0.exists(path)
    }

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<BoxedStream> {
        let stream = self.0.open_with_mode(path, mode)?;
        Ok(Box::new(stream))
    }

    fn close(&self, stream: BoxedStream) {
        match AnyStream::into_any(stream).downcast::<S::Stream>() {
            Ok(stream) => self.0.close(*stream),
            Err(_) => warn!("Dropping stream not opened by this provider"),
        }
    }

    fn os_separator(&self) -> char {
        self.0.os_separator()
    }

    fn compare_paths(&self, a: &str, b: &str) -> bool {
        self.0.compare_paths(a, b)
    }
}

/// Stream opened through a [`LayeredIoSystem`], tagged with its layer.
pub struct LayeredStream {
    layer: usize,
    inner: BoxedStream,
}

impl LayeredStream {
    pub fn into_inner(self) -> BoxedStream {
        self.inner
    }
}

impl ErrorType for LayeredStream {
    type Error = ErrorKind;
}

impl Read for LayeredStream {
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, ErrorKind> {
        self.inner.read(buf)
    }
}

impl Seek for LayeredStream {
    fn seek(&mut self, pos: SeekFrom) -> core::result::Result<u64, ErrorKind> {
        self.inner.seek(pos)
    }
}

impl Write for LayeredStream {
    fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, ErrorKind> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> core::result::Result<(), ErrorKind> {
        self.inner.flush()
    }
}

impl Stream for LayeredStream {
    fn size(&self) -> usize {
        self.inner.size()
    }
}

struct Layer {
    // stable across later mounts, unlike the position
    id: usize,
    priority: u32,
    system: BoxedIoSystem,
}

/// Searches several providers in priority order.
///
/// Higher priorities are searched first; providers mounted with the same
/// priority are searched in mount order. A layer answering `NotFound` passes
/// the request on to the next one, any other error ends the search.
///
/// Streams remember their layer and are closed by it.
#[derive(Default)]
pub struct LayeredIoSystem {
    layers: Vec<Layer>,
    next_id: usize,
}

impl LayeredIoSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount<S>(&mut self, system: S, priority: u32)
    where
        S: IoSystem + 'static,
        S::Stream: 'static,
    {
        let idx = self
            .layers
            .iter()
            .position(|layer| layer.priority < priority)
            .unwrap_or(self.layers.len());
        info!("Mounting layer {idx} with priority {priority}");
        self.layers.insert(
            idx,
            Layer {
                id: self.next_id,
                priority,
                system: Box::new(Erased(system)),
            },
        );
        self.next_id += 1;
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl IoSystem for LayeredIoSystem {
    type Stream = LayeredStream;

    fn exists(&self, path: &str) -> bool {
        self.layers.iter().any(|layer| layer.system.exists(path))
    }

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<LayeredStream> {
        let mut read_only = false;
        for (idx, layer) in self.layers.iter().enumerate() {
            match layer.system.open_with_mode(path, mode) {
                Ok(inner) => {
                    debug!("Opened {path} from layer {idx}");
                    return Ok(LayeredStream {
                        layer: layer.id,
                        inner,
                    });
                }
                Err(Error::NotFound) => {}
                Err(Error::ReadOnly) if mode.is_write() => read_only = true,
                Err(e) => return Err(e),
            }
        }
        if read_only {
            Err(Error::ReadOnly)
        } else {
            Err(Error::NotFound)
        }
    }

    fn close(&self, stream: LayeredStream) {
        match self.layers.iter().find(|layer| layer.id == stream.layer) {
            Some(layer) => layer.system.close(stream.inner),
            None => warn!("Dropping stream of unknown layer {}", stream.layer),
        }
    }

    fn os_separator(&self) -> char {
        self.layers
            .first()
            .map_or(crate::path::SEPARATOR, |layer| layer.system.os_separator())
    }
}
