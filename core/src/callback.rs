use core::marker::PhantomData;
use log::trace;

use crate::fs::{Error, IoSystem, Mode, Result};
use crate::io::Stream;

/// Provider built from user callbacks.
///
/// `open` returns `None` when it cannot provide the resource. There is no
/// separate existence callback: `exists` opens the resource and hands the
/// stream straight back to `close`.
pub struct CallbackIoSystem<S, O, C = fn(S)> {
    open: O,
    close: C,
    _stream: PhantomData<fn() -> S>,
}

impl<S, O> CallbackIoSystem<S, O>
where
    S: Stream,
    O: Fn(&str, Mode) -> Option<S>,
{
    /// Streams are dropped on close.
    pub fn new(open: O) -> Self {
        Self::with_close(open, drop::<S>)
    }
}

impl<S, O, C> CallbackIoSystem<S, O, C>
where
    S: Stream,
    O: Fn(&str, Mode) -> Option<S>,
    C: Fn(S),
{
    pub fn with_close(open: O, close: C) -> Self {
        CallbackIoSystem {
            open,
            close,
            _stream: PhantomData,
        }
    }
}

impl<S, O, C> IoSystem for CallbackIoSystem<S, O, C>
where
    S: Stream,
    O: Fn(&str, Mode) -> Option<S>,
    C: Fn(S),
{
    type Stream = S;

    fn exists(&self, path: &str) -> bool {
        match (self.open)(path, Mode::Read) {
            Some(stream) => {
                (self.close)(stream);
                true
            }
            None => {
                trace!("Callback could not open {path}");
                false
            }
        }
    }

    fn open_with_mode(&self, path: &str, mode: Mode) -> Result<S> {
        (self.open)(path, mode).ok_or(Error::NotFound)
    }

    fn close(&self, stream: S) {
        (self.close)(stream)
    }
}
