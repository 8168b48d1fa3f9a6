//! Transport layer abstraction.
//!
//! This module provides the `Transport` trait that lets sessions run over
//! any half-duplex byte channel (serial device, socket, in-memory link).
//!
//! # Implementations
//!
//! - `NullTransport`: silent line that discards all writes
//! - `StreamTransport`: wraps `std::io` Read/Write halves (requires `std` feature)
//! - `ChannelTransport`: in-memory cross-thread link (requires `std` feature)
//! - `ScriptedTransport`: byte-scripted double on simulated time (requires `std` feature)

use core::time::Duration;

use crate::error::TransportResult;

#[cfg(feature = "std")]
mod channel;
#[cfg(feature = "std")]
pub mod scripted;
#[cfg(feature = "std")]
mod stream;
#[cfg(feature = "std")]
mod target;

#[cfg(feature = "std")]
pub use channel::ChannelTransport;
#[cfg(feature = "std")]
pub use scripted::{ScriptedTransport, SimClock};
#[cfg(feature = "std")]
pub use stream::StreamTransport;
#[cfg(feature = "std")]
pub use target::{PortTarget, TargetParseError};

/// Blocking, half-duplex byte channel used by sessions.
///
/// Implement this trait to run the protocol over a custom port.
pub trait Transport {
    /// Waits up to `timeout` for one byte.
    ///
    /// Returns `Ok(None)` if nothing arrived in time. Errors are fatal to
    /// the calling session.
    fn read_byte(&mut self, timeout: Duration) -> TransportResult<Option<u8>>;

    /// Writes all of `bytes` and flushes them to the line.
    fn write_bytes(&mut self, bytes: &[u8]) -> TransportResult<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_byte(&mut self, timeout: Duration) -> TransportResult<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> TransportResult<()> {
        (**self).write_bytes(bytes)
    }
}

/// A null transport: nothing is ever received and all writes are discarded.
///
/// Reads return immediately, so it is only useful for broadcast-only
/// masters and for measuring overhead.
#[derive(Debug, Default)]
pub struct NullTransport {
    bytes_written: usize,
}

impl NullTransport {
    /// Creates a new null transport.
    pub const fn new() -> Self {
        Self { bytes_written: 0 }
    }

    /// Returns the total number of bytes written.
    pub const fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

impl Transport for NullTransport {
    fn read_byte(&mut self, _timeout: Duration) -> TransportResult<Option<u8>> {
        Ok(None)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> TransportResult<()> {
        self.bytes_written += bytes.len();
        Ok(())
    }
}
