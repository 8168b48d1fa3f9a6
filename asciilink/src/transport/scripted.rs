//! Byte-scripted transport on simulated time.
//!
//! `ScriptedTransport` delivers queued bytes at scheduled instants of a
//! shared [`SimClock`]. A read that finds nothing due within its timeout
//! advances the clock by the whole timeout, so timeout and retry behavior
//! can be checked exactly without sleeping.
//!
//! # Example
//!
//! ```rust
//! use core::time::Duration;
//! use asciilink::time::Clock;
//! use asciilink::transport::{ScriptedTransport, SimClock, Transport};
//!
//! let clock = SimClock::new();
//! let mut transport = ScriptedTransport::new(clock.clone());
//! transport.queue_after(Duration::from_millis(20), b"A");
//!
//! assert_eq!(transport.read_byte(Duration::from_millis(10)).unwrap(), None);
//! assert_eq!(clock.now(), Duration::from_millis(10));
//! assert_eq!(transport.read_byte(Duration::from_millis(50)).unwrap(), Some(b'A'));
//! assert_eq!(clock.now(), Duration::from_millis(20));
//! ```

use core::cell::Cell;
use core::time::Duration;
use std::boxed::Box;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use super::Transport;
use crate::error::{TransportError, TransportResult};
use crate::time::Clock;

/// A manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<Duration>>,
}

impl SimClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Moves time forward to `to`; never moves it back.
    pub fn advance_to(&self, to: Duration) {
        if to > self.now.get() {
            self.now.set(to);
        }
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Produces the reply bytes (if any) for each write.
type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>>>;

/// In-memory transport that replays scheduled inbound bytes.
pub struct ScriptedTransport {
    clock: SimClock,

    /// Pending inbound bytes with their arrival times, in order.
    inbound: VecDeque<(Duration, u8)>,

    /// Every write, with the time it happened.
    writes: Vec<(Duration, Vec<u8>)>,

    /// Optional peer model answering writes.
    responder: Option<Responder>,

    /// Delay between a write and the first byte of its reply.
    reply_delay: Duration,

    /// Spacing between consecutive queued bytes.
    char_interval: Duration,

    fail_reads: bool,
    fail_writes: bool,
}

impl ScriptedTransport {
    /// Creates a transport with nothing queued, driven by `clock`.
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            inbound: VecDeque::new(),
            writes: Vec::new(),
            responder: None,
            reply_delay: Duration::from_millis(5),
            char_interval: Duration::from_millis(1),
            fail_reads: false,
            fail_writes: false,
        }
    }

    /// Sets the spacing between queued bytes.
    pub fn with_char_interval(mut self, interval: Duration) -> Self {
        self.char_interval = interval;
        self
    }

    /// Sets the delay before a responder's reply starts arriving.
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Installs a peer model called with every written chunk.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queues `bytes` to start arriving `delay` after the later of now and
    /// the last queued byte.
    pub fn queue_after(&mut self, delay: Duration, bytes: &[u8]) {
        let tail = self.inbound.back().map_or(Duration::ZERO, |&(at, _)| at);
        let mut at = self.clock.now().max(tail) + delay;
        for &byte in bytes {
            self.inbound.push_back((at, byte));
            at += self.char_interval;
        }
    }

    /// Queues `bytes` to arrive immediately after anything already queued.
    pub fn queue(&mut self, bytes: &[u8]) {
        self.queue_after(Duration::ZERO, bytes);
    }

    /// Makes every following read fail.
    pub fn fail_reads(&mut self) {
        self.fail_reads = true;
    }

    /// Makes every following write fail.
    pub fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    /// All chunks written so far.
    pub fn written(&self) -> impl Iterator<Item = &[u8]> {
        self.writes.iter().map(|(_, bytes)| bytes.as_slice())
    }

    /// Simulated times at which each chunk was written.
    pub fn write_times(&self) -> impl Iterator<Item = Duration> + '_ {
        self.writes.iter().map(|&(at, _)| at)
    }

    /// Number of write calls.
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Number of queued bytes not yet read.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

impl Transport for ScriptedTransport {
    fn read_byte(&mut self, timeout: Duration) -> TransportResult<Option<u8>> {
        if self.fail_reads {
            return Err(TransportError::IoFailed);
        }

        let now = self.clock.now();
        match self.inbound.front() {
            Some(&(at, byte)) if at <= now + timeout => {
                self.inbound.pop_front();
                self.clock.advance_to(at);
                Ok(Some(byte))
            }
            _ => {
                self.clock.advance(timeout);
                Ok(None)
            }
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> TransportResult<()> {
        if self.fail_writes {
            return Err(TransportError::IoFailed);
        }

        self.writes.push((self.clock.now(), bytes.to_vec()));
        let reply = self.responder.as_mut().and_then(|respond| respond(bytes));
        if let Some(reply) = reply {
            self.queue_after(self.reply_delay, &reply);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_read_advances_clock() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone());

        assert_eq!(transport.read_byte(Duration::from_millis(300)), Ok(None));
        assert_eq!(clock.now(), Duration::from_millis(300));
    }

    #[test]
    fn test_queued_bytes_are_spaced() {
        let clock = SimClock::new();
        let mut transport =
            ScriptedTransport::new(clock.clone()).with_char_interval(Duration::from_millis(2));
        transport.queue(b"abc");

        let timeout = Duration::from_millis(10);
        assert_eq!(transport.read_byte(timeout), Ok(Some(b'a')));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(transport.read_byte(timeout), Ok(Some(b'b')));
        assert_eq!(transport.read_byte(timeout), Ok(Some(b'c')));
        assert_eq!(clock.now(), Duration::from_millis(4));
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn test_responder_schedules_reply() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone())
            .with_reply_delay(Duration::from_millis(7))
            .with_responder(|request| Some(request.to_vec()));

        transport.write_bytes(b"x").unwrap();
        assert_eq!(transport.write_count(), 1);
        assert_eq!(transport.read_byte(Duration::from_millis(5)), Ok(None));
        assert_eq!(transport.read_byte(Duration::from_millis(5)), Ok(Some(b'x')));
        assert_eq!(clock.now(), Duration::from_millis(7));
    }

    #[test]
    fn test_failures() {
        let mut transport = ScriptedTransport::new(SimClock::new());
        transport.fail_writes();
        assert_eq!(transport.write_bytes(b"x"), Err(TransportError::IoFailed));
        transport.fail_reads();
        assert_eq!(transport.read_byte(Duration::ZERO), Err(TransportError::IoFailed));
    }
}
