//! # AsciiLink - An ASCII Master/Slave Line Protocol
//!
//! AsciiLink is a `no_std` compatible implementation of an addressed,
//! half-duplex master/slave protocol for shared serial lines that provides:
//!
//! - **ASCII framing**: `:` start marker, hex body, CR LF terminator
//! - **LRC checksum**: Longitudinal redundancy check over the raw bytes
//! - **Addressing**: Unicast to one slave or broadcast to all
//! - **Retransmission**: Master retries unanswered requests
//! - **Custom transport support**: Works with any port implementing [`Transport`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! │                 (TextStore, Dispatcher)                  │
//! ├─────────────────────────────────────────────────────────┤
//! │                     Session Layer                        │
//! │  ┌─────────────────┐        ┌─────────────────────┐     │
//! │  │  MasterSession  │        │    SlaveSession     │     │
//! │  └─────────────────┘        └─────────────────────┘     │
//! ├─────────────────────────────────────────────────────────┤
//! │                     Frame Layer                          │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────┐   │
//! │  │  Encoding   │ │     LRC     │ │   Accumulator   │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────┘   │
//! ├─────────────────────────────────────────────────────────┤
//! │                    Transport Layer                       │
//! │  ┌─────────────────────────────────────────────────┐   │
//! │  │      Serial device / socket / in-memory link     │   │
//! │  └─────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use asciilink::{MasterSession, MonotonicClock, SessionConfig};
//!
//! let config = SessionConfig::new().with_max_retries(2);
//! let mut master = MasterSession::new(transport, MonotonicClock::new(), config);
//!
//! master.write_text(5, "Hello")?;
//! let text = master.read_text(5)?;
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod app;
pub mod buffer;
pub mod config;
pub mod core;
pub mod error;
pub mod session;
pub mod time;
pub mod transport;

// Re-export commonly used types
pub use crate::core::{
    Frame, HexDump, Lrc, Payload, BROADCAST_ADDRESS, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use app::{TextStore, FUNC_READ_TEXT, FUNC_WRITE_TEXT};
pub use config::SessionConfig;
pub use error::{DispatchError, FrameError, MasterError, Result, TransportError, TransportResult};
pub use session::{Dispatcher, MasterSession, Reply, Request, SlaveEvent, SlaveSession};
#[cfg(feature = "std")]
pub use time::MonotonicClock;
pub use time::Clock;
pub use transport::Transport;

/// Default response timeout per attempt in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default number of retransmissions after the first attempt
pub const DEFAULT_MAX_RETRIES: u8 = 0;

/// Default maximum silence between characters of one frame in milliseconds
pub const DEFAULT_INTER_CHAR_TIMEOUT_MS: u64 = 50;

/// Default time a slave listens before rechecking its stop flag in milliseconds
pub const DEFAULT_LISTEN_POLL_INTERVAL_MS: u64 = 100;
