//! Error types for framing, transports and sessions.

use thiserror::Error;

/// Errors produced while encoding or decoding an ASCII frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Start marker or CR LF terminator absent.
    #[error("frame start marker or terminator missing")]
    MissingMarkers,

    /// Odd number of hex characters between the markers.
    #[error("odd number of hex characters in frame body")]
    OddLength,

    /// A character pair is not hexadecimal.
    #[error("invalid hex character in frame body")]
    InvalidHex,

    /// LRC does not cancel the byte sum.
    #[error("LRC checksum mismatch")]
    ChecksumMismatch,

    /// Fewer than address, function and checksum bytes.
    #[error("frame too short")]
    TooShort,

    /// More payload bytes on the wire than a frame may carry.
    #[error("frame too long")]
    TooLong,

    /// Payload exceeds `MAX_PAYLOAD_SIZE` when building a frame.
    #[error("payload too large")]
    PayloadTooLarge,

    /// Output buffer cannot hold the encoded frame.
    #[error("buffer too small for encoded frame")]
    BufferTooSmall,
}

/// Errors reported by a [`Transport`](crate::transport::Transport).
///
/// Every transport error is fatal to the session that sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The underlying port could not be opened.
    #[error("failed to open port")]
    OpenFailed,

    /// A read or write on the port failed.
    #[error("port I/O failed")]
    IoFailed,

    /// The peer closed the stream.
    #[error("port closed")]
    Closed,
}

/// Errors returned by [`MasterSession`](crate::session::MasterSession) requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MasterError {
    /// No valid response after the initial attempt and every retry.
    #[error("no response from address {address} to function {function:#04x} after {attempts} attempt(s)")]
    Timeout {
        /// Target address of the request.
        address: u8,
        /// Function code of the request.
        function: u8,
        /// Total transmissions, including the first one.
        attempts: u8,
    },

    /// The port failed while sending or receiving.
    #[error("port I/O error: {0}")]
    Transport(#[from] TransportError),

    /// The slave answered with an exception response.
    #[error("address {address} rejected function {function:#04x} with exception code {code:#04x}")]
    Exception {
        /// Responding address.
        address: u8,
        /// Function code of the request.
        function: u8,
        /// Exception code carried in the response.
        code: u8,
    },

    /// A read was addressed to the broadcast address, which never answers.
    #[error("read requests cannot be broadcast")]
    BroadcastRead,

    /// The request itself could not be framed.
    #[error("invalid request frame: {0}")]
    Frame(#[from] FrameError),
}

/// Errors from building a function dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The handler table has no room left.
    #[error("handler table full, cannot register function {0:#04x}")]
    Full(u8),
}

/// Result type for framing operations.
pub type Result<T> = core::result::Result<T, FrameError>;

/// Result type for transport operations.
pub type TransportResult<T> = core::result::Result<T, TransportError>;
