//! Core data structures for the protocol.
//!
//! This module contains fundamental building blocks:
//! - Frame: addressed message and its ASCII wire encoding
//! - Checksum: LRC for error detection

mod checksum;
mod frame;

pub use checksum::Lrc;
pub use frame::{
    EncodedFrame, Frame, HexDump, Payload, BROADCAST_ADDRESS, FRAME_END, FRAME_START,
    MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
