//! Buffer management for inbound frames.
//!
//! This module provides:
//! - FrameAccumulator: collects characters from start marker to terminator

mod accumulator;

pub use accumulator::{Feed, FrameAccumulator};
