//! Master and slave session state machines.
//!
//! This module provides the two protocol roles:
//! - MasterSession: sends requests, waits for responses, retransmits
//! - SlaveSession: listens, filters by address, dispatches, replies
//! - Dispatcher: function code to handler mapping used by slaves

mod dispatch;
mod master;
mod slave;

pub use dispatch::{
    Dispatcher, Handler, Reply, Request, EXCEPTION_FLAG, EXCEPTION_ILLEGAL_DATA_VALUE,
    EXCEPTION_ILLEGAL_FUNCTION, MAX_HANDLERS,
};
pub use master::{MasterSession, MasterState, MasterStats};
pub use slave::{DiscardReason, SlaveEvent, SlaveSession, SlaveState, SlaveStats};
