//! Function code dispatch for slave sessions.

use heapless::FnvIndexMap;

use crate::core::{Frame, Payload, BROADCAST_ADDRESS};
use crate::error::DispatchError;

/// Maximum number of function codes one dispatcher can serve.
pub const MAX_HANDLERS: usize = 16;

/// Bit set in the function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Exception code for an unsupported function.
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Exception code for a request payload the handler cannot accept.
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// A decoded request addressed to this slave (or broadcast).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    /// Address the request was sent to.
    pub address: u8,
    /// Function code.
    pub function: u8,
    /// Request payload.
    pub payload: &'a [u8],
}

impl Request<'_> {
    /// Returns true if the request was broadcast and will not be answered.
    pub const fn is_broadcast(&self) -> bool {
        self.address == BROADCAST_ADDRESS
    }
}

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Normal response carrying a payload.
    Payload(Payload),
    /// Exception response with the given code.
    Exception(u8),
    /// No response at all.
    Silent,
}

impl Reply {
    /// Builds the response frame sent from `address` for a request with
    /// `function`, or `None` for a silent reply.
    pub fn into_response(self, address: u8, function: u8) -> Option<Frame> {
        match self {
            Self::Payload(payload) => Some(Frame {
                address,
                function,
                payload,
            }),
            Self::Exception(code) => {
                let mut frame = Frame::empty(address, function | EXCEPTION_FLAG);
                frame.payload.push(code).ok()?;
                Some(frame)
            }
            Self::Silent => None,
        }
    }
}

/// Handler for one function code, operating on shared application state.
pub type Handler<S> = fn(&mut S, &Request<'_>) -> Reply;

/// Maps function codes to handlers over application state `S`.
pub struct Dispatcher<S> {
    state: S,
    handlers: FnvIndexMap<u8, Handler<S>, MAX_HANDLERS>,
}

impl<S> Dispatcher<S> {
    /// Creates a dispatcher with no handlers.
    pub fn new(state: S) -> Self {
        Self {
            state,
            handlers: FnvIndexMap::new(),
        }
    }

    /// Registers `handler` for `function`, replacing any previous one.
    pub fn register(&mut self, function: u8, handler: Handler<S>) -> Result<(), DispatchError> {
        self.handlers
            .insert(function, handler)
            .map(|_| ())
            .map_err(|_| DispatchError::Full(function))
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_handler(mut self, function: u8, handler: Handler<S>) -> Result<Self, DispatchError> {
        self.register(function, handler)?;
        Ok(self)
    }

    /// Returns true if a handler is registered for `function`.
    pub fn handles(&self, function: u8) -> bool {
        self.handlers.contains_key(&function)
    }

    /// Runs the handler for the request's function.
    ///
    /// Unregistered functions yield an illegal-function exception.
    pub fn dispatch(&mut self, request: &Request<'_>) -> Reply {
        match self.handlers.get(&request.function).copied() {
            Some(handler) => handler(&mut self.state, request),
            None => {
                log::debug!("no handler for function {:#04x}", request.function);
                Reply::Exception(EXCEPTION_ILLEGAL_FUNCTION)
            }
        }
    }

    /// Shared application state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Shared application state, mutably.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Consumes the dispatcher, returning its state.
    pub fn into_state(self) -> S {
        self.state
    }
}
