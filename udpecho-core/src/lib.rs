//! Reliable request/response delivery over UDP: a retrying exchanger with
//! exponential backoff, and the echo responder it talks to.
//! Core logic only; the client and server binaries are thin adapters.

pub mod backoff;
pub mod exchange;
pub mod responder;
pub mod wire;

pub use backoff::{BackoffSchedule, InvalidSchedule};
pub use exchange::{ExchangeError, Exchanger, Outcome};
pub use responder::Responder;
pub use wire::MAX_PAYLOAD;
