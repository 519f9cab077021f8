//! Core logic for the prioq queue service.
//!
//! Everything in this crate is pure: no I/O, no locks, no clock reads. The
//! server crate owns concurrency and transport and feeds this crate typed
//! requests.
//!
//! # Layers
//!
//! - [`heap::PriorityHeap`]: bounded binary min-heap keyed by
//!   (priority, insertion sequence) with O(n) maximum extraction
//! - [`session::Session`]: per-client protocol state machine that owns one
//!   heap and enforces capacity → value → priority ordering
//! - [`protocol`]: the two wire shapes (streaming and command-coded) decoded
//!   into one [`Operation`] vocabulary
//! - [`env::Environment`]: clock and randomness abstraction so activity
//!   tracking can run on virtual time in tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod heap;
mod operation;
pub mod protocol;
pub mod session;

pub use error::QueueError;
pub use heap::{Element, PriorityHeap};
pub use operation::{Operation, Reply};
pub use protocol::{CommandAdapter, ProtocolAdapter, Request, StreamingAdapter};
pub use session::{CapacityPolicy, Phase, Session};

/// Identity of a client as supplied by the transport.
pub type ClientId = u64;
