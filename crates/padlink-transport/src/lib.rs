//! Byte sink abstraction for padlink hardware links.
//!
//! The synchronization core never owns a serial port. It hands finished
//! frames to a [`TransmitSink`] and moves on; delivery, buffering and
//! reconnection belong to whoever implements the sink.
//!
//! Two sinks ship with the crate:
//! - [`WriteSink`] over any `std::io::Write` (serial device file, pipe, stdout)
//! - [`MemorySink`] that records frames, for tests and dry runs

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemorySink;
pub use traits::{TransmitSink, WriteSink};
