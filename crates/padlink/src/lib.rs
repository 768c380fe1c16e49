//! Keep a 7-bit SysEx hardware controller in sync with a fast-changing host.
//!
//! padlink reconciles a host that reports state changes at any rate with a
//! serial link that has a fixed refresh budget: changes are deduplicated,
//! coalesced and flushed in priority order at a bounded frame rate.
//!
//! # Crate Structure
//!
//! - [`transport`]: The `TransmitSink` byte sink abstraction
//! - [`frame`]: SysEx framing, 14-bit value packing and the command table
//! - [`sync`]: Coalescing scheduler, viewport ring, dispatcher and property bindings

/// Re-export transport types.
pub mod transport {
    pub use padlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use padlink_frame::*;
}

/// Re-export synchronization types.
pub mod sync {
    pub use padlink_sync::*;
}
