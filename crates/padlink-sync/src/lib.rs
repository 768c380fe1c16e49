//! Keeps a hardware controller in step with fast-changing host state.
//!
//! - [`scheduler`] turns an unbounded stream of state changes into a
//!   rate-bounded, deduplicated, priority-ordered stream of frames.
//! - [`viewport`] and [`ring`] track which window of the host's grid the
//!   hardware shows and emit the updates needed when it moves.
//! - [`dispatch`] routes inbound frames to domain handlers by command range.
//! - [`property`] maps host property changes onto commands.
//!
//! Everything here is single-owner and non-blocking. With the `async`
//! feature, [`runtime`] puts a scheduler behind a tokio mailbox.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod property;
pub mod ring;
#[cfg(feature = "async")]
pub mod runtime;
pub mod scheduler;
pub mod viewport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PadlinkConfig, RingConfig, SchedulerConfig};
pub use dispatch::{DispatchOutcome, DispatchStats, Dispatcher, Handler, Route};
pub use error::{Result, SyncError};
pub use property::{on_property_changed, PropertyBinding, PropertyId, PropertyTable, PropertyValue};
pub use ring::{GridSource, NavigationAction, RingController};
#[cfg(feature = "async")]
pub use runtime::{spawn_scheduler, SchedulerHandle, TokioClock};
pub use scheduler::{
    CoalescingScheduler, FlushOutcome, FlushReport, PendingMessage, SchedulerStats, Slot,
    SubmitOutcome,
};
pub use viewport::{Direction, Viewport, Window};
