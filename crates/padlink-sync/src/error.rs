use padlink_frame::FrameConfigError;

/// Errors raised while configuring or driving the synchronization layer.
///
/// Per-message failures inside a flush are never surfaced here; they are
/// logged and counted in the scheduler statistics.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A configuration value is outside its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The frame codec configuration is invalid.
    #[error("invalid frame configuration: {0}")]
    FrameConfig(#[from] FrameConfigError),

    /// A viewport needs at least one row and one column.
    #[error("viewport window must be at least 1x1 (got {width}x{height})")]
    ZeroSizedWindow { width: usize, height: usize },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while loading configuration.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The scheduler task has exited and no longer accepts requests.
    #[error("scheduler task is no longer running")]
    ActorGone,
}

pub type Result<T> = std::result::Result<T, SyncError>;
