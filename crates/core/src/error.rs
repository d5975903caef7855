/// Result alias that carries the custom [`StaggerError`] type.
pub type Result<T> = std::result::Result<T, StaggerError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum StaggerError {
    /// A timing parameter was negative, NaN or infinite.
    #[error("invalid {field}: {value} (must be finite and >= 0)")]
    InvalidParameter { field: String, value: f64 },
    /// Two direct children of the same group share an identifier.
    #[error("duplicate child `{id}` in group `{group}`")]
    DuplicateId { group: String, id: String },
    /// The signal has no meaning for the group's trigger policy.
    #[error("signal {signal} is not recognised by {policy} groups")]
    UnknownSignal {
        policy: &'static str,
        signal: &'static str,
    },
    /// `advance` moved backwards inside a single run.
    #[error("clock moved backwards from {previous} to {now} within a run")]
    ClockRegression { previous: f64, now: f64 },
    /// Free-form error used by the scene and command line surface.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Scene files that fail to parse.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl StaggerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid(field: impl Into<String>, value: f64) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            value,
        }
    }
}

impl From<&str> for StaggerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for StaggerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
