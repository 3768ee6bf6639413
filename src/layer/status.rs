//! Layer lifecycle status.

/// Lifecycle state of a layer. Transitions are monotonic:
/// `Fresh -> Opening -> Ok | Error`, and `Error` is terminal — an
/// errored layer short-circuits every synthesis call until teardown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayerStatus {
    #[default]
    Fresh,
    Opening,
    Ok,
    Error(String),
}

impl LayerStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, LayerStatus::Ok)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LayerStatus::Error(_))
    }

    /// Error message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            LayerStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}
