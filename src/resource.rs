//! Loading / success / error wrapper published on every feed channel.

/// Observable state of an asynchronous load.
///
/// Exactly one variant is active at a time. `Error` may carry the last
/// known-good payload so a consumer can keep showing stale data next to
/// the error message.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T> {
    Loading,
    Success { data: T, message: Option<String> },
    Error { message: String, data: Option<T> },
}

impl<T> Resource<T> {
    pub fn success(data: T) -> Self {
        Resource::Success {
            data,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Resource::Error {
            message: message.into(),
            data: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    /// True for `Success` and `Error`, the two states that end a request.
    pub fn is_terminal(&self) -> bool {
        match self {
            Resource::Loading => false,
            Resource::Success { .. } | Resource::Error { .. } => true,
        }
    }

    /// Payload carried by this state, if any (stale data for `Error`).
    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Loading => None,
            Resource::Success { data, .. } => Some(data),
            Resource::Error { data, .. } => data.as_ref(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Resource::Loading => None,
            Resource::Success { message, .. } => message.as_deref(),
            Resource::Error { message, .. } => Some(message),
        }
    }
}
