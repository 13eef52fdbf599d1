//! Notification System Error Types

use std::fmt;

/// Result type for notification operations
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notification system
///
/// Only misuse is reported here. A weakly retained receiver that has been
/// dropped is the normal end of a subscription and never surfaces as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// A required part of a subscription request was not supplied
    InvalidArgument(&'static str),

    /// The captured dispatch context is no longer running
    ContextClosed(String),
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::InvalidArgument(argument) => {
                write!(f, "Invalid subscription request: '{}' is required", argument)
            }
            NotificationError::ContextClosed(name) => {
                write!(f, "Dispatch context '{}' is closed", name)
            }
        }
    }
}

impl std::error::Error for NotificationError {}

impl NotificationError {
    /// Create an invalid argument error
    pub fn invalid_argument(argument: &'static str) -> Self {
        Self::InvalidArgument(argument)
    }

    /// Create a context closed error
    pub fn context_closed<S: Into<String>>(name: S) -> Self {
        Self::ContextClosed(name.into())
    }
}
