//! Navigation Error Types

use std::sync::Arc;
use thiserror::Error;

use crate::navigation::locator::{Locator, LocatorError};

/// Result type for navigation operations
pub type NavigationResult<T> = Result<T, NavigationError>;

/// Errors reported by the navigation service
#[derive(Debug, Error, Clone)]
pub enum NavigationError {
    /// The locator could not be parsed; a calling-code bug, not a navigation failure
    #[error("Invalid locator: {0}")]
    InvalidLocator(#[from] LocatorError),

    /// The resolution context could not supply an instance for the locator
    #[error("Navigation to '{locator}' failed: {error}")]
    ResolutionFailed {
        locator: Locator,
        error: Arc<anyhow::Error>,
    },
}

impl NavigationError {
    /// Create a resolution failed error
    pub fn resolution_failed(locator: Locator, error: Arc<anyhow::Error>) -> Self {
        Self::ResolutionFailed { locator, error }
    }

    /// The underlying resolver failure, if any
    pub fn resolver_error(&self) -> Option<&anyhow::Error> {
        match self {
            NavigationError::ResolutionFailed { error, .. } => Some(error.as_ref()),
            NavigationError::InvalidLocator(_) => None,
        }
    }
}
