//! Caller-Owned Retry Loop
//!
//! Runs a remote call until it succeeds or the classifier reports a terminal
//! fault. The baseline policy never caps attempts and never sleeps; an
//! attempt cap and exponential backoff are opt-in.

use std::future::Future;
use std::time::Duration;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::faults::classifier::FaultClassifier;
use crate::faults::fault::Fault;

/// Why a retried call gave up
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// The classifier judged the fault terminal
    #[error("{operation} failed: {fault}")]
    Terminal { operation: String, fault: Fault },

    /// Transient faults continued past the attempt cap
    #[error("{operation} gave up after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: Fault,
    },
}

impl RetryError {
    /// The fault that ended the loop
    pub fn fault(&self) -> &Fault {
        match self {
            RetryError::Terminal { fault, .. } => fault,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

/// Result type for retried calls
pub type RetryResult<T> = Result<T, RetryError>;

/// Exponential delay between attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay_ms == 0 {
            return Err("Initial delay must be greater than 0".to_string());
        }

        if self.max_delay_ms < self.initial_delay_ms {
            return Err("Max delay must be greater than or equal to initial delay".to_string());
        }

        if self.multiplier < 1.0 {
            return Err("Multiplier must be at least 1.0".to_string());
        }

        Ok(())
    }

    /// Delay before retry number `retry` (1 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(64) as i32;
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

/// How a caller's retry loop is bounded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Delay between attempts; `None` retries immediately
    pub backoff: Option<BackoffConfig>,
}

impl RetryPolicy {
    /// No cap, no delay
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == Some(0) {
            return Err("Max attempts must be greater than 0".to_string());
        }
        match &self.backoff {
            Some(backoff) => backoff.validate(),
            None => Ok(()),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }
}

/// Run `call` until it succeeds, the classifier reports a terminal fault, or
/// the policy's attempt cap is reached.
///
/// Each attempt's future runs to completion before the fault is classified.
/// A terminal fault's user message is queued by the classifier, once per
/// failing attempt.
pub async fn run_with_retry<T, F, Fut>(
    classifier: &FaultClassifier,
    operation: &str,
    policy: &RetryPolicy,
    mut call: F,
) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Fault>>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let fault = match call().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!("'{}' succeeded after {} attempts", operation, attempts);
                }
                return Ok(value);
            }
            Err(fault) => fault,
        };

        if !classifier.should_retry(&fault, operation) {
            return Err(RetryError::Terminal {
                operation: operation.to_string(),
                fault,
            });
        }

        if let Some(max_attempts) = policy.max_attempts {
            if attempts >= max_attempts {
                warn!("'{}' still failing after {} attempts: {}", operation, attempts, fault);
                return Err(RetryError::Exhausted {
                    operation: operation.to_string(),
                    attempts,
                    last: fault,
                });
            }
        }

        debug!("Retrying '{}' (attempt {}): {}", operation, attempts + 1, fault);
        if let Some(backoff) = &policy.backoff {
            tokio::time::sleep(backoff.delay_for(attempts)).await;
        }
    }
}
