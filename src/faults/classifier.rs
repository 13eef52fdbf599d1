//! Fault Classifier
//!
//! Given a failure and the operation that raised it, decides whether the
//! caller's retry loop should go around again. Terminal faults with a
//! message are queued for the user exactly once per classification.

use std::sync::Arc;
use log::{debug, warn};
use serde::Serialize;

use crate::faults::fault::Fault;
use crate::faults::message_queue::MessageQueue;
use crate::faults::table::{FaultTable, Verdict};

/// Outcome of classifying one failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetryDecision {
    /// Transient; run the call again
    Retry,
    /// Terminal; leave the retry loop
    Abort,
}

impl RetryDecision {
    /// `true` when the retry loop should continue
    pub fn should_retry(self) -> bool {
        matches!(self, RetryDecision::Retry)
    }

    pub fn is_terminal(self) -> bool {
        !self.should_retry()
    }
}

/// Table-driven classifier feeding the user message queue
#[derive(Clone)]
pub struct FaultClassifier {
    table: Arc<FaultTable>,
    queue: MessageQueue,
}

impl FaultClassifier {
    pub fn new(table: Arc<FaultTable>, queue: MessageQueue) -> Self {
        Self { table, queue }
    }

    /// Classify with the built-in table
    pub fn builtin(queue: MessageQueue) -> Self {
        Self::new(Arc::new(FaultTable::builtin()), queue)
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    pub fn table(&self) -> &FaultTable {
        &self.table
    }

    /// Decide what the retry loop should do about `fault`. Never fails.
    pub fn classify(&self, fault: &Fault, operation: &str) -> RetryDecision {
        let kind = fault.kind();
        let handler = match self.table.handler(kind) {
            Some(handler) => handler,
            None => {
                warn!("Unhandled {:?} fault in '{}': {}", kind, operation, fault);
                return RetryDecision::Abort;
            }
        };

        match handler(fault, operation) {
            Verdict::Retry => {
                debug!("Transient {:?} fault in '{}': {}", kind, operation, fault);
                RetryDecision::Retry
            }
            Verdict::Stop(message) => {
                debug!("Terminal {:?} fault in '{}': {}", kind, operation, fault);
                if let Some(message) = message {
                    self.queue.enqueue_notification(message);
                }
                RetryDecision::Abort
            }
        }
    }

    /// Boolean form of [`FaultClassifier::classify`]: `true` means try again
    pub fn should_retry(&self, fault: &Fault, operation: &str) -> bool {
        self.classify(fault, operation).should_retry()
    }
}

impl std::fmt::Debug for FaultClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultClassifier")
            .field("table", &self.table)
            .field("queue", &self.queue)
            .finish()
    }
}
