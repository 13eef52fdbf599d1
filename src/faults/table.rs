//! Fault Classification Table
//!
//! Explicit kind -> handler map, built once at startup and shared by
//! reference. A kind with no handler is treated as terminal and silent.

use std::collections::HashMap;
use std::fmt;

use crate::faults::fault::{Fault, FaultKind};
use crate::faults::message_queue::PendingNotification;

/// Message shown for a rejected argument
pub const VALIDATION_MESSAGE: &str =
    "The information you entered is not valid. Please review it and try again.";

/// Message shown for an optimistic concurrency conflict
pub const RESOURCE_BUSY_MESSAGE: &str =
    "The resource is busy because another user changed it. Reload it and try again.";

/// What a handler decided about a fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Transient; the caller may try again. Nothing is shown.
    Retry,
    /// Terminal; optionally tell the user.
    Stop(Option<PendingNotification>),
}

/// Decides the verdict for one fault raised by `operation`
pub type FaultHandler = fn(&Fault, &str) -> Verdict;

/// Kind -> handler lookup
#[derive(Clone)]
pub struct FaultTable {
    handlers: HashMap<FaultKind, FaultHandler>,
}

impl FaultTable {
    /// A table with no handlers: every fault is terminal and silent
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The standard table for remote service calls
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table
            .register(FaultKind::Remote, remote_fault)
            .register(FaultKind::Validation, validation_fault)
            .register(FaultKind::ConcurrencyConflict, concurrency_conflict)
            .register(FaultKind::NotFound, record_not_found)
            .register(FaultKind::EndpointUnreachable, transient_transport)
            .register(FaultKind::ChannelFaulted, transient_transport)
            .register(FaultKind::ServerTooBusy, transient_transport);
        table
    }

    /// Install or replace the handler for `kind`
    pub fn register(&mut self, kind: FaultKind, handler: FaultHandler) -> &mut Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn handler(&self, kind: FaultKind) -> Option<FaultHandler> {
        self.handlers.get(&kind).copied()
    }

    pub fn is_registered(&self, kind: FaultKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl Default for FaultTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for FaultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<FaultKind> = FaultKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.is_registered(*kind))
            .collect();
        f.debug_struct("FaultTable").field("registered", &registered).finish()
    }
}

fn title_for(operation: &str) -> String {
    format!("{} failed", operation)
}

fn remote_fault(fault: &Fault, operation: &str) -> Verdict {
    let content = match fault {
        Fault::Remote { message } => message.clone(),
        other => other.to_string(),
    };
    Verdict::Stop(Some(PendingNotification::new(content, title_for(operation))))
}

fn validation_fault(_fault: &Fault, operation: &str) -> Verdict {
    Verdict::Stop(Some(PendingNotification::new(VALIDATION_MESSAGE, title_for(operation))))
}

fn concurrency_conflict(_fault: &Fault, operation: &str) -> Verdict {
    Verdict::Stop(Some(PendingNotification::new(RESOURCE_BUSY_MESSAGE, title_for(operation))))
}

fn record_not_found(fault: &Fault, operation: &str) -> Verdict {
    let content = match fault {
        Fault::NotFound { record, key } => format!(
            "The {} with key '{}' could not be found. It may have been deleted by another user.",
            record, key
        ),
        other => other.to_string(),
    };
    Verdict::Stop(Some(PendingNotification::new(content, title_for(operation))))
}

fn transient_transport(_fault: &Fault, _operation: &str) -> Verdict {
    Verdict::Retry
}
