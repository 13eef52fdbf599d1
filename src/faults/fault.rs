//! Remote Call Failures
//!
//! Failures raised by remote calls, tagged with the kind used to select a
//! handler in the classification table.

use std::io;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification key selecting a fault handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    Remote,
    Validation,
    ConcurrencyConflict,
    NotFound,
    EndpointUnreachable,
    ChannelFaulted,
    ServerTooBusy,
    Timeout,
    Other,
}

impl FaultKind {
    /// Every kind, in declaration order
    pub const ALL: [FaultKind; 9] = [
        FaultKind::Remote,
        FaultKind::Validation,
        FaultKind::ConcurrencyConflict,
        FaultKind::NotFound,
        FaultKind::EndpointUnreachable,
        FaultKind::ChannelFaulted,
        FaultKind::ServerTooBusy,
        FaultKind::Timeout,
        FaultKind::Other,
    ];
}

impl std::str::FromStr for FaultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "remote" => Ok(FaultKind::Remote),
            "validation" => Ok(FaultKind::Validation),
            "concurrencyconflict" | "conflict" => Ok(FaultKind::ConcurrencyConflict),
            "notfound" => Ok(FaultKind::NotFound),
            "endpointunreachable" | "unreachable" => Ok(FaultKind::EndpointUnreachable),
            "channelfaulted" | "faulted" => Ok(FaultKind::ChannelFaulted),
            "servertoobusy" | "busy" => Ok(FaultKind::ServerTooBusy),
            "timeout" => Ok(FaultKind::Timeout),
            "other" => Ok(FaultKind::Other),
            _ => Err(format!("Unknown fault kind: {}", s)),
        }
    }
}

/// A failed remote call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fault reported by the remote service, with its own description
    #[error("Remote fault: {message}")]
    Remote { message: String },

    /// The service rejected an argument
    #[error("Validation fault: {message}")]
    Validation { message: String },

    /// Optimistic concurrency check failed
    #[error("Concurrency conflict on {resource}")]
    ConcurrencyConflict { resource: String },

    /// The addressed record does not exist
    #[error("{record} with key '{key}' was not found")]
    NotFound { record: String, key: String },

    /// No endpoint answered
    #[error("Endpoint unreachable: {endpoint}")]
    EndpointUnreachable { endpoint: String },

    /// The communication channel is already broken
    #[error("Communication channel faulted: {message}")]
    ChannelFaulted { message: String },

    /// The server refused the call because it is overloaded
    #[error("Server too busy: {endpoint}")]
    ServerTooBusy { endpoint: String },

    /// The call did not complete in time
    #[error("Call timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// Anything without a dedicated kind
    #[error("{message}")]
    Other { message: String },
}

impl Fault {
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Remote { .. } => FaultKind::Remote,
            Fault::Validation { .. } => FaultKind::Validation,
            Fault::ConcurrencyConflict { .. } => FaultKind::ConcurrencyConflict,
            Fault::NotFound { .. } => FaultKind::NotFound,
            Fault::EndpointUnreachable { .. } => FaultKind::EndpointUnreachable,
            Fault::ChannelFaulted { .. } => FaultKind::ChannelFaulted,
            Fault::ServerTooBusy { .. } => FaultKind::ServerTooBusy,
            Fault::Timeout { .. } => FaultKind::Timeout,
            Fault::Other { .. } => FaultKind::Other,
        }
    }

    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::Remote { message: message.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn concurrency_conflict<S: Into<String>>(resource: S) -> Self {
        Self::ConcurrencyConflict { resource: resource.into() }
    }

    pub fn not_found<R: Into<String>, K: Into<String>>(record: R, key: K) -> Self {
        Self::NotFound {
            record: record.into(),
            key: key.into(),
        }
    }

    pub fn endpoint_unreachable<S: Into<String>>(endpoint: S) -> Self {
        Self::EndpointUnreachable { endpoint: endpoint.into() }
    }

    pub fn channel_faulted<S: Into<String>>(message: S) -> Self {
        Self::ChannelFaulted { message: message.into() }
    }

    pub fn server_too_busy<S: Into<String>>(endpoint: S) -> Self {
        Self::ServerTooBusy { endpoint: endpoint.into() }
    }

    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other { message: message.into() }
    }

    /// Build a representative fault of `kind`, used by diagnostics
    pub fn sample(kind: FaultKind, detail: &str) -> Self {
        match kind {
            FaultKind::Remote => Fault::remote(detail),
            FaultKind::Validation => Fault::validation(detail),
            FaultKind::ConcurrencyConflict => Fault::concurrency_conflict(detail),
            FaultKind::NotFound => Fault::not_found("Record", detail),
            FaultKind::EndpointUnreachable => Fault::endpoint_unreachable(detail),
            FaultKind::ChannelFaulted => Fault::channel_faulted(detail),
            FaultKind::ServerTooBusy => Fault::server_too_busy(detail),
            FaultKind::Timeout => Fault::Timeout { after: Duration::from_secs(30) },
            FaultKind::Other => Fault::other(detail),
        }
    }
}

impl From<io::Error> for Fault {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable => {
                Fault::endpoint_unreachable(error.to_string())
            }
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected => Fault::channel_faulted(error.to_string()),
            io::ErrorKind::TimedOut => Fault::Timeout { after: Duration::ZERO },
            _ => Fault::other(error.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for Fault {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Fault::Timeout { after: Duration::ZERO }
    }
}
