//! Fault Classification
//!
//! Decides whether a failed remote call is worth retrying and makes sure the
//! user hears about terminal failures exactly once each, one message at a
//! time.
//!
//! # Architecture
//!
//! - [`FaultTable`]: kind -> handler map, built once and shared
//! - [`FaultClassifier`]: looks up the handler and queues any message
//! - [`MessageQueue`]: FIFO shown by a single display loop
//! - [`run_with_retry`]: the caller-owned loop driven by the classifier
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use appshell::faults::{run_with_retry, Fault, FaultClassifier, LogPresenter, MessageQueue, RetryPolicy};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let queue = MessageQueue::from_current(Arc::new(LogPresenter))?;
//! let classifier = FaultClassifier::builtin(queue.clone());
//!
//! let orders = run_with_retry(&classifier, "Load orders", &RetryPolicy::unbounded(), || async {
//!     Ok::<_, Fault>(vec!["SO-1001"])
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod fault;
pub mod message_queue;
pub mod retry;
pub mod table;


pub use classifier::{FaultClassifier, RetryDecision};
pub use fault::{Fault, FaultKind};
pub use message_queue::{LogPresenter, MessagePresenter, MessageQueue, PendingNotification, QueueState};
pub use retry::{run_with_retry, BackoffConfig, RetryError, RetryPolicy, RetryResult};
pub use table::{FaultHandler, FaultTable, Verdict};
