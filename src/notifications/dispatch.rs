//! Dispatch Strategies
//!
//! Decides where a subscriber's callback runs once a payload has passed its
//! filter: inline on the publishing thread, on a captured execution context
//! (typically the UI loop), or on a background worker.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};

use crate::notifications::error::{NotificationError, NotificationResult};
use crate::notifications::subscription::Action;
use crate::notifications::Payload;

/// Unit of work posted to a dispatch context
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// How a subscriber's callback is invoked
#[derive(Clone, Default)]
pub enum DispatchStrategy {
    /// Invoked inline, before `publish` returns
    #[default]
    Synchronous,

    /// Posted to a captured execution context and run by its owning loop
    Context(ContextHandle),

    /// Run on a worker; no ordering guarantee
    Background,
}

impl fmt::Debug for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStrategy::Synchronous => write!(f, "Synchronous"),
            DispatchStrategy::Context(handle) => write!(f, "Context({})", handle.name()),
            DispatchStrategy::Background => write!(f, "Background"),
        }
    }
}

impl DispatchStrategy {
    /// Hand a payload to the callback according to this strategy
    pub(crate) fn deliver<T: Payload>(&self, action: Action<T>, payload: Arc<T>) {
        match self {
            DispatchStrategy::Synchronous => action(&*payload),
            DispatchStrategy::Context(handle) => {
                if let Err(e) = handle.post(move || action(&*payload)) {
                    warn!("Dropping notification: {}", e);
                }
            }
            DispatchStrategy::Background => spawn_background(move || action(&*payload)),
        }
    }
}

/// Run a job on the ambient tokio blocking pool, or a detached thread when
/// no runtime is entered.
fn spawn_background<F>(job: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(job);
        }
        Err(_) => {
            debug!("No tokio runtime entered, delivering on a dedicated thread");
            let spawned = std::thread::Builder::new()
                .name("appshell-notify".to_string())
                .spawn(job);
            if let Err(e) = spawned {
                warn!("Failed to start background delivery thread: {}", e);
            }
        }
    }
}

/// A captured execution context: a job queue drained by the thread that owns it.
///
/// The owning loop calls [`DispatchContext::run_pending`] (or
/// [`DispatchContext::run_next`]) on each tick; everything posted through a
/// [`ContextHandle`] runs there, in posting order.
pub struct DispatchContext {
    name: Arc<str>,
    sender: Sender<Job>,
    receiver: Receiver<Job>,
}

impl DispatchContext {
    /// Create a new, empty context
    pub fn new<S: Into<String>>(name: S) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            name: Arc::from(name.into()),
            sender,
            receiver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle used to post work to this context from any thread
    pub fn handle(&self) -> ContextHandle {
        ContextHandle {
            name: Arc::clone(&self.name),
            sender: self.sender.clone(),
        }
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Run the jobs queued at the time of the call and return how many ran.
    ///
    /// Jobs posted while draining wait for the next call.
    pub fn run_pending(&self) -> usize {
        let queued = self.receiver.len();
        let mut ran = 0;
        for _ in 0..queued {
            match self.receiver.try_recv() {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }

    /// Wait up to `timeout` for one job and run it
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job();
                true
            }
            Err(_) => false,
        }
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Cloneable sender side of a [`DispatchContext`]
#[derive(Clone)]
pub struct ContextHandle {
    name: Arc<str>,
    sender: Sender<Job>,
}

impl ContextHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a job on the owning context
    pub fn post<F>(&self, job: F) -> NotificationResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Box::new(job))
            .map_err(|_| NotificationError::context_closed(self.name.to_string()))
    }
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle").field("name", &self.name).finish()
    }
}
