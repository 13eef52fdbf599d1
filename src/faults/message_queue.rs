//! Serialized User Notification Queue
//!
//! Failing background operations enqueue messages from any thread. A single
//! display loop shows them one at a time, in arrival order, waiting for each
//! to be dismissed before showing the next.
//!
//! States: `Idle` (queue empty, nothing shown) -> `Showing` on the first
//! enqueue -> `Showing` while the queue still has entries after a dismissal
//! -> `Idle` once the queue drains.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, error, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::Notify;

/// A message waiting to be shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub content: String,
    pub title: String,
}

impl PendingNotification {
    pub fn new<C: Into<String>, T: Into<String>>(content: C, title: T) -> Self {
        Self {
            content: content.into(),
            title: title.into(),
        }
    }
}

/// Whether a message is currently on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueueState {
    Idle,
    Showing,
}

/// Shows one message and completes when the user dismisses it
#[async_trait]
pub trait MessagePresenter: Send + Sync {
    async fn present(&self, notification: PendingNotification);
}

/// Presenter for headless use: logs the message and dismisses it at once
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

#[async_trait]
impl MessagePresenter for LogPresenter {
    async fn present(&self, notification: PendingNotification) {
        warn!("{}: {}", notification.title, notification.content);
    }
}

struct Pending {
    queue: VecDeque<PendingNotification>,
    showing: bool,
}

struct QueueInner {
    pending: Mutex<Pending>,
    presenter: Arc<dyn MessagePresenter>,
    runtime: Handle,
    idle: Notify,
    shown: AtomicU64,
}

/// FIFO of user-facing messages with mutually exclusive display
#[derive(Clone)]
pub struct MessageQueue {
    inner: Arc<QueueInner>,
}

impl MessageQueue {
    /// Create a queue whose display loop runs on `runtime`
    pub fn new(presenter: Arc<dyn MessagePresenter>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                pending: Mutex::new(Pending {
                    queue: VecDeque::new(),
                    showing: false,
                }),
                presenter,
                runtime,
                idle: Notify::new(),
                shown: AtomicU64::new(0),
            }),
        }
    }

    /// Create a queue on the runtime the caller is running in
    pub fn from_current(presenter: Arc<dyn MessagePresenter>) -> Result<Self, TryCurrentError> {
        Ok(Self::new(presenter, Handle::try_current()?))
    }

    /// Queue a message. Never blocks; starts the display loop when idle.
    pub fn enqueue<C: Into<String>, T: Into<String>>(&self, content: C, title: T) {
        self.enqueue_notification(PendingNotification::new(content, title));
    }

    pub fn enqueue_notification(&self, notification: PendingNotification) {
        let start_loop = {
            let mut pending = self.inner.pending.lock();
            pending.queue.push_back(notification);
            if pending.showing {
                false
            } else {
                pending.showing = true;
                true
            }
        };

        if start_loop {
            debug!("Starting message display loop");
            let guard = LoopGuard {
                inner: Arc::clone(&self.inner),
                drained: false,
            };
            self.inner.runtime.spawn(display_loop(guard));
        }
    }

    pub fn state(&self) -> QueueState {
        if self.inner.pending.lock().showing {
            QueueState::Showing
        } else {
            QueueState::Idle
        }
    }

    /// Messages queued behind the one on screen
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().queue.len()
    }

    /// Messages shown and dismissed so far
    pub fn shown_count(&self) -> u64 {
        self.inner.shown.load(Ordering::SeqCst)
    }

    /// Wait until every queued message has been shown and dismissed
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.state() == QueueState::Idle {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.inner.pending.lock();
        f.debug_struct("MessageQueue")
            .field("pending", &pending.queue.len())
            .field("showing", &pending.showing)
            .finish()
    }
}

/// Owned by one display loop. Dropping it before the queue drained (the task
/// was cancelled, or never ran because the runtime is gone) clears `showing`
/// so the next enqueue starts a fresh loop.
struct LoopGuard {
    inner: Arc<QueueInner>,
    drained: bool,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        if !self.drained {
            let left = {
                let mut pending = self.inner.pending.lock();
                pending.showing = false;
                pending.queue.len()
            };
            warn!(
                "Message display loop stopped early; {} message(s) left queued until the next enqueue",
                left
            );
        }
        self.inner.idle.notify_waiters();
    }
}

/// Show queued messages until the queue is empty.
///
/// The `showing` flag is cleared under the same lock that observes the empty
/// queue, so a concurrent enqueue either lands before (and is shown here) or
/// after (and starts a new loop).
async fn display_loop(mut guard: LoopGuard) {
    let inner = Arc::clone(&guard.inner);
    loop {
        let next = {
            let mut pending = inner.pending.lock();
            match pending.queue.pop_front() {
                Some(notification) => notification,
                None => {
                    pending.showing = false;
                    guard.drained = true;
                    break;
                }
            }
        };

        debug!("Showing message '{}'", next.title);
        let shown = AssertUnwindSafe(inner.presenter.present(next)).catch_unwind().await;
        if shown.is_err() {
            error!("Message presenter panicked; continuing with the next message");
        }
        inner.shown.fetch_add(1, Ordering::SeqCst);
    }

    debug!("Message queue drained");
}
