//! Navigation Service
//!
//! Resolves locators into instances, tells the outgoing and incoming
//! participants, and keeps the journal consistent: the journal and the
//! active instance only change once resolution has succeeded.

use std::sync::Arc;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::navigation::context::{notify_participants, Navigable, NavigationContext, NavigationMode};
use crate::navigation::error::{NavigationError, NavigationResult};
use crate::navigation::journal::NavigationJournal;
use crate::navigation::locator::Locator;
use crate::navigation::resolver::InstanceResolver;

/// Default capacity of the navigation event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Signals raised by the navigation service
#[derive(Debug, Clone)]
pub enum NavigationEvent {
    /// A new instance became active
    ActiveInstanceChanged {
        locator: Locator,
        instance: String,
    },

    /// A navigation completed and the journal was committed
    Navigated {
        locator: Locator,
        mode: NavigationMode,
    },

    /// The locator could not be resolved; nothing changed
    NavigationFailed {
        locator: Locator,
        mode: NavigationMode,
        error: Arc<anyhow::Error>,
    },
}

impl NavigationEvent {
    pub fn locator(&self) -> &Locator {
        match self {
            NavigationEvent::ActiveInstanceChanged { locator, .. } => locator,
            NavigationEvent::Navigated { locator, .. } => locator,
            NavigationEvent::NavigationFailed { locator, .. } => locator,
        }
    }
}

/// Point-in-time view of the service for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct NavigationSnapshot {
    pub active: Option<String>,
    pub journal: NavigationJournal,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

struct ActiveEntry {
    locator: Locator,
    instance: Arc<dyn Navigable>,
}

#[derive(Default)]
struct ServiceState {
    active: Option<ActiveEntry>,
    journal: NavigationJournal,
}

pub(crate) struct ServiceInner {
    resolver: Arc<dyn InstanceResolver>,
    state: Mutex<ServiceState>,
    events: broadcast::Sender<NavigationEvent>,
}

/// URI-addressed navigation with back/forward history
///
/// Cloning yields another handle to the same service. Callers serialize their
/// own navigations: a `navigate` should complete before the next one starts.
#[derive(Clone)]
pub struct NavigationService {
    inner: Arc<ServiceInner>,
}

impl NavigationService {
    pub fn new(resolver: Arc<dyn InstanceResolver>) -> Self {
        Self::with_event_capacity(resolver, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(resolver: Arc<dyn InstanceResolver>, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(ServiceInner {
                resolver,
                state: Mutex::new(ServiceState::default()),
                events,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ServiceInner>) -> Self {
        Self { inner }
    }

    /// Receive navigation signals raised from now on
    pub fn events(&self) -> broadcast::Receiver<NavigationEvent> {
        self.inner.events.subscribe()
    }

    /// Parse `locator` and navigate to it
    ///
    /// A malformed locator is rejected before anything is notified.
    pub async fn navigate(&self, locator: &str) -> NavigationResult<()> {
        let locator = Locator::parse(locator)?;
        self.navigate_to(locator).await
    }

    /// Navigate to a parsed locator, discarding forward history on success
    pub async fn navigate_to(&self, locator: Locator) -> NavigationResult<()> {
        self.perform(locator, NavigationMode::New).await
    }

    /// Navigate to the previous journal entry.
    ///
    /// Returns `Ok(false)` when there is nothing to go back to.
    pub async fn go_back(&self) -> NavigationResult<bool> {
        let target = self.inner.state.lock().journal.back_target().cloned();
        match target {
            Some(locator) => self.perform(locator, NavigationMode::Back).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Navigate to the next journal entry.
    ///
    /// Returns `Ok(false)` when there is nothing to go forward to.
    pub async fn go_forward(&self) -> NavigationResult<bool> {
        let target = self.inner.state.lock().journal.forward_target().cloned();
        match target {
            Some(locator) => self.perform(locator, NavigationMode::Forward).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Empty both journal stacks
    pub fn clear(&self) {
        self.inner.state.lock().journal.clear();
        debug!("Navigation journal cleared");
    }

    pub fn can_go_back(&self) -> bool {
        self.inner.state.lock().journal.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.inner.state.lock().journal.can_go_forward()
    }

    pub fn active(&self) -> Option<Arc<dyn Navigable>> {
        self.inner
            .state
            .lock()
            .active
            .as_ref()
            .map(|entry| Arc::clone(&entry.instance))
    }

    pub fn active_locator(&self) -> Option<Locator> {
        self.inner.state.lock().active.as_ref().map(|entry| entry.locator.clone())
    }

    /// Copy of the current journal
    pub fn journal(&self) -> NavigationJournal {
        self.inner.state.lock().journal.clone()
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        let state = self.inner.state.lock();
        NavigationSnapshot {
            active: state
                .active
                .as_ref()
                .map(|entry| entry.instance.display_name().to_string()),
            journal: state.journal.clone(),
            can_go_back: state.journal.can_go_back(),
            can_go_forward: state.journal.can_go_forward(),
        }
    }

    async fn perform(&self, locator: Locator, mode: NavigationMode) -> NavigationResult<()> {
        debug!("Navigating to {} ({:?})", locator, mode);
        let context = NavigationContext::new(Arc::downgrade(&self.inner), locator.clone(), mode);

        let outgoing = self.active();
        if let Some(outgoing) = &outgoing {
            trace!("Notifying '{}' of departure", outgoing.display_name());
            notify_participants(outgoing, |participant| participant.on_navigated_from(&context));
        }

        let instance = match self.inner.resolver.resolve(&locator).await {
            Ok(instance) => instance,
            Err(error) => {
                let error = Arc::new(error);
                warn!("Navigation to {} failed: {}", locator, error);
                self.emit(NavigationEvent::NavigationFailed {
                    locator: locator.clone(),
                    mode,
                    error: Arc::clone(&error),
                });
                return Err(NavigationError::resolution_failed(locator, error));
            }
        };

        self.inner.state.lock().active = Some(ActiveEntry {
            locator: locator.clone(),
            instance: Arc::clone(&instance),
        });
        self.emit(NavigationEvent::ActiveInstanceChanged {
            locator: locator.clone(),
            instance: instance.display_name().to_string(),
        });

        notify_participants(&instance, |participant| participant.on_navigated_to(&context));

        self.commit(&locator, mode);
        info!("Navigated to {}", locator);
        self.emit(NavigationEvent::Navigated { locator, mode });
        Ok(())
    }

    fn commit(&self, locator: &Locator, mode: NavigationMode) {
        let mut state = self.inner.state.lock();
        let journal = &mut state.journal;
        let committed = match mode {
            NavigationMode::New => {
                journal.record(locator.clone());
                true
            }
            NavigationMode::Back if journal.back_target() == Some(locator) => journal.commit_back(),
            NavigationMode::Forward if journal.forward_target() == Some(locator) => {
                journal.commit_forward()
            }
            _ => false,
        };

        if !committed {
            warn!(
                "Journal moved while navigating to {} ({:?}); recording as a new entry",
                locator, mode
            );
            journal.record(locator.clone());
        }
    }

    fn emit(&self, event: NavigationEvent) {
        if self.inner.events.send(event).is_err() {
            trace!("No navigation event receivers");
        }
    }
}

impl std::fmt::Debug for NavigationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationService")
            .field("active", &self.active_locator())
            .field("journal", &self.journal())
            .finish()
    }
}
