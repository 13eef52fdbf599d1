//! Navigation Context and Participants
//!
//! Instances taking part in navigation implement [`Navigable`]. Both hooks
//! default to no-ops, so an instance only overrides what it cares about.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use serde::{Deserialize, Serialize};

use crate::navigation::locator::Locator;
use crate::navigation::service::{NavigationService, ServiceInner};

/// How a navigation was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationMode {
    /// A fresh navigation; discards forward history
    New,
    /// Traversal to the previous journal entry
    Back,
    /// Traversal to the next journal entry
    Forward,
}

/// What participants are told about a navigation
#[derive(Clone)]
pub struct NavigationContext {
    service: Weak<ServiceInner>,
    locator: Locator,
    mode: NavigationMode,
}

impl NavigationContext {
    pub(crate) fn new(service: Weak<ServiceInner>, locator: Locator, mode: NavigationMode) -> Self {
        Self { service, locator, mode }
    }

    /// The service performing the navigation, if it is still alive
    pub fn service(&self) -> Option<NavigationService> {
        self.service.upgrade().map(NavigationService::from_inner)
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        self.locator.parameters()
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.locator.parameter(key)
    }
}

impl fmt::Debug for NavigationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationContext")
            .field("locator", &self.locator)
            .field("mode", &self.mode)
            .finish()
    }
}

/// An instance that can be shown by the navigation service
pub trait Navigable: Send + Sync + 'static {
    /// Name used in logs and events
    fn display_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called on the active instance before navigation leaves it
    fn on_navigated_from(&self, _context: &NavigationContext) {}

    /// Called on a newly installed instance
    fn on_navigated_to(&self, _context: &NavigationContext) {}

    /// Secondary object bound to this instance (e.g. a view's data context),
    /// notified alongside it
    fn bound(&self) -> Option<Arc<dyn Navigable>> {
        None
    }
}

/// Run a hook on an instance and on its bound object
pub(crate) fn notify_participants<F>(instance: &Arc<dyn Navigable>, hook: F)
where
    F: Fn(&dyn Navigable),
{
    hook(instance.as_ref());
    if let Some(bound) = instance.bound() {
        hook(bound.as_ref());
    }
}
