//! Navigation Journal
//!
//! Browser-style history: a back stack, a forward stack and the current
//! position between them. Only the navigation service mutates a journal;
//! everyone else gets read access or a snapshot.

use serde::Serialize;

use crate::navigation::locator::Locator;

/// Back/forward history around the current locator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavigationJournal {
    back: Vec<Locator>,
    current: Option<Locator>,
    forward: Vec<Locator>,
}

impl NavigationJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Locator> {
        self.current.as_ref()
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Entry a back navigation would land on
    pub fn back_target(&self) -> Option<&Locator> {
        self.back.last()
    }

    /// Entry a forward navigation would land on
    pub fn forward_target(&self) -> Option<&Locator> {
        self.forward.last()
    }

    /// Back entries, most recent last
    pub fn back_entries(&self) -> &[Locator] {
        &self.back
    }

    /// Forward entries, nearest last
    pub fn forward_entries(&self) -> &[Locator] {
        &self.forward
    }

    /// Commit a fresh navigation: the old current moves onto the back stack
    /// and the forward history is discarded.
    pub(crate) fn record(&mut self, locator: Locator) {
        if let Some(previous) = self.current.replace(locator) {
            self.back.push(previous);
        }
        self.forward.clear();
    }

    /// Commit a successful back navigation
    pub(crate) fn commit_back(&mut self) -> bool {
        match self.back.pop() {
            Some(target) => {
                if let Some(previous) = self.current.replace(target) {
                    self.forward.push(previous);
                }
                true
            }
            None => false,
        }
    }

    /// Commit a successful forward navigation
    pub(crate) fn commit_forward(&mut self) -> bool {
        match self.forward.pop() {
            Some(target) => {
                if let Some(previous) = self.current.replace(target) {
                    self.back.push(previous);
                }
                true
            }
            None => false,
        }
    }

    /// Drop both stacks. The current position is kept.
    pub(crate) fn clear(&mut self) {
        self.back.clear();
        self.forward.clear();
    }
}
