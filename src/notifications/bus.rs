//! Notification Bus
//!
//! Process- or scope-wide registry of typed channels. Components that never
//! reference each other meet here by agreeing on a payload type.

use std::any::{Any, TypeId};
use std::fmt;
use dashmap::DashMap;
use log::debug;

use crate::notifications::channel::Channel;
use crate::notifications::Payload;

/// Registry mapping each payload type to its shared channel
#[derive(Default)]
pub struct NotificationBus {
    channels: DashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl NotificationBus {
    /// Create a new, empty bus
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Get the channel for `T`, creating it on first use.
    ///
    /// Concurrent first lookups create exactly one channel: creation happens
    /// under the map's entry lock.
    pub fn channel<T: Payload>(&self) -> Channel<T> {
        let entry = self
            .channels
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!("Creating notification channel for {}", std::any::type_name::<T>());
                Box::new(Channel::<T>::new())
            });

        match entry.value().downcast_ref::<Channel<T>>() {
            Some(channel) => channel.clone(),
            None => unreachable!("channel registry is keyed by payload TypeId"),
        }
    }

    /// Publish on the channel for `T`
    pub fn publish<T: Payload>(&self, payload: T) {
        self.channel::<T>().publish(payload);
    }

    /// Number of channels created so far
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("channels", &self.channels.len())
            .finish()
    }
}
