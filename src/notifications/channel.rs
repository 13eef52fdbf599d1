//! Typed Notification Channel
//!
//! One channel exists per payload type per bus. It owns the ordered list of
//! subscriptions and fans published payloads out to the live ones.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use log::{debug, trace};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::notifications::dispatch::DispatchStrategy;
use crate::notifications::error::NotificationResult;
use crate::notifications::subscription::{
    Action, Predicate, Revoke, Subscription, SubscriptionBuilder, SubscriptionRequest,
    SubscriptionToken,
};
use crate::notifications::Payload;

/// Delivery counters for a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Payloads published
    pub published: u64,

    /// Payloads handed to a dispatch strategy
    pub delivered: u64,

    /// Payloads rejected by a subscription filter
    pub filtered: u64,

    /// Subscriptions dropped because their weak receiver was gone
    pub pruned: u64,
}

#[derive(Default)]
struct StatCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    filtered: AtomicU64,
    pruned: AtomicU64,
}

struct ChannelInner<T> {
    subscriptions: Mutex<Vec<Subscription<T>>>,
    stats: StatCounters,
}

impl<T: Payload> Revoke for ChannelInner<T> {
    fn revoke(&self, id: Uuid) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        match subscriptions.iter().position(|s| s.id == id) {
            Some(index) => {
                subscriptions.remove(index);
                debug!("Revoked subscription {} on {}", id, std::any::type_name::<T>());
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: Uuid) -> bool {
        self.subscriptions.lock().iter().any(|s| s.id == id)
    }
}

/// Shared channel for payloads of type `T`
///
/// Cloning a channel yields another handle to the same subscription list.
pub struct Channel<T> {
    inner: Arc<ChannelInner<T>>,
}

impl<T: Payload> Channel<T> {
    /// Create a standalone channel. Channels obtained from a
    /// [`NotificationBus`](crate::notifications::NotificationBus) are shared per type.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                subscriptions: Mutex::new(Vec::new()),
                stats: StatCounters::default(),
            }),
        }
    }

    /// Subscribe a strongly held callback that accepts every payload
    pub fn subscribe<F>(&self, callback: F, strategy: DispatchStrategy) -> NotificationResult<SubscriptionToken>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.register(
            SubscriptionBuilder::new()
                .callback(callback)
                .accept_all()
                .strategy(strategy),
        )
    }

    /// Subscribe a strongly held callback guarded by `filter`
    pub fn subscribe_filtered<F, P>(
        &self,
        callback: F,
        filter: P,
        strategy: DispatchStrategy,
    ) -> NotificationResult<SubscriptionToken>
    where
        F: Fn(&T) + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.register(
            SubscriptionBuilder::new()
                .callback(callback)
                .filter(filter)
                .strategy(strategy),
        )
    }

    /// Subscribe a method of `receiver` without keeping `receiver` alive
    pub fn subscribe_weak<R, F>(
        &self,
        receiver: &Arc<R>,
        callback: F,
        strategy: DispatchStrategy,
    ) -> NotificationResult<SubscriptionToken>
    where
        R: Send + Sync + 'static,
        F: Fn(&R, &T) + Send + Sync + 'static,
    {
        self.register(
            SubscriptionBuilder::new()
                .strategy(strategy)
                .bind(receiver, crate::notifications::Retention::Weak)
                .callback(callback)
                .accept_all(),
        )
    }

    /// Register a fully described subscription
    pub fn register<S>(&self, request: S) -> NotificationResult<SubscriptionToken>
    where
        S: SubscriptionRequest<T>,
    {
        let spec = request.into_spec()?;
        let id = Uuid::new_v4();
        let retention = spec.delegate.retention();
        let strategy = format!("{:?}", spec.strategy);

        self.inner.subscriptions.lock().push(Subscription {
            id,
            delegate: spec.delegate,
            strategy: spec.strategy,
        });
        debug!(
            "Subscribed {} to {} ({:?}, {})",
            id,
            std::any::type_name::<T>(),
            retention,
            strategy
        );

        let inner: Arc<dyn Revoke> = self.inner.clone();
        let revoker: Weak<dyn Revoke> = Arc::downgrade(&inner);
        Ok(SubscriptionToken::new(id, revoker))
    }

    /// Publish a payload to every live subscription
    ///
    /// Subscriptions whose weak receiver has gone are removed before any
    /// delivery happens. Callbacks run after the subscription lock has been
    /// released, so they may subscribe, unsubscribe or publish themselves.
    pub fn publish(&self, payload: T) {
        let payload = Arc::new(payload);
        let stats = &self.inner.stats;
        stats.published.fetch_add(1, Ordering::Relaxed);

        let targets = self.live_targets();

        for (filter, action, strategy) in targets {
            if filter(&*payload) {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                strategy.deliver(action, Arc::clone(&payload));
            } else {
                stats.filtered.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Resolve every subscription under the lock, pruning the dead ones
    fn live_targets(&self) -> Vec<(Predicate<T>, Action<T>, DispatchStrategy)> {
        let mut subscriptions = self.inner.subscriptions.lock();
        let mut targets = Vec::with_capacity(subscriptions.len());
        let before = subscriptions.len();

        subscriptions.retain(|subscription| match subscription.delegate.resolve() {
            Some((filter, action)) => {
                targets.push((filter, action, subscription.strategy.clone()));
                true
            }
            None => {
                trace!("Pruning subscription {} with released receiver", subscription.id);
                false
            }
        });

        let pruned = before - subscriptions.len();
        if pruned > 0 {
            self.inner.stats.pruned.fetch_add(pruned as u64, Ordering::Relaxed);
            debug!("Pruned {} dead subscription(s) from {}", pruned, std::any::type_name::<T>());
        }
        targets
    }

    /// Remove a subscription. Unknown or already removed tokens are ignored.
    pub fn unsubscribe(&self, token: &SubscriptionToken) -> bool {
        self.inner.revoke(token.id())
    }

    /// Whether `token` is registered on this channel
    pub fn contains(&self, token: &SubscriptionToken) -> bool {
        self.inner.contains(token.id())
    }

    /// Number of registered subscriptions, including any not yet pruned
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// Remove every subscription
    pub fn clear(&self) {
        let removed = {
            let mut subscriptions = self.inner.subscriptions.lock();
            let removed = subscriptions.len();
            subscriptions.clear();
            removed
        };
        debug!("Cleared {} subscription(s) from {}", removed, std::any::type_name::<T>());
    }

    /// Counters accumulated since the channel was created
    pub fn stats(&self) -> ChannelStats {
        let stats = &self.inner.stats;
        ChannelStats {
            published: stats.published.load(Ordering::Relaxed),
            delivered: stats.delivered.load(Ordering::Relaxed),
            filtered: stats.filtered.load(Ordering::Relaxed),
            pruned: stats.pruned.load(Ordering::Relaxed),
        }
    }
}

impl<T: Payload> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("payload", &std::any::type_name::<T>())
            .field("subscriptions", &self.inner.subscriptions.lock().len())
            .finish()
    }
}
