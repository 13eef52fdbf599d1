//! Subscriptions, Retention and Revocation Tokens
//!
//! A subscription pairs a callback with a filter. Both are held under one
//! retention policy: strongly, keeping whatever they capture alive, or weakly
//! through a `Weak<R>` to the receiving object, in which case the
//! subscription dies quietly once the receiver is dropped elsewhere.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use log::trace;
use uuid::Uuid;

use crate::notifications::dispatch::DispatchStrategy;
use crate::notifications::error::{NotificationError, NotificationResult};
use crate::notifications::Payload;

/// Callback resolved for one delivery
pub(crate) type Action<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Filter resolved for one delivery
pub(crate) type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

type ReceiverAction<R, T> = Arc<dyn Fn(&R, &T) + Send + Sync>;
type ReceiverPredicate<R, T> = Arc<dyn Fn(&R, &T) -> bool + Send + Sync>;

/// Whether a subscription keeps its receiver alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Retention {
    #[default]
    Strong,
    /// Held through `Weak<R>`; upgraded only while a filter or callback runs
    Weak,
}

/// Callback and filter of one subscription, under its retention policy
pub(crate) enum Delegate<T> {
    Strong {
        callback: Action<T>,
        filter: Predicate<T>,
    },
    Weak {
        resolve: Box<dyn Fn() -> Option<(Predicate<T>, Action<T>)> + Send + Sync>,
    },
}

impl<T: Payload> Delegate<T> {
    /// Produce delivery-scoped handles, or `None` once a weak receiver is gone
    pub(crate) fn resolve(&self) -> Option<(Predicate<T>, Action<T>)> {
        match self {
            Delegate::Strong { callback, filter } => {
                Some((Arc::clone(filter), Arc::clone(callback)))
            }
            Delegate::Weak { resolve } => resolve(),
        }
    }

    pub(crate) fn retention(&self) -> Retention {
        match self {
            Delegate::Strong { .. } => Retention::Strong,
            Delegate::Weak { .. } => Retention::Weak,
        }
    }
}

/// A validated request ready to be attached to a channel
pub struct SubscriptionSpec<T> {
    pub(crate) delegate: Delegate<T>,
    pub(crate) strategy: DispatchStrategy,
}

/// Anything that can be turned into a subscription
pub trait SubscriptionRequest<T: Payload> {
    /// Validate the request. Fails when the callback or filter is missing.
    fn into_spec(self) -> NotificationResult<SubscriptionSpec<T>>;
}

/// Builder for subscriptions whose closures own their captures
///
/// Closure subscriptions are always strongly retained. Use
/// [`SubscriptionBuilder::bind`] to attach the callback to a receiver that
/// may be held weakly.
pub struct SubscriptionBuilder<T> {
    callback: Option<Action<T>>,
    filter: Option<Predicate<T>>,
    strategy: DispatchStrategy,
}

impl<T: Payload> SubscriptionBuilder<T> {
    pub fn new() -> Self {
        Self {
            callback: None,
            filter: None,
            strategy: DispatchStrategy::Synchronous,
        }
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn filter<P>(mut self, filter: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Use a filter that accepts every payload
    pub fn accept_all(self) -> Self {
        self.filter(|_| true)
    }

    pub fn strategy(mut self, strategy: DispatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Switch to a builder whose callback and filter receive `receiver`
    pub fn bind<R>(self, receiver: &Arc<R>, retention: Retention) -> BoundSubscriptionBuilder<T, R>
    where
        R: Send + Sync + 'static,
    {
        BoundSubscriptionBuilder {
            receiver: Arc::clone(receiver),
            retention,
            callback: None,
            filter: None,
            strategy: self.strategy,
        }
    }
}

impl<T: Payload> Default for SubscriptionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload> SubscriptionRequest<T> for SubscriptionBuilder<T> {
    fn into_spec(self) -> NotificationResult<SubscriptionSpec<T>> {
        let callback = self.callback.ok_or(NotificationError::invalid_argument("callback"))?;
        let filter = self.filter.ok_or(NotificationError::invalid_argument("filter"))?;
        Ok(SubscriptionSpec {
            delegate: Delegate::Strong { callback, filter },
            strategy: self.strategy,
        })
    }
}

/// Builder for subscriptions bound to a receiving object
///
/// Callback and filter share the receiver and therefore its retention.
pub struct BoundSubscriptionBuilder<T, R> {
    receiver: Arc<R>,
    retention: Retention,
    callback: Option<ReceiverAction<R, T>>,
    filter: Option<ReceiverPredicate<R, T>>,
    strategy: DispatchStrategy,
}

impl<T, R> BoundSubscriptionBuilder<T, R>
where
    T: Payload,
    R: Send + Sync + 'static,
{
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&R, &T) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn filter<P>(mut self, filter: P) -> Self
    where
        P: Fn(&R, &T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn accept_all(self) -> Self {
        self.filter(|_, _| true)
    }

    pub fn strategy(mut self, strategy: DispatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

impl<T, R> SubscriptionRequest<T> for BoundSubscriptionBuilder<T, R>
where
    T: Payload,
    R: Send + Sync + 'static,
{
    fn into_spec(self) -> NotificationResult<SubscriptionSpec<T>> {
        let callback = self.callback.ok_or(NotificationError::invalid_argument("callback"))?;
        let filter = self.filter.ok_or(NotificationError::invalid_argument("filter"))?;

        let delegate = match self.retention {
            Retention::Strong => {
                let receiver = Arc::clone(&self.receiver);
                let filter_receiver = self.receiver;
                Delegate::Strong {
                    callback: Arc::new(move |payload: &T| callback(&*receiver, payload)),
                    filter: Arc::new(move |payload: &T| filter(&*filter_receiver, payload)),
                }
            }
            Retention::Weak => {
                let weak = Arc::downgrade(&self.receiver);
                drop(self.receiver);
                Delegate::Weak {
                    resolve: Box::new(move || bind_weak(&weak, &callback, &filter)),
                }
            }
        };

        Ok(SubscriptionSpec {
            delegate,
            strategy: self.strategy,
        })
    }
}

/// Upgrade a weak receiver into delivery-scoped closures.
///
/// The filter holds the receiver for the duration of one publish. The
/// callback keeps only the `Weak` and upgrades when it runs, so a job queued
/// on a dispatch context never extends the receiver's lifetime.
fn bind_weak<R, T>(
    weak: &Weak<R>,
    callback: &ReceiverAction<R, T>,
    filter: &ReceiverPredicate<R, T>,
) -> Option<(Predicate<T>, Action<T>)>
where
    R: Send + Sync + 'static,
    T: Payload,
{
    let filter_receiver = weak.upgrade()?;
    let callback_receiver = weak.clone();
    let callback = Arc::clone(callback);
    let filter = Arc::clone(filter);
    Some((
        Arc::new(move |payload: &T| filter(&*filter_receiver, payload)),
        Arc::new(move |payload: &T| match callback_receiver.upgrade() {
            Some(receiver) => callback(&*receiver, payload),
            None => trace!("Receiver released before delivery ran"),
        }),
    ))
}

/// A subscription registered on a channel
pub(crate) struct Subscription<T> {
    pub(crate) id: Uuid,
    pub(crate) delegate: Delegate<T>,
    pub(crate) strategy: DispatchStrategy,
}

/// Channel side of a token's revoke action
pub(crate) trait Revoke: Send + Sync {
    fn revoke(&self, id: Uuid) -> bool;
    fn contains(&self, id: Uuid) -> bool;
}

/// Identifies one subscription and can revoke it
///
/// Tokens hold only a weak reference to their channel, so a token never
/// keeps a channel alive. Revoking is idempotent.
#[derive(Clone)]
pub struct SubscriptionToken {
    id: Uuid,
    channel: Weak<dyn Revoke>,
}

impl SubscriptionToken {
    pub(crate) fn new(id: Uuid, channel: Weak<dyn Revoke>) -> Self {
        Self { id, channel }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remove the subscription. Returns `true` only for the call that removed it.
    pub fn revoke(&self) -> bool {
        match self.channel.upgrade() {
            Some(channel) => channel.revoke(self.id),
            None => false,
        }
    }

    /// Whether the subscription is still registered
    pub fn is_active(&self) -> bool {
        self.channel
            .upgrade()
            .map(|channel| channel.contains(self.id))
            .unwrap_or(false)
    }

    /// Tie the subscription to a scope: dropping the guard revokes it
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { token: Some(self) }
    }
}

impl PartialEq for SubscriptionToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriptionToken {}

impl Hash for SubscriptionToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubscriptionToken").field(&self.id).finish()
    }
}

/// Revokes its subscription when dropped
#[derive(Debug)]
pub struct SubscriptionGuard {
    token: Option<SubscriptionToken>,
}

impl SubscriptionGuard {
    pub fn token(&self) -> Option<&SubscriptionToken> {
        self.token.as_ref()
    }

    /// Keep the subscription registered after the guard goes away
    pub fn detach(mut self) -> Option<SubscriptionToken> {
        self.token.take()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.revoke();
        }
    }
}
