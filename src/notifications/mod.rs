//! Typed Publish/Subscribe Notification Bus
//!
//! In-process, type-keyed pub/sub for communication between components that
//! should not know about each other (view models, background loaders, shell
//! chrome).
//!
//! # Architecture
//!
//! - **NotificationBus**: one shared [`Channel`] per payload type
//! - **Channel**: ordered subscriptions, publish fan-out, pruning of dead ones
//! - **Subscription**: callback + filter under a [`Retention`] policy
//! - **DispatchStrategy**: where the callback runs (inline, captured context, background)
//!
//! # Example Usage
//!
//! ```no_run
//! use appshell::notifications::{DispatchStrategy, NotificationBus};
//!
//! #[derive(Debug, Clone)]
//! struct CustomerSaved { id: u64 }
//!
//! let bus = NotificationBus::new();
//! let channel = bus.channel::<CustomerSaved>();
//! let token = channel
//!     .subscribe(|event| println!("saved {}", event.id), DispatchStrategy::Synchronous)
//!     .unwrap();
//!
//! bus.publish(CustomerSaved { id: 7 });
//! token.revoke();
//! ```

pub mod bus;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod subscription;

#[cfg(test)]
mod tests;

pub use bus::NotificationBus;
pub use channel::{Channel, ChannelStats};
pub use dispatch::{ContextHandle, DispatchContext, DispatchStrategy};
pub use error::{NotificationError, NotificationResult};
pub use subscription::{
    BoundSubscriptionBuilder, Retention, SubscriptionBuilder, SubscriptionGuard,
    SubscriptionRequest, SubscriptionSpec, SubscriptionToken,
};

/// Marker for types that can travel over the bus
pub trait Payload: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Payload for T {}
