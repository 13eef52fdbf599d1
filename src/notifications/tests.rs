//! Tests for the Notification Bus

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use crate::notifications::{
    Channel, DispatchContext, DispatchStrategy, NotificationBus, NotificationError, Retention,
    SubscriptionBuilder, SubscriptionToken,
};

#[derive(Debug, Clone, PartialEq)]
struct OrderPlaced {
    order_id: u32,
    region: &'static str,
}

impl OrderPlaced {
    fn new(order_id: u32, region: &'static str) -> Self {
        Self { order_id, region }
    }
}

/// Receiver standing in for a view model that listens to the bus
struct OrderListViewModel {
    received: Mutex<Vec<u32>>,
}

impl OrderListViewModel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
        })
    }

    fn on_order_placed(&self, event: &OrderPlaced) {
        self.received.lock().unwrap().push(event.order_id);
    }

    fn received(&self) -> Vec<u32> {
        self.received.lock().unwrap().clone()
    }
}

fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(&OrderPlaced) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    (seen, move |event: &OrderPlaced| seen_clone.lock().unwrap().push(event.order_id))
}

#[test]
fn test_channel_is_shared_per_payload_type() {
    let bus = NotificationBus::new();
    let first = bus.channel::<OrderPlaced>();
    let second = bus.channel::<OrderPlaced>();

    let (seen, callback) = recorder();
    first.subscribe(callback, DispatchStrategy::Synchronous).unwrap();
    second.publish(OrderPlaced::new(1, "north"));

    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert_eq!(bus.channel_count(), 1);

    bus.channel::<String>();
    assert_eq!(bus.channel_count(), 2);
}

#[test]
fn test_concurrent_first_lookup_creates_one_channel() {
    let bus = Arc::new(NotificationBus::new());
    let barrier = Arc::new(Barrier::new(8));
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bus = Arc::clone(&bus);
            let barrier = Arc::clone(&barrier);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                barrier.wait();
                let channel = bus.channel::<OrderPlaced>();
                channel
                    .subscribe(
                        move |_| {
                            counter.fetch_add(1, Ordering::SeqCst);
                        },
                        DispatchStrategy::Synchronous,
                    )
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(bus.channel_count(), 1);
    assert_eq!(bus.channel::<OrderPlaced>().subscription_count(), 8);

    bus.publish(OrderPlaced::new(1, "east"));
    assert_eq!(counter.load(Ordering::SeqCst), 8);
}

#[test]
fn test_weak_subscription_is_pruned_after_receiver_drops() {
    let channel = Channel::<OrderPlaced>::new();
    let view_model = OrderListViewModel::new();

    let token = channel
        .subscribe_weak(&view_model, OrderListViewModel::on_order_placed, DispatchStrategy::Synchronous)
        .unwrap();

    channel.publish(OrderPlaced::new(1, "north"));
    assert_eq!(view_model.received(), vec![1]);

    let watcher = Arc::downgrade(&view_model);
    drop(view_model);
    assert!(watcher.upgrade().is_none(), "subscription must not keep the receiver alive");

    channel.publish(OrderPlaced::new(2, "north"));

    assert!(!channel.contains(&token));
    assert!(!token.is_active());
    assert_eq!(channel.subscription_count(), 0);
    assert_eq!(channel.stats().pruned, 1);
    assert_eq!(channel.stats().delivered, 1);
}

#[test]
fn test_strong_subscription_keeps_receiver_alive() {
    let channel = Channel::<OrderPlaced>::new();
    let view_model = OrderListViewModel::new();
    let watcher = Arc::downgrade(&view_model);

    channel
        .register(
            SubscriptionBuilder::new()
                .bind(&view_model, Retention::Strong)
                .callback(OrderListViewModel::on_order_placed)
                .accept_all(),
        )
        .unwrap();
    drop(view_model);

    channel.publish(OrderPlaced::new(5, "south"));

    let view_model = watcher.upgrade().expect("strong subscription retains its receiver");
    assert_eq!(view_model.received(), vec![5]);
}

#[test]
fn test_closure_subscription_is_always_delivered() {
    let channel = Channel::<OrderPlaced>::new();
    let (seen, callback) = recorder();

    channel.subscribe(callback, DispatchStrategy::Synchronous).unwrap();
    for id in 0..3 {
        channel.publish(OrderPlaced::new(id, "west"));
    }

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_filter_is_reevaluated_on_every_publish() {
    let channel = Channel::<OrderPlaced>::new();
    let (seen, callback) = recorder();

    let token = channel
        .subscribe_filtered(callback, |event| event.region == "north", DispatchStrategy::Synchronous)
        .unwrap();

    channel.publish(OrderPlaced::new(1, "south"));
    assert!(seen.lock().unwrap().is_empty());
    assert!(channel.contains(&token));

    channel.publish(OrderPlaced::new(2, "north"));
    assert_eq!(*seen.lock().unwrap(), vec![2]);
    assert_eq!(channel.stats().filtered, 1);
}

#[test]
fn test_weak_filter_sees_receiver_state() {
    struct RegionFilter {
        region: &'static str,
        hits: AtomicUsize,
    }

    let channel = Channel::<OrderPlaced>::new();
    let receiver = Arc::new(RegionFilter {
        region: "east",
        hits: AtomicUsize::new(0),
    });

    channel
        .register(
            SubscriptionBuilder::new()
                .bind(&receiver, Retention::Weak)
                .callback(|r: &RegionFilter, _| {
                    r.hits.fetch_add(1, Ordering::SeqCst);
                })
                .filter(|r: &RegionFilter, event: &OrderPlaced| event.region == r.region),
        )
        .unwrap();

    channel.publish(OrderPlaced::new(1, "east"));
    channel.publish(OrderPlaced::new(2, "west"));
    assert_eq!(receiver.hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_revoke_twice_is_harmless() {
    let channel = Channel::<OrderPlaced>::new();
    let (seen, callback) = recorder();
    let token = channel.subscribe(callback, DispatchStrategy::Synchronous).unwrap();
    let (_, other) = recorder();
    let keeper = channel.subscribe(other, DispatchStrategy::Synchronous).unwrap();

    assert!(token.revoke());
    assert!(!token.revoke());
    assert!(!channel.unsubscribe(&token));

    assert_eq!(channel.subscription_count(), 1);
    assert!(channel.contains(&keeper));

    channel.publish(OrderPlaced::new(1, "north"));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_unsubscribe_unknown_token_is_noop() {
    let first = Channel::<OrderPlaced>::new();
    let second = Channel::<OrderPlaced>::new();
    let token = first.subscribe(|_| {}, DispatchStrategy::Synchronous).unwrap();

    assert!(!second.unsubscribe(&token));
    assert!(!second.contains(&token));
    assert!(first.contains(&token));
}

#[test]
fn test_missing_filter_is_invalid_argument() {
    let channel = Channel::<OrderPlaced>::new();
    let result = channel.register(SubscriptionBuilder::new().callback(|_: &OrderPlaced| {}));

    assert_eq!(result.err(), Some(NotificationError::invalid_argument("filter")));
    assert_eq!(channel.subscription_count(), 0);
}

#[test]
fn test_synchronous_delivery_follows_registration_order() {
    let channel = Channel::<OrderPlaced>::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        channel
            .subscribe(move |_| order.lock().unwrap().push(label), DispatchStrategy::Synchronous)
            .unwrap();
    }
    channel.publish(OrderPlaced::new(1, "north"));

    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_callback_may_unsubscribe_itself_and_publish() {
    let channel = Channel::<OrderPlaced>::new();
    let token_slot: Arc<Mutex<Option<SubscriptionToken>>> = Arc::new(Mutex::new(None));
    let calls = Arc::new(AtomicUsize::new(0));

    let slot = Arc::clone(&token_slot);
    let calls_clone = Arc::clone(&calls);
    let republish = channel.clone();
    let token = channel
        .subscribe(
            move |event: &OrderPlaced| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                if let Some(token) = slot.lock().unwrap().take() {
                    token.revoke();
                }
                if event.order_id == 1 {
                    republish.publish(OrderPlaced::new(2, event.region));
                }
            },
            DispatchStrategy::Synchronous,
        )
        .unwrap();
    *token_slot.lock().unwrap() = Some(token.clone());

    channel.publish(OrderPlaced::new(1, "north"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!channel.contains(&token));
}

#[test]
fn test_guard_revokes_on_drop() {
    let channel = Channel::<OrderPlaced>::new();
    let (seen, callback) = recorder();

    {
        let _guard = channel
            .subscribe(callback, DispatchStrategy::Synchronous)
            .unwrap()
            .into_guard();
        channel.publish(OrderPlaced::new(1, "north"));
    }
    channel.publish(OrderPlaced::new(2, "north"));

    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert_eq!(channel.subscription_count(), 0);
}

#[test]
fn test_detached_guard_keeps_subscription() {
    let channel = Channel::<OrderPlaced>::new();
    let guard = channel
        .subscribe(|_| {}, DispatchStrategy::Synchronous)
        .unwrap()
        .into_guard();

    let token = guard.detach().unwrap();
    assert!(channel.contains(&token));
}

#[test]
fn test_context_strategy_defers_to_owning_loop() {
    let channel = Channel::<OrderPlaced>::new();
    let ui = DispatchContext::new("ui");
    let (seen, callback) = recorder();

    channel
        .subscribe(callback, DispatchStrategy::Context(ui.handle()))
        .unwrap();
    channel.publish(OrderPlaced::new(1, "north"));
    channel.publish(OrderPlaced::new(2, "north"));

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(ui.run_pending(), 2);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_queued_weak_delivery_does_not_retain_receiver() {
    let channel: Channel<OrderPlaced> = Channel::new();
    let ui = DispatchContext::new("ui");
    let view_model = OrderListViewModel::new();
    let released = Arc::downgrade(&view_model);

    let token = channel
        .register(
            SubscriptionBuilder::new()
                .strategy(DispatchStrategy::Context(ui.handle()))
                .bind(&view_model, Retention::Weak)
                .callback(OrderListViewModel::on_order_placed)
                .accept_all(),
        )
        .unwrap();

    channel.publish(OrderPlaced::new(5, "west"));
    assert_eq!(ui.pending(), 1);

    drop(view_model);
    assert!(released.upgrade().is_none());

    assert_eq!(ui.run_pending(), 1);
    channel.publish(OrderPlaced::new(6, "west"));
    assert!(!channel.contains(&token));
}

#[test]
fn test_context_strategy_across_threads() {
    let bus = Arc::new(NotificationBus::new());
    let ui = DispatchContext::new("ui");
    let ui_thread = thread::current().id();
    let delivered_on = Arc::new(Mutex::new(None));

    let delivered_clone = Arc::clone(&delivered_on);
    bus.channel::<OrderPlaced>()
        .subscribe(
            move |_| *delivered_clone.lock().unwrap() = Some(thread::current().id()),
            DispatchStrategy::Context(ui.handle()),
        )
        .unwrap();

    let publisher = Arc::clone(&bus);
    thread::spawn(move || publisher.publish(OrderPlaced::new(9, "north")))
        .join()
        .unwrap();

    assert!(ui.run_next(Duration::from_secs(5)));
    assert_eq!(*delivered_on.lock().unwrap(), Some(ui_thread));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_strategy_delivers_on_runtime() {
    let channel = Channel::<OrderPlaced>::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    channel
        .subscribe(
            move |event: &OrderPlaced| {
                let _ = tx.send(event.order_id);
            },
            DispatchStrategy::Background,
        )
        .unwrap();
    channel.publish(OrderPlaced::new(3, "north"));

    let received = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(received, Some(3));
}

#[test]
fn test_concurrent_publish_and_revoke() {
    let channel = Channel::<OrderPlaced>::new();
    let tokens: Vec<_> = (0..32)
        .map(|_| channel.subscribe(|_| {}, DispatchStrategy::Synchronous).unwrap())
        .collect();

    let publisher = channel.clone();
    let publish_thread = thread::spawn(move || {
        for id in 0..200 {
            publisher.publish(OrderPlaced::new(id, "north"));
        }
    });
    let revoke_thread = thread::spawn(move || {
        for token in tokens {
            token.revoke();
        }
    });

    publish_thread.join().unwrap();
    revoke_thread.join().unwrap();
    assert_eq!(channel.subscription_count(), 0);
    assert_eq!(channel.stats().published, 200);
}

#[test]
fn test_clear_removes_everything() {
    let channel = Channel::<OrderPlaced>::new();
    let token = channel.subscribe(|_| {}, DispatchStrategy::Synchronous).unwrap();
    channel.clear();

    assert!(!channel.contains(&token));
    assert!(!token.revoke());
}
