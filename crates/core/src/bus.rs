use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

/// Per-asset replay buffer capacity. The first events up to this count are
/// retained; once full, later events are delivered but not recorded.
pub const EVENT_BUFFER_CAPACITY: usize = 1000;

/// Subscriber callback. Receives the asset id and the published event.
pub type Callback = Rc<dyn Fn(&str, &Event)>;

/// A published event: kind, wall-clock timestamp, and JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub kind: String,
    pub timestamp_ms: u64,
    pub payload: Value,
}

/// Composite subscription key. Kind and asset id stay separate fields so an
/// asset identifier can never collide with an event name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SubscriptionKey {
    kind: String,
    asset_id: String,
}

/// Synchronous publish/subscribe bus with bounded per-asset replay.
///
/// Single-threaded by design: callbacks run inline on the publishing call.
/// Delivery is strict FIFO per (kind, asset id); there is no ordering
/// guarantee across assets. Callbacks may re-enter the bus — iteration
/// always happens over a snapshot, so the live subscriber list is never
/// held across a callback invocation.
#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<HashMap<SubscriptionKey, Vec<Callback>>>,
    buffers: RefCell<HashMap<String, Vec<Rc<Event>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under every (kind, asset id) pair.
    ///
    /// With `replay`, every buffered event for the asset whose kind is in
    /// `kinds` is delivered synchronously in original insertion order before
    /// the callback is registered, so replayed events always precede any
    /// live event seen by this subscriber.
    pub fn subscribe(&self, kinds: &[&str], asset_id: &str, callback: Callback, replay: bool) {
        if replay {
            let buffered: Vec<Rc<Event>> = self
                .buffers
                .borrow()
                .get(asset_id)
                .cloned()
                .unwrap_or_default();
            for event in buffered {
                if kinds.contains(&event.kind.as_str()) {
                    run_isolated(asset_id, &event, &callback);
                }
            }
        }

        let mut subscribers = self.subscribers.borrow_mut();
        for kind in kinds {
            let key = SubscriptionKey {
                kind: (*kind).to_string(),
                asset_id: asset_id.to_string(),
            };
            subscribers.entry(key).or_default().push(callback.clone());
        }
    }

    /// Publish an event to every subscriber of (kind, asset id).
    ///
    /// The event is appended to the asset's replay buffer only while the
    /// buffer holds fewer than [`EVENT_BUFFER_CAPACITY`] events. Callbacks
    /// are then invoked synchronously in subscription order; a failing
    /// callback is swallowed and never prevents the remaining ones from
    /// running or propagates to the publisher.
    pub fn publish(&self, kind: &str, asset_id: &str, payload: Value) {
        let event = Rc::new(Event {
            kind: kind.to_string(),
            timestamp_ms: now_ms(),
            payload,
        });

        {
            let mut buffers = self.buffers.borrow_mut();
            let buffer = buffers.entry(asset_id.to_string()).or_default();
            if buffer.len() < EVENT_BUFFER_CAPACITY {
                buffer.push(event.clone());
            }
        }

        let key = SubscriptionKey {
            kind: kind.to_string(),
            asset_id: asset_id.to_string(),
        };
        let snapshot: Vec<Callback> = self
            .subscribers
            .borrow()
            .get(&key)
            .cloned()
            .unwrap_or_default();

        for callback in snapshot {
            run_isolated(asset_id, &event, &callback);
        }
    }

    /// Number of events buffered for an asset.
    pub fn buffered_len(&self, asset_id: &str) -> usize {
        self.buffers
            .borrow()
            .get(asset_id)
            .map_or(0, |events| events.len())
    }
}

fn run_isolated(asset_id: &str, event: &Event, callback: &Callback) {
    let outcome = catch_unwind(AssertUnwindSafe(|| callback(asset_id, event)));
    if outcome.is_err() {
        tracing::debug!(asset_id, kind = %event.kind, "subscriber callback failed");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<(String, String)>>>, Callback) {
        let seen: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let callback: Callback = Rc::new(move |uid, event: &Event| {
            sink.borrow_mut()
                .push((event.kind.clone(), uid.to_string()));
        });
        (seen, callback)
    }

    #[test]
    fn delivers_in_publish_order() {
        let bus = EventBus::new();
        let (seen, callback) = recorder();
        bus.subscribe(&["start", "stop"], "ad1", callback, false);
        bus.publish("start", "ad1", Value::Null);
        bus.publish("stop", "ad1", Value::Null);
        bus.publish("start", "ad2", Value::Null); // different asset, no subscriber
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "start");
        assert_eq!(seen[1].0, "stop");
    }

    #[test]
    fn replay_precedes_live_delivery() {
        let bus = EventBus::new();
        bus.publish("check", "ad1", Value::from(1));
        bus.publish("check", "ad1", Value::from(2));
        bus.publish("other", "ad1", Value::from(3));

        let seen: Rc<RefCell<Vec<i64>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let callback: Callback = Rc::new(move |_uid, event: &Event| {
            if let Some(n) = event.payload.as_i64() {
                sink.borrow_mut().push(n);
            }
        });
        bus.subscribe(&["check"], "ad1", callback, true);
        bus.publish("check", "ad1", Value::from(4));

        // Buffered "check" events replayed in insertion order, "other"
        // filtered out, live event last.
        assert_eq!(*seen.borrow(), vec![1, 2, 4]);
    }

    #[test]
    fn buffer_stops_at_capacity_but_delivery_continues() {
        let bus = EventBus::new();
        let (seen, callback) = recorder();
        bus.subscribe(&["tick"], "ad1", callback, false);
        for _ in 0..EVENT_BUFFER_CAPACITY + 1 {
            bus.publish("tick", "ad1", Value::Null);
        }
        assert_eq!(bus.buffered_len("ad1"), EVENT_BUFFER_CAPACITY);
        assert_eq!(seen.borrow().len(), EVENT_BUFFER_CAPACITY + 1);
    }

    #[test]
    fn failing_callback_does_not_stop_delivery() {
        let bus = EventBus::new();
        let panicking: Callback = Rc::new(|_uid, _event: &Event| panic!("boom"));
        let (seen, callback) = recorder();
        bus.subscribe(&["check"], "ad1", panicking, false);
        bus.subscribe(&["check"], "ad1", callback, false);
        bus.publish("check", "ad1", Value::Null);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn reentrant_publish_from_callback() {
        let bus = Rc::new(EventBus::new());
        let (seen, recorder_cb) = recorder();

        let bus_inner = bus.clone();
        let chained: Callback = Rc::new(move |_uid, event: &Event| {
            if event.kind == "first" {
                bus_inner.publish("second", "ad1", Value::Null);
            }
        });
        bus.subscribe(&["first"], "ad1", chained, false);
        bus.subscribe(&["first", "second"], "ad1", recorder_cb, false);

        bus.publish("first", "ad1", Value::Null);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "second"); // chained publish completes first
        assert_eq!(seen[1].0, "first");
    }
}
