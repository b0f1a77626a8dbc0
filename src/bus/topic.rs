//! Topic state and delivery
//!
//! A topic owns an immediate registry, a delayed registry and a single
//! replay slot holding the last payload passed to
//! [`publish_delayed`](Topic::publish_delayed).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::address::Address;
use crate::config::BusConfig;
use crate::error::Result;
use crate::listener::{
    dispatch, Listener, ListenerRegistry, Registration, SubscriptionId, SubscriptionIds,
};

/// Statistics for a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicStats {
    /// Number of immediate listeners
    pub immediate_listeners: usize,
    /// Number of delayed listeners
    pub delayed_listeners: usize,
    /// Whether a delayed payload is held for replay
    pub has_replay: bool,
    /// Number of immediate publishes
    pub publish_count: u64,
    /// Number of delayed publishes
    pub delayed_publish_count: u64,
}

struct TopicState<P> {
    immediate: ListenerRegistry<P>,
    delayed: ListenerRegistry<P>,
    replay: Option<Arc<P>>,
    publish_count: u64,
    delayed_publish_count: u64,
}

/// A named topic within a channel
pub struct Topic<P> {
    channel: String,
    name: String,
    config: BusConfig,
    ids: SubscriptionIds,
    state: Mutex<TopicState<P>>,
}

impl<P> Topic<P> {
    pub(super) fn new(
        channel: &str,
        name: &str,
        config: BusConfig,
        ids: SubscriptionIds,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            name: name.to_string(),
            config,
            ids,
            state: Mutex::new(TopicState {
                immediate: ListenerRegistry::new(),
                delayed: ListenerRegistry::new(),
                replay: None,
                publish_count: 0,
                delayed_publish_count: 0,
            }),
        }
    }

    /// Topic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the channel this topic was created in
    pub fn channel_name(&self) -> &str {
        &self.channel
    }

    /// Full `channel/topic` address
    pub fn address(&self) -> Address {
        Address {
            channel: self.channel.clone(),
            topic: self.name.clone(),
        }
    }

    /// Register an immediate listener
    ///
    /// A duplicate non-forced registration is silently ignored and returns the
    /// token of the existing entry.
    pub fn subscribe(&self, listener: &Listener<P>, registration: Registration) -> SubscriptionId {
        let registration = self.effective(registration);
        let mut state = self.lock_state();
        let registered = state.immediate.register(listener, registration, &self.ids);

        tracing::debug!(
            channel = %self.channel,
            topic = %self.name,
            subscription = %registered.id,
            inserted = registered.inserted,
            listeners = state.immediate.len(),
            "Listener subscribed"
        );

        registered.id
    }

    /// Register a delayed listener
    ///
    /// If a delayed payload has already been published, the listener is
    /// invoked with it before this call returns. The listener stays registered
    /// even if that replay fails.
    pub fn subscribe_delayed(
        &self,
        listener: &Listener<P>,
        registration: Registration,
    ) -> Result<SubscriptionId> {
        let registration = self.effective(registration);
        let (registered, replay) = {
            let mut state = self.lock_state();
            let registered = state.delayed.register(listener, registration, &self.ids);
            let replay = if self.config.replay_on_subscribe {
                state.replay.clone()
            } else {
                None
            };
            (registered, replay)
        };

        tracing::debug!(
            channel = %self.channel,
            topic = %self.name,
            subscription = %registered.id,
            inserted = registered.inserted,
            replay = replay.is_some(),
            "Delayed listener subscribed"
        );

        if let Some(payload) = replay {
            listener.call(&*payload)?;
        }

        Ok(registered.id)
    }

    /// Deliver a payload to every immediate listener in registration order
    ///
    /// Delivery stops at the first listener error, which is returned.
    pub fn publish(&self, payload: P) -> Result<()> {
        let listeners = {
            let mut state = self.lock_state();
            state.publish_count += 1;
            state.immediate.snapshot()
        };

        tracing::trace!(
            channel = %self.channel,
            topic = %self.name,
            listeners = listeners.len(),
            "Publishing"
        );

        dispatch(&listeners, &payload)?;
        Ok(())
    }

    /// Store a payload for replay and deliver it to every delayed listener
    ///
    /// The replay slot is written in the same critical section that snapshots
    /// the delayed registry, so a delayed subscriber racing with this call
    /// receives the payload either through delivery or through replay. The
    /// slot is overwritten even when no delayed listener is registered. When a
    /// listener fails and `replay_on_failed_delivery` is disabled, the previous
    /// payload is restored unless another publish has replaced it meanwhile.
    pub fn publish_delayed(&self, payload: P) -> Result<()> {
        let payload = Arc::new(payload);
        let (listeners, previous) = {
            let mut state = self.lock_state();
            state.delayed_publish_count += 1;
            let previous = state.replay.replace(Arc::clone(&payload));
            (state.delayed.snapshot(), previous)
        };

        tracing::trace!(
            channel = %self.channel,
            topic = %self.name,
            listeners = listeners.len(),
            "Publishing delayed"
        );

        let result = dispatch(&listeners, &*payload);

        if result.is_err() && !self.config.replay_on_failed_delivery {
            let mut state = self.lock_state();
            let unchanged = state
                .replay
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &payload));
            if unchanged {
                state.replay = previous;
            }
        }

        result?;
        Ok(())
    }

    /// Remove a registration from either registry
    ///
    /// Returns false if the token is unknown to this topic.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock_state();
        let removed = state.immediate.remove(id) || state.delayed.remove(id);

        if removed {
            tracing::debug!(
                channel = %self.channel,
                topic = %self.name,
                subscription = %id,
                "Listener unsubscribed"
            );
        }

        removed
    }

    /// The payload currently held for replay
    pub fn replay(&self) -> Option<Arc<P>> {
        self.lock_state().replay.clone()
    }

    /// Whether a delayed payload has been published
    pub fn has_replay(&self) -> bool {
        self.lock_state().replay.is_some()
    }

    /// Get topic statistics
    pub fn stats(&self) -> TopicStats {
        let state = self.lock_state();
        TopicStats {
            immediate_listeners: state.immediate.len(),
            delayed_listeners: state.delayed.len(),
            has_replay: state.replay.is_some(),
            publish_count: state.publish_count,
            delayed_publish_count: state.delayed_publish_count,
        }
    }

    fn effective(&self, registration: Registration) -> Registration {
        if self.config.deduplicate_listeners {
            registration
        } else {
            Registration::Forced
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TopicState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> std::fmt::Debug for Topic<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("channel", &self.channel)
            .field("name", &self.name)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BusError, ListenerError};

    type Log = Arc<Mutex<Vec<String>>>;

    fn topic(config: BusConfig) -> Topic<u32> {
        Topic::new("game", "score", config, SubscriptionIds::new())
    }

    fn recorder(log: &Log, tag: &'static str) -> Listener<u32> {
        let log = Arc::clone(log);
        Listener::infallible(move |v: &u32| log.lock().unwrap().push(format!("{tag}:{v}")))
    }

    fn failing() -> Listener<u32> {
        Listener::new(|_| Err(ListenerError::msg("listener failed")))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_publish_without_listeners() {
        let topic = topic(BusConfig::default());

        topic.publish(1).unwrap();

        assert_eq!(topic.stats().publish_count, 1);
        assert!(!topic.has_replay());
    }

    #[test]
    fn test_duplicate_subscribe_delivers_once() {
        let topic = topic(BusConfig::default());
        let log = Log::default();
        let listener = recorder(&log, "a");

        let first = topic.subscribe(&listener, Registration::Unique);
        let second = topic.subscribe(&listener, Registration::Unique);
        topic.publish(3).unwrap();

        assert_eq!(first, second);
        assert_eq!(entries(&log), vec!["a:3"]);
    }

    #[test]
    fn test_forced_subscribe_delivers_twice() {
        let topic = topic(BusConfig::default());
        let log = Log::default();
        let listener = recorder(&log, "a");

        topic.subscribe(&listener, Registration::Unique);
        topic.subscribe(&listener, Registration::Forced);
        topic.publish(3).unwrap();

        assert_eq!(entries(&log), vec!["a:3", "a:3"]);
    }

    #[test]
    fn test_deduplication_disabled() {
        let topic = topic(BusConfig::default().deduplicate_listeners(false));
        let log = Log::default();
        let listener = recorder(&log, "a");

        topic.subscribe(&listener, Registration::Unique);
        topic.subscribe(&listener, Registration::Unique);
        topic.publish(1).unwrap();

        assert_eq!(entries(&log), vec!["a:1", "a:1"]);
    }

    #[test]
    fn test_publish_order_is_registration_order() {
        let topic = topic(BusConfig::default());
        let log = Log::default();

        topic.subscribe(&recorder(&log, "l1"), Registration::Unique);
        topic.subscribe(&recorder(&log, "l2"), Registration::Unique);
        topic.subscribe(&recorder(&log, "l3"), Registration::Unique);
        topic.publish(1).unwrap();
        topic.publish(2).unwrap();

        assert_eq!(
            entries(&log),
            vec!["l1:1", "l2:1", "l3:1", "l1:2", "l2:2", "l3:2"]
        );
    }

    #[test]
    fn test_publish_fails_fast() {
        let topic = topic(BusConfig::default());
        let log = Log::default();

        topic.subscribe(&recorder(&log, "first"), Registration::Unique);
        topic.subscribe(&failing(), Registration::Unique);
        topic.subscribe(&recorder(&log, "last"), Registration::Unique);

        let err = topic.publish(9).unwrap_err();

        assert!(matches!(err, BusError::ListenerInvocation(_)));
        assert_eq!(entries(&log), vec!["first:9"]);
    }

    #[test]
    fn test_immediate_publish_skips_delayed_listeners() {
        let topic = topic(BusConfig::default());
        let log = Log::default();

        topic
            .subscribe_delayed(&recorder(&log, "delayed"), Registration::Unique)
            .unwrap();
        topic.publish(1).unwrap();

        assert!(entries(&log).is_empty());
        assert!(!topic.has_replay());
    }

    #[test]
    fn test_replay_on_subscribe() {
        let topic = topic(BusConfig::default());
        let log = Log::default();

        topic.publish_delayed(1).unwrap();
        topic
            .subscribe_delayed(&recorder(&log, "late"), Registration::Unique)
            .unwrap();

        assert_eq!(entries(&log), vec!["late:1"]);
    }

    #[test]
    fn test_replay_holds_latest_payload() {
        let topic = topic(BusConfig::default());
        let log = Log::default();

        topic.publish_delayed(1).unwrap();
        topic.publish_delayed(2).unwrap();
        topic
            .subscribe_delayed(&recorder(&log, "late"), Registration::Unique)
            .unwrap();

        assert_eq!(entries(&log), vec!["late:2"]);
        assert_eq!(topic.replay().as_deref(), Some(&2));
    }

    #[test]
    fn test_no_replay_before_first_delayed_publish() {
        let topic = topic(BusConfig::default());
        let log = Log::default();

        topic
            .subscribe_delayed(&recorder(&log, "early"), Registration::Unique)
            .unwrap();
        assert!(entries(&log).is_empty());

        topic.publish_delayed(4).unwrap();
        assert_eq!(entries(&log), vec!["early:4"]);
    }

    #[test]
    fn test_replay_disabled() {
        let topic = topic(BusConfig::default().replay_on_subscribe(false));
        let log = Log::default();

        topic.publish_delayed(1).unwrap();
        topic
            .subscribe_delayed(&recorder(&log, "late"), Registration::Unique)
            .unwrap();
        topic.publish_delayed(2).unwrap();

        assert_eq!(entries(&log), vec!["late:2"]);
    }

    #[test]
    fn test_duplicate_delayed_subscribe_still_replays() {
        let topic = topic(BusConfig::default());
        let log = Log::default();
        let listener = recorder(&log, "d");

        topic.subscribe_delayed(&listener, Registration::Unique).unwrap();
        topic.publish_delayed(1).unwrap();
        topic.subscribe_delayed(&listener, Registration::Unique).unwrap();
        topic.publish_delayed(2).unwrap();

        assert_eq!(entries(&log), vec!["d:1", "d:1", "d:2"]);
        assert_eq!(topic.stats().delayed_listeners, 1);
    }

    #[test]
    fn test_failed_replay_keeps_registration() {
        let topic = topic(BusConfig::default());

        topic.publish_delayed(1).unwrap();
        let err = topic
            .subscribe_delayed(&failing(), Registration::Unique)
            .unwrap_err();

        assert!(err.is_listener_error());
        assert_eq!(topic.stats().delayed_listeners, 1);
    }

    #[test]
    fn test_replay_updated_after_failed_delivery() {
        let topic = topic(BusConfig::default());
        let log = Log::default();

        topic.subscribe_delayed(&failing(), Registration::Unique).unwrap();
        topic
            .subscribe_delayed(&recorder(&log, "skipped"), Registration::Unique)
            .unwrap();

        assert!(topic.publish_delayed(5).is_err());
        assert!(entries(&log).is_empty());
        assert_eq!(topic.replay().as_deref(), Some(&5));
    }

    #[test]
    fn test_replay_kept_after_failed_delivery_when_disabled() {
        let topic = topic(BusConfig::default().replay_on_failed_delivery(false));

        topic.publish_delayed(1).unwrap();
        topic.subscribe_delayed(&failing(), Registration::Unique).unwrap_err();

        assert!(topic.publish_delayed(2).is_err());
        assert_eq!(topic.replay().as_deref(), Some(&1));
    }

    #[test]
    fn test_unsubscribe() {
        let topic = topic(BusConfig::default());
        let log = Log::default();

        let immediate = topic.subscribe(&recorder(&log, "i"), Registration::Unique);
        let delayed = topic
            .subscribe_delayed(&recorder(&log, "d"), Registration::Unique)
            .unwrap();

        assert!(topic.unsubscribe(immediate));
        assert!(topic.unsubscribe(delayed));
        assert!(!topic.unsubscribe(delayed));

        topic.publish(1).unwrap();
        topic.publish_delayed(1).unwrap();
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_listener_subscribing_during_publish() {
        let topic = Arc::new(topic(BusConfig::default()));
        let log = Log::default();
        let late = recorder(&log, "late");

        let inner = Arc::clone(&topic);
        let late_clone = late.clone();
        let subscriber = Listener::infallible(move |_: &u32| {
            inner.subscribe(&late_clone, Registration::Unique);
        });
        topic.subscribe(&subscriber, Registration::Unique);

        // The listener added mid-delivery only sees later publishes.
        topic.publish(1).unwrap();
        assert!(entries(&log).is_empty());

        topic.publish(2).unwrap();
        assert_eq!(entries(&log), vec!["late:2"]);
        assert_eq!(topic.stats().immediate_listeners, 2);
    }

    #[test]
    fn test_delayed_listener_subscribing_during_delayed_publish() {
        let topic = Arc::new(topic(BusConfig::default()));
        let log = Log::default();
        let late = recorder(&log, "late");

        let inner = Arc::clone(&topic);
        let late_clone = late.clone();
        let subscriber = Listener::new(move |_: &u32| {
            inner
                .subscribe_delayed(&late_clone, Registration::Unique)
                .map(|_| ())
                .map_err(ListenerError::new)
        });
        topic.subscribe_delayed(&subscriber, Registration::Unique).unwrap();

        // Not in the delivery snapshot, so it gets the payload once via replay.
        topic.publish_delayed(1).unwrap();
        assert_eq!(entries(&log), vec!["late:1"]);

        topic.publish_delayed(2).unwrap();
        assert_eq!(entries(&log), vec!["late:1", "late:2", "late:2"]);
        assert_eq!(topic.stats().delayed_listeners, 2);
    }

    #[test]
    fn test_delayed_subscribe_racing_delayed_publish() {
        use std::sync::Barrier;
        use std::thread;

        let topic = Arc::new(topic(BusConfig::default()));
        let log = Log::default();
        let barrier = Arc::new(Barrier::new(2));

        let gate = {
            let barrier = Arc::clone(&barrier);
            Listener::infallible(move |_: &u32| {
                barrier.wait();
                barrier.wait();
            })
        };
        topic.subscribe_delayed(&gate, Registration::Unique).unwrap();

        let publisher = {
            let topic = Arc::clone(&topic);
            thread::spawn(move || topic.publish_delayed(2))
        };

        // The publisher is now inside delivery with the lock released.
        barrier.wait();
        topic
            .subscribe_delayed(&recorder(&log, "late"), Registration::Unique)
            .unwrap();
        barrier.wait();

        publisher.join().unwrap().unwrap();
        assert_eq!(entries(&log), vec!["late:2"]);
        assert_eq!(topic.replay().as_deref(), Some(&2));
    }

    #[test]
    fn test_failed_delivery_does_not_restore_over_newer_payload() {
        let topic = Arc::new(topic(BusConfig::default().replay_on_failed_delivery(false)));

        let inner = Arc::clone(&topic);
        let republisher = Listener::new(move |v: &u32| {
            if *v == 1 {
                inner.publish_delayed(2).map_err(ListenerError::new)?;
                return Err(ListenerError::msg("rejected"));
            }
            Ok(())
        });
        topic.subscribe_delayed(&republisher, Registration::Unique).unwrap();

        assert!(topic.publish_delayed(1).is_err());
        assert_eq!(topic.replay().as_deref(), Some(&2));
    }

    #[test]
    fn test_stats_and_address() {
        let topic = topic(BusConfig::default());
        topic.subscribe(&recorder(&Log::default(), "a"), Registration::Unique);
        topic.publish_delayed(1).unwrap();

        let stats = topic.stats();
        assert_eq!(stats.immediate_listeners, 1);
        assert_eq!(stats.delayed_listeners, 0);
        assert!(stats.has_replay);
        assert_eq!(stats.delayed_publish_count, 1);
        assert_eq!(topic.address().to_string(), "game/score");
        assert_eq!(topic.name(), "score");
        assert_eq!(topic.channel_name(), "game");
    }
}
