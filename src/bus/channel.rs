//! Channel: a namespace of topics

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::BusConfig;
use crate::error::{BusError, Result};
use crate::listener::{Listener, Registration, SubscriptionId, SubscriptionIds};

use super::topic::Topic;

/// A named channel holding topics
///
/// Topics are created on first reference and live until removed.
pub struct Channel<P> {
    name: String,
    config: BusConfig,
    ids: SubscriptionIds,
    topics: RwLock<HashMap<String, Arc<Topic<P>>>>,
}

impl<P> Channel<P> {
    pub(super) fn new(name: &str, config: BusConfig, ids: SubscriptionIds) -> Self {
        Self {
            name: name.to_string(),
            config,
            ids,
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a topic, creating it if it doesn't exist
    ///
    /// Returns [`BusError::InvalidName`] if `name` is empty.
    pub fn resolve_topic(&self, name: &str) -> Result<Arc<Topic<P>>> {
        if name.is_empty() {
            return Err(BusError::InvalidName(name.to_string()));
        }

        if let Some(topic) = self.read_topics().get(name) {
            return Ok(Arc::clone(topic));
        }

        let mut topics = self.write_topics();
        let topic = topics.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(channel = %self.name, topic = %name, "Topic created");
            Arc::new(Topic::new(&self.name, name, self.config, self.ids.clone()))
        });

        Ok(Arc::clone(topic))
    }

    /// Look up a topic without creating it
    pub fn topic(&self, name: &str) -> Option<Arc<Topic<P>>> {
        self.read_topics().get(name).cloned()
    }

    /// Whether a topic with this name exists
    pub fn has_topic(&self, name: &str) -> bool {
        self.read_topics().contains_key(name)
    }

    /// Remove a topic along with its listeners and replay payload
    pub fn remove_topic(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(BusError::InvalidName(name.to_string()));
        }

        match self.write_topics().remove(name) {
            Some(_) => {
                tracing::debug!(channel = %self.name, topic = %name, "Topic removed");
                Ok(())
            }
            None => Err(BusError::NotFound(format!("{}/{}", self.name, name))),
        }
    }

    /// Names of all topics, sorted
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_topics().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of topics
    pub fn topic_count(&self) -> usize {
        self.read_topics().len()
    }

    /// Register an immediate listener on a topic of this channel
    pub fn subscribe(&self, topic: &str, listener: &Listener<P>) -> Result<SubscriptionId> {
        Ok(self
            .resolve_topic(topic)?
            .subscribe(listener, Registration::Unique))
    }

    /// Register an immediate listener even if it is already registered
    pub fn subscribe_forced(&self, topic: &str, listener: &Listener<P>) -> Result<SubscriptionId> {
        Ok(self
            .resolve_topic(topic)?
            .subscribe(listener, Registration::Forced))
    }

    /// Register a delayed listener on a topic of this channel
    pub fn subscribe_delayed(&self, topic: &str, listener: &Listener<P>) -> Result<SubscriptionId> {
        self.resolve_topic(topic)?
            .subscribe_delayed(listener, Registration::Unique)
    }

    /// Register a delayed listener even if it is already registered
    pub fn subscribe_delayed_forced(
        &self,
        topic: &str,
        listener: &Listener<P>,
    ) -> Result<SubscriptionId> {
        self.resolve_topic(topic)?
            .subscribe_delayed(listener, Registration::Forced)
    }

    /// Publish to the immediate listeners of a topic
    pub fn publish(&self, topic: &str, payload: P) -> Result<()> {
        self.resolve_topic(topic)?.publish(payload)
    }

    /// Publish to the delayed listeners of a topic and store the payload for replay
    pub fn publish_delayed(&self, topic: &str, payload: P) -> Result<()> {
        self.resolve_topic(topic)?.publish_delayed(payload)
    }

    fn read_topics(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Topic<P>>>> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_topics(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Topic<P>>>> {
        self.topics.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> std::fmt::Debug for Channel<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("topics", &self.topic_names())
            .finish()
    }
}
