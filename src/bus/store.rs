//! Bus implementation
//!
//! The root registry that owns every channel and resolves `channel/topic`
//! addresses.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::address::Address;
use crate::config::BusConfig;
use crate::error::{BusError, Result};
use crate::listener::{Listener, Registration, SubscriptionId, SubscriptionIds};

use super::channel::Channel;
use super::topic::{Topic, TopicStats};

type ChannelMap<P> = HashMap<String, Arc<Channel<P>>>;

struct BusInner<P> {
    channels: RwLock<ChannelMap<P>>,
    config: BusConfig,
    ids: SubscriptionIds,
}

/// In-process publish/subscribe bus
///
/// Cloning a `Bus` yields another handle to the same channels. Every call
/// runs synchronously on the caller's thread; listeners are invoked outside
/// of any internal lock and may call back into the bus.
pub struct Bus<P> {
    inner: Arc<BusInner<P>>,
}

impl<P> Bus<P> {
    /// Create a new bus with default configuration
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a new bus with custom configuration
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: RwLock::new(HashMap::new()),
                config,
                ids: SubscriptionIds::new(),
            }),
        }
    }

    /// Get the bus configuration
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Get a channel, creating it if it doesn't exist
    ///
    /// Repeated calls with the same name return the same channel.
    pub fn resolve_channel(&self, name: &str) -> Result<Arc<Channel<P>>> {
        if name.is_empty() {
            return Err(BusError::InvalidName(name.to_string()));
        }

        if let Some(channel) = self.read_channels().get(name) {
            return Ok(Arc::clone(channel));
        }

        let mut channels = self.write_channels();
        let channel = channels.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(channel = %name, "Channel created");
            Arc::new(Channel::new(
                name,
                self.inner.config,
                self.inner.ids.clone(),
            ))
        });

        Ok(Arc::clone(channel))
    }

    /// Look up a channel without creating it
    pub fn channel(&self, name: &str) -> Option<Arc<Channel<P>>> {
        self.read_channels().get(name).cloned()
    }

    /// Whether a channel with this name exists
    pub fn has_channel(&self, name: &str) -> bool {
        self.read_channels().contains_key(name)
    }

    /// Remove a channel along with all of its topics
    ///
    /// Handles to the removed channel stay usable but are detached from the
    /// bus; resolving the name again creates a fresh channel.
    pub fn remove_channel(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(BusError::InvalidName(name.to_string()));
        }

        match self.write_channels().remove(name) {
            Some(channel) => {
                tracing::debug!(
                    channel = %name,
                    topics = channel.topic_count(),
                    "Channel removed"
                );
                Ok(())
            }
            None => Err(BusError::NotFound(name.to_string())),
        }
    }

    /// Remove the topic named by an address
    pub fn remove_topic(&self, address: &str) -> Result<()> {
        let address = Address::parse(address)?;
        match self.channel(&address.channel) {
            Some(channel) => channel.remove_topic(&address.topic),
            None => Err(BusError::NotFound(address.to_string())),
        }
    }

    /// Get the topic named by an address, creating channel and topic as needed
    pub fn resolve_topic(&self, address: &str) -> Result<Arc<Topic<P>>> {
        let address = Address::parse(address)?;
        self.resolve_channel(&address.channel)?
            .resolve_topic(&address.topic)
    }

    /// Look up the topic named by an address without creating anything
    pub fn topic(&self, address: &str) -> Result<Option<Arc<Topic<P>>>> {
        let address = Address::parse(address)?;
        Ok(self
            .channel(&address.channel)
            .and_then(|channel| channel.topic(&address.topic)))
    }

    /// Names of all channels, sorted
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_channels().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.read_channels().len()
    }

    /// Register a listener for immediate delivery
    ///
    /// Subscribing a listener that is already registered on the topic is a
    /// no-op returning the existing token.
    pub fn subscribe(&self, address: &str, listener: &Listener<P>) -> Result<SubscriptionId> {
        Ok(self
            .resolve_topic(address)?
            .subscribe(listener, Registration::Unique))
    }

    /// Register a listener for immediate delivery, allowing duplicates
    pub fn subscribe_forced(
        &self,
        address: &str,
        listener: &Listener<P>,
    ) -> Result<SubscriptionId> {
        Ok(self
            .resolve_topic(address)?
            .subscribe(listener, Registration::Forced))
    }

    /// Register a listener for delayed delivery
    ///
    /// If the topic already holds a delayed payload, the listener receives it
    /// before this call returns.
    pub fn subscribe_delayed(
        &self,
        address: &str,
        listener: &Listener<P>,
    ) -> Result<SubscriptionId> {
        self.resolve_topic(address)?
            .subscribe_delayed(listener, Registration::Unique)
    }

    /// Register a listener for delayed delivery, allowing duplicates
    pub fn subscribe_delayed_forced(
        &self,
        address: &str,
        listener: &Listener<P>,
    ) -> Result<SubscriptionId> {
        self.resolve_topic(address)?
            .subscribe_delayed(listener, Registration::Forced)
    }

    /// Remove a registration from the topic named by an address
    pub fn unsubscribe(&self, address: &str, id: SubscriptionId) -> Result<()> {
        let removed = self
            .topic(address)?
            .map(|topic| topic.unsubscribe(id))
            .unwrap_or(false);

        if removed {
            Ok(())
        } else {
            Err(BusError::NotFound(format!("{} on {}", id, address)))
        }
    }

    /// Publish a payload to the immediate listeners of a topic
    pub fn publish(&self, address: &str, payload: P) -> Result<()> {
        self.resolve_topic(address)?.publish(payload)
    }

    /// Publish a payload to the delayed listeners of a topic and keep it for
    /// listeners that subscribe later
    pub fn publish_delayed(&self, address: &str, payload: P) -> Result<()> {
        self.resolve_topic(address)?.publish_delayed(payload)
    }

    /// Get statistics for the topic named by an address, if it exists
    pub fn topic_stats(&self, address: &str) -> Result<Option<TopicStats>> {
        Ok(self.topic(address)?.map(|topic| topic.stats()))
    }

    fn read_channels(&self) -> RwLockReadGuard<'_, ChannelMap<P>> {
        self.inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_channels(&self) -> RwLockWriteGuard<'_, ChannelMap<P>> {
        self.inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> Clone for Bus<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Default for Bus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for Bus<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("config", &self.inner.config)
            .field("channels", &self.channel_names())
            .finish()
    }
}
