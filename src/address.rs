//! Channel/topic addresses
//!
//! An address names a topic inside a channel as `"channel/topic"`. The string
//! is split on the first `/` only, so `"a/b/c"` addresses topic `"b/c"` of
//! channel `"a"`.

use std::fmt;
use std::str::FromStr;

use crate::error::BusError;

/// Separator between the channel and topic segments
pub const SEPARATOR: char = '/';

/// Parsed `channel/topic` address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Channel name
    pub channel: String,
    /// Topic name within the channel
    pub topic: String,
}

impl Address {
    /// Create an address from its parts
    ///
    /// Fails if either part is empty.
    pub fn new(channel: impl Into<String>, topic: impl Into<String>) -> Result<Self, BusError> {
        let channel = channel.into();
        let topic = topic.into();

        if channel.is_empty() {
            return Err(BusError::InvalidName(channel));
        }
        if topic.is_empty() {
            return Err(BusError::MissingTopic(format!("{}{}", channel, SEPARATOR)));
        }

        Ok(Self { channel, topic })
    }

    /// Parse an address string
    ///
    /// An address without a separator, or with nothing after it, has no topic
    /// and yields [`BusError::MissingTopic`].
    pub fn parse(address: &str) -> Result<Self, BusError> {
        let (channel, topic) = split(address);

        if channel.is_empty() {
            return Err(BusError::InvalidName(address.to_string()));
        }

        match topic {
            Some(topic) if !topic.is_empty() => Ok(Self {
                channel: channel.to_string(),
                topic: topic.to_string(),
            }),
            _ => Err(BusError::MissingTopic(address.to_string())),
        }
    }
}

/// Split an address into its channel segment and optional topic segment
pub fn split(address: &str) -> (&str, Option<&str>) {
    match address.split_once(SEPARATOR) {
        Some((channel, topic)) => (channel, Some(topic)),
        None => (address, None),
    }
}

impl FromStr for Address {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.channel, SEPARATOR, self.topic)
    }
}
