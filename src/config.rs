//! Bus configuration

/// Bus configuration options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Ignore a non-forced subscription of a listener that is already registered
    pub deduplicate_listeners: bool,

    /// Deliver the last delayed payload to delayed listeners when they subscribe
    pub replay_on_subscribe: bool,

    /// Overwrite the replay slot even when a delayed listener fails mid-delivery
    pub replay_on_failed_delivery: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            deduplicate_listeners: true,
            replay_on_subscribe: true,
            replay_on_failed_delivery: true,
        }
    }
}

impl BusConfig {
    /// Create a config with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable listener de-duplication
    pub fn deduplicate_listeners(mut self, enabled: bool) -> Self {
        self.deduplicate_listeners = enabled;
        self
    }

    /// Enable or disable replay-on-subscribe for delayed listeners
    pub fn replay_on_subscribe(mut self, enabled: bool) -> Self {
        self.replay_on_subscribe = enabled;
        self
    }

    /// Choose whether a failed delayed delivery still updates the replay slot
    pub fn replay_on_failed_delivery(mut self, enabled: bool) -> Self {
        self.replay_on_failed_delivery = enabled;
        self
    }
}
