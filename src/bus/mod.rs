//! Channel/topic registry and delivery
//!
//! The bus owns channels, channels own topics, and topics own two listener
//! registries plus a replay slot.
//!
//! # Architecture
//!
//! ```text
//!                         Bus (Arc<BusInner>)
//!                  ┌──────────────────────────────┐
//!                  │ channels: HashMap<String,    │
//!                  │   Channel {                  │
//!                  │     topics: HashMap<String,  │
//!                  │       Topic {                │
//!                  │         immediate,           │
//!                  │         delayed,             │
//!                  │         replay: Option<P>,   │
//!                  │       }>                     │
//!                  │   }>                         │
//!                  └──────────────┬───────────────┘
//!                                 │
//!        bus.publish("ui/click", p)  ──►  parse address
//!                                 │
//!                  resolve_channel("ui").resolve_topic("click")
//!                                 │
//!                     snapshot listeners, release lock
//!                                 │
//!                  ┌──────────────┼──────────────┐
//!                  ▼              ▼              ▼
//!             listener 1     listener 2     listener 3
//! ```
//!
//! # Locking
//!
//! Each map and each topic has its own lock. Locks are held only while the
//! maps or registries are read or mutated, never while a listener runs, so a
//! listener may publish, subscribe or remove channels on the same bus.

pub mod channel;
pub mod store;
pub mod topic;

pub use channel::Channel;
pub use store::Bus;
pub use topic::{Topic, TopicStats};
