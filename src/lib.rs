//! In-process publish/subscribe event bus
//!
//! Producers and consumers meet on topics addressed as `"channel/topic"`.
//! Channels and topics are created on first use. Each topic carries two kinds
//! of listeners:
//!
//! - **Immediate** listeners receive payloads passed to [`Bus::publish`].
//! - **Delayed** listeners receive payloads passed to [`Bus::publish_delayed`].
//!   The topic keeps the most recent delayed payload, and a delayed listener
//!   that subscribes later receives it straight away.
//!
//! Delivery is synchronous, in registration order, and stops at the first
//! listener that returns an error.
//!
//! # Example
//!
//! ```
//! use hermes_bus::{Bus, Listener};
//!
//! # fn main() -> hermes_bus::Result<()> {
//! let bus = Bus::<String>::new();
//!
//! bus.publish_delayed("session/user", "alice".to_string())?;
//!
//! // Subscribed after the fact, still sees "alice"
//! let greeter = Listener::infallible(|name: &String| println!("hello {name}"));
//! bus.subscribe_delayed("session/user", &greeter)?;
//!
//! // Subscribing the same listener again is a no-op
//! bus.subscribe_delayed("session/user", &greeter)?;
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod bus;
pub mod config;
pub mod error;
pub mod listener;
pub mod receiver;

pub use address::Address;
pub use bus::{Bus, Channel, Topic, TopicStats};
pub use config::BusConfig;
pub use error::{BusError, ListenerError, Result};
pub use listener::{Listener, ListenerResult, Registration, SubscriptionId};
pub use receiver::{Receiver, TryRecvError};
