//! Listeners and listener registries
//!
//! A [`Listener`] is a shareable callable invoked with a borrowed payload.
//! Identity is reference identity: registering a clone of a listener that is
//! already present is a no-op unless the registration is forced. Every
//! registration is assigned a [`SubscriptionId`] that can later remove it.

pub mod handle;
pub mod registry;

pub use handle::{Listener, ListenerResult, SubscriptionId};
pub(crate) use handle::SubscriptionIds;
pub use registry::{dispatch, ListenerRegistry, Registered, Registration};
