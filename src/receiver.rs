//! Async receiver adapter
//!
//! Bridges a topic to async code: [`Bus::listen`] registers a listener that
//! forwards a clone of every payload into an unbounded tokio channel. The
//! receiving side is polled with [`Receiver::recv`].
//!
//! Delivery into the channel never blocks the publisher. Once the receiver
//! is dropped the forwarding listener becomes a no-op; it stays registered
//! until unsubscribed with the token from [`Receiver::subscription_id`].

use tokio::sync::mpsc;
pub use tokio::sync::mpsc::error::TryRecvError;

use crate::bus::Bus;
use crate::error::Result;
use crate::listener::{Listener, SubscriptionId};

/// Receiving half of a topic subscription
#[derive(Debug)]
pub struct Receiver<P> {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<P>,
}

impl<P> Receiver<P> {
    /// Token of the forwarding listener's registration
    pub fn subscription_id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next payload
    ///
    /// Returns `None` once the forwarding listener has been dropped, which
    /// happens when its topic is removed and no other handle keeps it alive.
    pub async fn recv(&mut self) -> Option<P> {
        self.rx.recv().await
    }

    /// Take the next payload if one is already queued
    ///
    /// Returns [`TryRecvError::Empty`] while nothing is queued and
    /// [`TryRecvError::Disconnected`] once the forwarding listener is gone
    /// and the queue is drained.
    pub fn try_recv(&mut self) -> std::result::Result<P, TryRecvError> {
        self.rx.try_recv()
    }

    /// Number of payloads queued and not yet received
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no payload is queued
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

fn forwarder<P>() -> (Listener<P>, mpsc::UnboundedReceiver<P>)
where
    P: Clone + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = Listener::infallible(move |payload: &P| {
        // A closed receiver just means nobody is listening anymore.
        let _ = tx.send(payload.clone());
    });
    (listener, rx)
}

impl<P> Bus<P>
where
    P: Clone + Send + 'static,
{
    /// Receive the immediate payloads of a topic through an async channel
    pub fn listen(&self, address: &str) -> Result<Receiver<P>> {
        let (listener, rx) = forwarder();
        let id = self.subscribe(address, &listener)?;
        Ok(Receiver { id, rx })
    }

    /// Receive the delayed payloads of a topic through an async channel
    ///
    /// If the topic already holds a delayed payload, it is the first item
    /// the receiver yields.
    pub fn listen_delayed(&self, address: &str) -> Result<Receiver<P>> {
        let (listener, rx) = forwarder();
        let id = self.subscribe_delayed(address, &listener)?;
        Ok(Receiver { id, rx })
    }
}
