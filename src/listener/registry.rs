//! Ordered listener registry
//!
//! A topic keeps two of these, one for immediate and one for delayed
//! delivery. Entries stay in registration order. Delivery never iterates the
//! registry itself: callers take a [`snapshot`](ListenerRegistry::snapshot)
//! under their lock and hand it to [`dispatch`] after releasing it, so a
//! listener may safely subscribe or unsubscribe while a payload is in flight.

use super::handle::{Listener, ListenerResult, SubscriptionId, SubscriptionIds};

/// How a subscription treats an already registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Registration {
    /// Skip the insertion if the listener is already registered
    #[default]
    Unique,
    /// Always append, even if the listener is already registered
    Forced,
}

/// Outcome of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    /// Token of the new entry, or of the existing one if the listener was a duplicate
    pub id: SubscriptionId,
    /// Whether a new entry was appended
    pub inserted: bool,
}

struct Entry<P> {
    id: SubscriptionId,
    listener: Listener<P>,
}

/// Ordered collection of listeners with duplicate suppression
pub struct ListenerRegistry<P> {
    entries: Vec<Entry<P>>,
}

impl<P> ListenerRegistry<P> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a listener
    ///
    /// With [`Registration::Unique`], a listener that is already present is
    /// not appended again and the existing entry's token is returned.
    pub(crate) fn register(
        &mut self,
        listener: &Listener<P>,
        registration: Registration,
        ids: &SubscriptionIds,
    ) -> Registered {
        if registration == Registration::Unique {
            if let Some(id) = self.find(listener) {
                return Registered {
                    id,
                    inserted: false,
                };
            }
        }

        let id = ids.next();
        self.entries.push(Entry {
            id,
            listener: listener.clone(),
        });

        Registered { id, inserted: true }
    }

    /// Token of the first entry holding this listener
    pub fn find(&self, listener: &Listener<P>) -> Option<SubscriptionId> {
        self.entries
            .iter()
            .find(|entry| entry.listener.same_as(listener))
            .map(|entry| entry.id)
    }

    /// Whether an entry with this token exists
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Remove the entry with this token
    ///
    /// Returns false if no such entry exists.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        match self.entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Listeners in registration order
    pub fn snapshot(&self) -> Vec<Listener<P>> {
        self.entries
            .iter()
            .map(|entry| entry.listener.clone())
            .collect()
    }

    /// Tokens in registration order
    pub fn ids(&self) -> Vec<SubscriptionId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P> Default for ListenerRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoke listeners in order, stopping at the first failure
pub fn dispatch<P>(listeners: &[Listener<P>], payload: &P) -> ListenerResult {
    for listener in listeners {
        listener.call(payload)?;
    }
    Ok(())
}
