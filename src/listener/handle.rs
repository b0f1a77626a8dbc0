//! Listener handles and subscription tokens

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ListenerError;

/// Result returned by a listener invocation
pub type ListenerResult = Result<(), ListenerError>;

type ListenerFn<P> = dyn Fn(&P) -> ListenerResult + Send + Sync;

/// A callable registered on a topic
///
/// Cloning a `Listener` yields the same listener: clones compare equal for
/// de-duplication purposes. Two listeners built from separate closures are
/// always distinct, even if their bodies are identical.
pub struct Listener<P> {
    func: Arc<ListenerFn<P>>,
}

impl<P> Listener<P> {
    /// Create a listener from a fallible closure
    ///
    /// An `Err` returned by the closure stops delivery of the current payload
    /// and is handed back to whoever published it.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&P) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Create a listener from a closure that cannot fail
    pub fn infallible<F>(func: F) -> Self
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        Self::new(move |payload| {
            func(payload);
            Ok(())
        })
    }

    /// Invoke the listener with a payload
    pub fn call(&self, payload: &P) -> ListenerResult {
        (self.func)(payload)
    }

    /// Whether both handles refer to the same listener
    pub fn same_as(&self, other: &Listener<P>) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<P> PartialEq for Listener<P> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<P> Eq for Listener<P> {}

impl<P> fmt::Debug for Listener<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("func", &Arc::as_ptr(&self.func).cast::<()>())
            .finish()
    }
}

/// Token identifying one registration of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Shared allocator for subscription tokens
///
/// One allocator is shared by every channel and topic of a bus, so tokens are
/// unique bus-wide.
#[derive(Debug, Clone)]
pub(crate) struct SubscriptionIds {
    next: Arc<AtomicU64>,
}

impl SubscriptionIds {
    pub(crate) fn new() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(1)),
        }
    }

    pub(crate) fn next(&self) -> SubscriptionId {
        SubscriptionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
