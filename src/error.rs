//! Error types
//!
//! Every fallible bus operation returns [`BusError`]. Listener failures are
//! carried through unchanged as [`ListenerError`].

use std::fmt;

/// Result alias for bus operations
pub type Result<T> = std::result::Result<T, BusError>;

/// Error type for bus operations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Empty channel or topic name
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Address has no topic segment
    #[error("no topic defined for event '{0}'")]
    MissingTopic(String),

    /// Channel, topic or subscription does not exist
    #[error("'{0}' does not exist")]
    NotFound(String),

    /// A listener failed while a payload was being delivered
    #[error("listener failed: {0}")]
    ListenerInvocation(#[source] ListenerError),
}

impl BusError {
    /// Whether this error was raised by a listener rather than by the bus
    pub fn is_listener_error(&self) -> bool {
        matches!(self, BusError::ListenerInvocation(_))
    }

    /// The listener's own error, if this is a delivery failure
    pub fn listener_error(&self) -> Option<&ListenerError> {
        match self {
            BusError::ListenerInvocation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ListenerError> for BusError {
    fn from(err: ListenerError) -> Self {
        BusError::ListenerInvocation(err)
    }
}

/// Error returned by a listener
///
/// Wraps whatever the listener produced. The bus never inspects it.
pub struct ListenerError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl ListenerError {
    /// Wrap an arbitrary error
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self(err.into())
    }

    /// Create an error from a message
    pub fn msg(message: impl fmt::Display) -> Self {
        Self(message.to_string().into())
    }

    /// Borrow the wrapped error
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }

    /// Attempt to downcast the wrapped error to a concrete type
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Unwrap into the boxed error
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.0
    }
}

impl fmt::Debug for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<std::io::Error> for ListenerError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err)
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self(message.into())
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self(message.into())
    }
}
