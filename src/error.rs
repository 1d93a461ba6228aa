//! Error types for the registry/container pair.

/// Boxed error type carried by factories, cleanups, close hooks, and pings.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single failed cleanup step, recorded during a close drain.
///
/// Collected into [`DiError::Cleanup`] after the drain finishes; one cleanup
/// failing never stops the remaining steps from running.
#[derive(Debug)]
pub struct CleanupFailure {
    /// Qualified type name of the service whose cleanup failed.
    pub service: &'static str,
    /// The error the cleanup step returned.
    pub source: BoxError,
}

/// Errors surfaced by registry and container operations.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use lodestone_di::{Container, DiError, Registry};
///
/// let registry = Arc::new(Registry::new());
/// let container = Container::new(registry);
///
/// match container.get::<String>() {
///     Err(DiError::NotRegistered(name)) => assert_eq!(name, "alloc::string::String"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DiError {
    /// No registration exists for the requested service type.
    #[error("service not registered: {0}")]
    NotRegistered(&'static str),

    /// A cached instance failed to downcast to the requested type.
    #[error("type mismatch resolving {0}")]
    TypeMismatch(&'static str),

    /// A synchronous `get` hit an async registration.
    #[error("factory for {0} is async, resolve it with aget()")]
    AsyncFactory(&'static str),

    /// A synchronous `ping()` hit an async probe.
    #[error("ping for {0} is async, probe it with aping()")]
    AsyncPing(&'static str),

    /// A synchronous `close()` found async cleanup steps queued.
    #[error("{0} async cleanup step(s) pending, close with aclose()")]
    AsyncCleanupPending(usize),

    /// An operation was called on a closed container.
    #[error("container is closed")]
    Closed,

    /// A factory failed while constructing a service instance.
    #[error("factory for {service} failed: {source}")]
    Factory {
        /// Qualified type name of the service being constructed.
        service: &'static str,
        /// The factory's error.
        source: BoxError,
    },

    /// One or more cleanup steps or close hooks failed during a drain.
    #[error("{} cleanup step(s) failed during close", .failures.len())]
    Cleanup {
        /// The individual failures, in the order they occurred.
        failures: Vec<CleanupFailure>,
    },
}

/// Result alias used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;
