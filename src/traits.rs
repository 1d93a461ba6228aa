//! Cleanup traits for services that carry their own teardown.

use crate::error::BoxError;

/// Synchronous teardown for a service instance.
///
/// Implement this for services whose release logic lives on the instance
/// itself (flushing buffers, returning a connection to its pool), then
/// register with [`Registry::register_resource`](crate::Registry::register_resource):
/// the container invokes `cleanup` on the cached instance during close, in
/// reverse acquisition order.
///
/// # Examples
///
/// ```rust
/// use lodestone_di::{BoxError, Cleanup, Registry};
///
/// struct Cache;
///
/// impl Cleanup for Cache {
///     fn cleanup(&self) -> Result<(), BoxError> {
///         // flush...
///         Ok(())
///     }
/// }
///
/// let registry = Registry::new();
/// registry.register_resource(|| Ok(Cache));
/// ```
pub trait Cleanup: Send + Sync + 'static {
    /// Releases the instance's resources. A returned error is recorded and
    /// reported after the close drain finishes; it never halts the drain.
    fn cleanup(&self) -> Result<(), BoxError>;
}

/// Asynchronous teardown for a service instance.
///
/// The async counterpart of [`Cleanup`], registered with
/// [`Registry::register_async_resource`](crate::Registry::register_async_resource)
/// and drained by [`Container::aclose`](crate::Container::aclose).
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use lodestone_di::{AsyncCleanup, BoxError, Registry};
///
/// struct DbConnection;
///
/// #[async_trait]
/// impl AsyncCleanup for DbConnection {
///     async fn cleanup(&self) -> Result<(), BoxError> {
///         // graceful shutdown...
///         Ok(())
///     }
/// }
///
/// let registry = Registry::new();
/// registry.register_async_resource(|| async { Ok(DbConnection) });
/// ```
#[async_trait::async_trait]
pub trait AsyncCleanup: Send + Sync + 'static {
    /// Releases the instance's resources.
    async fn cleanup(&self) -> Result<(), BoxError>;
}
