//! Health-check probes bound to registered services.

use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, DiError};
use crate::registration::BoxFuture;

pub(crate) type SyncProbeFn = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;
pub(crate) type AsyncProbeFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// A registered health probe, sync or async.
#[derive(Clone)]
pub(crate) enum Ping {
    Sync(SyncProbeFn),
    Async(AsyncProbeFn),
}

/// A named, invokable health check bound to one registered service.
///
/// Produced by [`Registry::get_pings`](crate::Registry::get_pings) from the
/// current registration snapshot. Probing never resolves the service itself:
/// the probe runs whether or not the service was ever constructed in any
/// container.
///
/// A probe signals "unhealthy" by returning an error, which is handed to the
/// caller unchanged.
///
/// # Examples
///
/// ```rust
/// use lodestone_di::Registry;
///
/// struct Database;
///
/// let registry = Registry::new();
/// registry
///     .register::<Database>()
///     .ping(|| Ok(()))
///     .value(Database);
///
/// let pings = registry.get_pings();
/// assert_eq!(pings.len(), 1);
/// assert!(pings[0].name().ends_with("Database"));
/// assert!(pings[0].ping().is_ok());
/// ```
pub struct ServicePing {
    name: &'static str,
    ping: Ping,
}

impl ServicePing {
    pub(crate) fn new(name: &'static str, ping: Ping) -> Self {
        Self { name, ping }
    }

    /// Qualified type name of the service this probe is bound to.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the probe was registered as async and must be driven with
    /// [`aping`](Self::aping).
    pub fn is_async(&self) -> bool {
        matches!(self.ping, Ping::Async(_))
    }

    /// Invokes a synchronous probe.
    ///
    /// The probe's failure is propagated unchanged. Calling this on an async
    /// probe fails with [`DiError::AsyncPing`] without invoking anything.
    pub fn ping(&self) -> Result<(), BoxError> {
        match &self.ping {
            Ping::Sync(probe) => probe(),
            Ping::Async(_) => Err(Box::new(DiError::AsyncPing(self.name))),
        }
    }

    /// Invokes the probe, driving async probes to completion.
    pub async fn aping(&self) -> Result<(), BoxError> {
        match &self.ping {
            Ping::Sync(probe) => probe(),
            Ping::Async(probe) => probe().await,
        }
    }
}

impl fmt::Debug for ServicePing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePing")
            .field("name", &self.name)
            .field("is_async", &self.is_async())
            .finish()
    }
}
