//! Internal registration types: the provider variants and their type-erased
//! factory signatures.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BoxError;
use crate::key::ServiceKey;
use crate::ping::Ping;

/// Type-erased `Arc` used for instance storage.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Boxed future used on the async call paths.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Phase-2 release continuation captured from a cleanup-bearing factory.
/// Invoked at most once, possibly long after the instance was produced.
pub(crate) type SyncCleanupFn = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Async release continuation; produces the future that performs the release.
pub(crate) type AsyncCleanupFn =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

pub(crate) type SyncFactoryFn = Arc<dyn Fn() -> Result<AnyArc, BoxError> + Send + Sync>;
pub(crate) type SyncCleanupFactoryFn =
    Arc<dyn Fn() -> Result<(AnyArc, SyncCleanupFn), BoxError> + Send + Sync>;
pub(crate) type AsyncFactoryFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<AnyArc, BoxError>> + Send + Sync>;
pub(crate) type AsyncCleanupFactoryFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(AnyArc, AsyncCleanupFn), BoxError>> + Send + Sync>;

/// How a registered service is produced.
///
/// The variant is fixed at registration time; resolution dispatches over this
/// closed set instead of inspecting what a callable returned.
#[derive(Clone)]
pub(crate) enum Provider {
    /// Fixed instance, shared identically with every container.
    Value(AnyArc),
    /// Zero-argument factory, invoked once per container.
    Factory(SyncFactoryFn),
    /// Factory whose second return half is the release continuation.
    FactoryWithCleanup(SyncCleanupFactoryFn),
    /// Factory that must be driven on the async path.
    AsyncFactory(AsyncFactoryFn),
    /// Async factory with an async release continuation.
    AsyncFactoryWithCleanup(AsyncCleanupFactoryFn),
}

/// One registration: key, provider, and optional health probe.
/// Immutable once stored; re-registration replaces the record wholesale.
#[derive(Clone)]
pub(crate) struct RegisteredService {
    pub(crate) key: ServiceKey,
    pub(crate) provider: Provider,
    pub(crate) ping: Option<Ping>,
}

impl RegisteredService {
    pub(crate) fn name(&self) -> &'static str {
        self.key.display_name()
    }
}
