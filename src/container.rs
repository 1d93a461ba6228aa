//! Per-unit-of-work service container: instance cache plus cleanup stack.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::internal::{drain_all, drain_sync, CleanupBag, CleanupStep};
use crate::key::ServiceKey;
use crate::ping::ServicePing;
use crate::registration::{AnyArc, Provider};
use crate::registry::Registry;

/// Per-unit-of-work container bound to one [`Registry`].
///
/// A container caches every service it resolves, so each type is constructed
/// at most once per container, and it records the release step of every
/// cleanup-bearing factory it ran. Closing the container runs those steps in
/// reverse acquisition order, mirroring nested resource acquisition.
///
/// Create one container per unit of work (typically one per request), resolve
/// what that unit needs, and close it exactly once at the unit's end — with
/// [`close`](Self::close) if everything was resolved synchronously, with
/// [`aclose`](Self::aclose) if anything came through [`aget`](Self::aget).
/// Dropping a container without closing drains the synchronous steps and
/// warns about async ones it cannot run.
///
/// The registry must outlive the container; the container never closes it.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use lodestone_di::{Container, Registry};
///
/// struct RequestId(u64);
///
/// let registry = Arc::new(Registry::new());
/// registry.register_factory(|| Ok(RequestId(7)));
///
/// let container = Container::new(registry);
/// let a = container.get::<RequestId>().unwrap();
/// let b = container.get::<RequestId>().unwrap();
/// // Constructed once, cached thereafter.
/// assert!(Arc::ptr_eq(&a, &b));
/// container.close().unwrap();
/// ```
pub struct Container {
    registry: Arc<Registry>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    instances: HashMap<TypeId, AnyArc>,
    cleanups: CleanupBag,
    closed: bool,
}

impl Container {
    /// Creates a container bound to `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            state: Mutex::new(State::default()),
        }
    }

    /// The registry this container resolves against.
    ///
    /// Exposed for the replace-registration pattern used in tests:
    /// re-register a type, then [`forget_about`](Self::forget_about) it so
    /// the next resolution rebuilds from the new registration.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolves `T`, constructing it on first request and caching it.
    ///
    /// A cache hit returns the cached instance without touching the factory
    /// or the cleanup stack. On a miss the bound registry supplies the
    /// registration; a cleanup-bearing factory additionally pushes its
    /// release step onto the cleanup stack.
    ///
    /// # Errors
    ///
    /// [`DiError::NotRegistered`] if `T` was never registered;
    /// [`DiError::AsyncFactory`] if `T` was registered with an async factory
    /// (use [`aget`](Self::aget)); [`DiError::Closed`] after close;
    /// [`DiError::Factory`] if construction fails — in which case neither
    /// the cache nor the cleanup stack is touched.
    pub fn get<T>(&self) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>();
        if let Some(cached) = self.cached(key)? {
            return downcast(cached, key);
        }

        let service = self
            .registry
            .lookup(key.type_id())
            .ok_or(DiError::NotRegistered(key.display_name()))?;

        // The state lock is never held while a factory runs.
        let (instance, cleanup) = match service.provider {
            Provider::Value(value) => (value, None),
            Provider::Factory(factory) => (factory().map_err(|source| DiError::Factory {
                service: key.display_name(),
                source,
            })?, None),
            Provider::FactoryWithCleanup(factory) => {
                let (value, cleanup) = factory().map_err(|source| DiError::Factory {
                    service: key.display_name(),
                    source,
                })?;
                (value, Some(CleanupStep::Sync(cleanup)))
            }
            Provider::AsyncFactory(_) | Provider::AsyncFactoryWithCleanup(_) => {
                return Err(DiError::AsyncFactory(key.display_name()));
            }
        };

        self.store(key, instance.clone(), cleanup);
        downcast(instance, key)
    }

    /// Resolves `T` on the async path.
    ///
    /// Semantics match [`get`](Self::get); additionally, async factories are
    /// driven to completion and their release steps are captured for
    /// [`aclose`](Self::aclose). Synchronously registered services resolve
    /// here as well.
    pub async fn aget<T>(&self) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>();
        if let Some(cached) = self.cached(key)? {
            return downcast(cached, key);
        }

        let service = self
            .registry
            .lookup(key.type_id())
            .ok_or(DiError::NotRegistered(key.display_name()))?;

        let factory_err = |source| DiError::Factory {
            service: key.display_name(),
            source,
        };
        let (instance, cleanup) = match service.provider {
            Provider::Value(value) => (value, None),
            Provider::Factory(factory) => (factory().map_err(factory_err)?, None),
            Provider::FactoryWithCleanup(factory) => {
                let (value, cleanup) = factory().map_err(factory_err)?;
                (value, Some(CleanupStep::Sync(cleanup)))
            }
            Provider::AsyncFactory(factory) => (factory().await.map_err(factory_err)?, None),
            Provider::AsyncFactoryWithCleanup(factory) => {
                let (value, cleanup) = factory().await.map_err(factory_err)?;
                (value, Some(CleanupStep::Async(cleanup)))
            }
        };

        self.store(key, instance.clone(), cleanup);
        downcast(instance, key)
    }

    /// Resolves `T` by its abstract/interface key.
    ///
    /// Behaviorally identical to [`get`](Self::get); the name documents call
    /// sites that look up a service through an interface handle (e.g. an
    /// `Arc<dyn Trait>` alias) rather than a concrete type.
    pub fn get_abstract<T>(&self) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get::<T>()
    }

    /// Async form of [`get_abstract`](Self::get_abstract).
    pub async fn aget_abstract<T>(&self) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.aget::<T>().await
    }

    /// Resolves a tuple of service types in input order.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use lodestone_di::{Container, Registry};
    ///
    /// let registry = Arc::new(Registry::new());
    /// registry.register_value(42u32);
    /// registry.register_factory(|| Ok("s".to_string()));
    ///
    /// let container = Container::new(registry);
    /// let (n, s) = container.get_many::<(u32, String)>().unwrap();
    /// assert_eq!(*n, 42);
    /// assert_eq!(s.as_str(), "s");
    /// ```
    pub fn get_many<S: ServiceSet>(&self) -> DiResult<S::Resolved> {
        S::resolve(self)
    }

    /// Async form of [`get_many`](Self::get_many); each type resolves via
    /// [`aget`](Self::aget), still in input order.
    pub async fn aget_many<S: ServiceSet>(&self) -> DiResult<S::Resolved> {
        S::resolve_async(self).await
    }

    /// Delegates to the bound registry's
    /// [`get_pings`](crate::Registry::get_pings).
    pub fn get_pings(&self) -> Vec<ServicePing> {
        self.registry.get_pings()
    }

    /// Evicts `T` from the instance cache, if present.
    ///
    /// The next resolution of `T` runs its factory again. Any cleanup step
    /// already queued for the evicted instance stays queued and still runs
    /// at close: the old instance may be held by earlier-resolved services,
    /// so its release is deferred, not cancelled.
    pub fn forget_about<T: 'static>(&self) {
        self.state.lock().instances.remove(&TypeId::of::<T>());
    }

    /// Closes the container, running every queued cleanup step in reverse
    /// acquisition order and clearing the instance cache.
    ///
    /// A failing step is logged, recorded, and never stops the rest of the
    /// drain; recorded failures come back as [`DiError::Cleanup`] once the
    /// drain finishes. Closing an already-closed container is a no-op.
    ///
    /// # Errors
    ///
    /// [`DiError::AsyncCleanupPending`] if any queued step was captured on
    /// the async path — nothing is drained, close with
    /// [`aclose`](Self::aclose) instead.
    pub fn close(&self) -> DiResult<()> {
        let entries = {
            let mut state = self.state.lock();
            let pending = state.cleanups.pending_async();
            if pending > 0 {
                return Err(DiError::AsyncCleanupPending(pending));
            }
            state.closed = true;
            state.instances.clear();
            state.cleanups.take()
        };
        // Entries are out of the state before any user code runs.
        let (failures, _) = drain_sync(entries);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::Cleanup { failures })
        }
    }

    /// Closes the container on the async path, draining sync and async
    /// cleanup steps interleaved, in reverse acquisition order.
    ///
    /// Same failure policy and idempotence as [`close`](Self::close).
    /// If the surrounding runtime cancels this future mid-drain, steps not
    /// yet reached are lost; closing again remains safe for whatever was
    /// already drained.
    pub async fn aclose(&self) -> DiResult<()> {
        let entries = {
            let mut state = self.state.lock();
            state.closed = true;
            state.instances.clear();
            state.cleanups.take()
        };
        let failures = drain_all(entries).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::Cleanup { failures })
        }
    }

    /// Cache lookup plus the closed-state check shared by both resolution
    /// paths.
    fn cached(&self, key: ServiceKey) -> DiResult<Option<AnyArc>> {
        let state = self.state.lock();
        if state.closed {
            return Err(DiError::Closed);
        }
        Ok(state.instances.get(&key.type_id()).cloned())
    }

    fn store(&self, key: ServiceKey, instance: AnyArc, cleanup: Option<CleanupStep>) {
        let mut state = self.state.lock();
        state.instances.insert(key.type_id(), instance);
        if let Some(step) = cleanup {
            state.cleanups.push(key.display_name(), step);
        }
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let entries = state.cleanups.take();
        if entries.is_empty() {
            return;
        }
        tracing::warn!(
            pending = entries.len(),
            "container dropped without close(), draining sync cleanups"
        );
        // Failures and skipped async steps are logged by the drain.
        let _ = drain_sync(entries);
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Tuple of service types resolvable in one call.
///
/// Implemented for tuples of arity 1 through 10; resolution is strictly in
/// input order, so cleanup order across the tuple matches a sequence of
/// single resolutions.
#[async_trait::async_trait]
pub trait ServiceSet: sealed::Sealed {
    /// The tuple of resolved `Arc` handles.
    type Resolved;

    /// Resolves each member with [`Container::get`].
    fn resolve(container: &Container) -> DiResult<Self::Resolved>;

    /// Resolves each member with [`Container::aget`].
    async fn resolve_async(container: &Container) -> DiResult<Self::Resolved>;
}

macro_rules! impl_service_set {
    ($($ty:ident),+) => {
        impl<$($ty,)+> sealed::Sealed for ($($ty,)+)
        where
            $($ty: Send + Sync + 'static,)+
        {
        }

        #[async_trait::async_trait]
        impl<$($ty,)+> ServiceSet for ($($ty,)+)
        where
            $($ty: Send + Sync + 'static,)+
        {
            type Resolved = ($(Arc<$ty>,)+);

            fn resolve(container: &Container) -> DiResult<Self::Resolved> {
                Ok(($(container.get::<$ty>()?,)+))
            }

            async fn resolve_async(container: &Container) -> DiResult<Self::Resolved> {
                Ok(($(container.aget::<$ty>().await?,)+))
            }
        }
    };
}

impl_service_set!(T1);
impl_service_set!(T1, T2);
impl_service_set!(T1, T2, T3);
impl_service_set!(T1, T2, T3, T4);
impl_service_set!(T1, T2, T3, T4, T5);
impl_service_set!(T1, T2, T3, T4, T5, T6);
impl_service_set!(T1, T2, T3, T4, T5, T6, T7);
impl_service_set!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_service_set!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_service_set!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);

fn downcast<T>(instance: AnyArc, key: ServiceKey) -> DiResult<Arc<T>>
where
    T: Send + Sync + 'static,
{
    instance
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(key.display_name()))
}
