//! Application-lifetime service registry.

use std::any::TypeId;
use std::future::Future;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{BoxError, CleanupFailure, DiError, DiResult};
use crate::key::ServiceKey;
use crate::ping::{Ping, ServicePing};
use crate::registration::{
    AnyArc, AsyncCleanupFn, BoxFuture, Provider, RegisteredService, SyncCleanupFn,
};
use crate::traits::{AsyncCleanup, Cleanup};

/// A cleanup hook attached to the registry itself, run once at registry
/// close. These release factory-level resources (connection pools, clients),
/// not per-container instances.
enum CloseHook {
    Sync {
        service: &'static str,
        hook: Box<dyn FnOnce() -> Result<(), BoxError> + Send>,
    },
    Async {
        service: &'static str,
        hook: Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>,
    },
}

/// Close hook captured by a [`ServiceBuilder`] before the service name is
/// known; named when the registration commits.
enum PendingHook {
    Sync(Box<dyn FnOnce() -> Result<(), BoxError> + Send>),
    Async(Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>),
}

impl PendingHook {
    fn into_close_hook(self, service: &'static str) -> CloseHook {
        match self {
            PendingHook::Sync(hook) => CloseHook::Sync { service, hook },
            PendingHook::Async(hook) => CloseHook::Async { service, hook },
        }
    }
}

/// Application-lifetime mapping of service types to providers.
///
/// A registry records *how to build* each service: a fixed value, a factory,
/// or a factory with a release continuation, in sync and async flavors. It
/// never constructs anything on its own; construction happens when a
/// [`Container`](crate::Container) resolves a type against it.
///
/// One registry is created at startup and shared (`Arc`) by every container.
/// Registration is expected to happen before concurrent resolution begins;
/// re-registering at runtime (the replace pattern used in tests) is sound
/// only while no other thread resolves concurrently.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use lodestone_di::{Container, Registry};
///
/// struct Config {
///     url: String,
/// }
///
/// struct Database {
///     url: String,
/// }
///
/// let registry = Arc::new(Registry::new());
/// registry.register_value(Config {
///     url: "postgres://localhost".to_string(),
/// });
/// registry.register_factory(|| {
///     Ok(Database {
///         url: "postgres://localhost".to_string(),
///     })
/// });
///
/// let container = Container::new(registry);
/// let (config, db) = container.get_many::<(Config, Database)>().unwrap();
/// assert_eq!(config.url, db.url);
/// ```
pub struct Registry {
    /// Insertion-ordered table; overwrites replace in place so registration
    /// order (and thus ping order) survives re-registration. Linear search
    /// is fine at registry sizes.
    services: RwLock<Vec<RegisteredService>>,
    /// Registry-level close hooks, FIFO.
    on_close: Mutex<Vec<CloseHook>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            services: RwLock::new(Vec::new()),
            on_close: Mutex::new(Vec::new()),
        }
    }

    /// Starts a full-option registration for `T`.
    ///
    /// The builder carries the optional health probe and registry close hook
    /// and commits with a terminal call naming the provider kind:
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
    ///     .on_registry_close(|| Ok(()))
    ///     .factory(|| Ok(Database));
    /// ```
    pub fn register<T: 'static>(&self) -> ServiceBuilder<'_, T> {
        ServiceBuilder {
            registry: self,
            ping: None,
            on_close: None,
            _service: PhantomData,
        }
    }

    /// Registers a fixed value for `T`.
    ///
    /// Every container hands out the same instance; no cleanup is captured.
    pub fn register_value<T>(&self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.register::<T>().value(value);
    }

    /// Registers a factory for `T`, invoked once per container.
    pub fn register_factory<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register::<T>().factory(factory);
    }

    /// Registers a factory whose second return half is the release step, run
    /// at container close in reverse acquisition order.
    pub fn register_factory_with_cleanup<T, F, C>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<(T, C), BoxError> + Send + Sync + 'static,
        C: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        self.register::<T>().factory_with_cleanup(factory);
    }

    /// Registers an async factory for `T`; resolvable only through
    /// [`Container::aget`](crate::Container::aget).
    pub fn register_async_factory<T, F, Fut>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.register::<T>().async_factory(factory);
    }

    /// Registers an async factory with an async release step.
    pub fn register_async_factory_with_cleanup<T, F, Fut, C, CFut>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(T, C), BoxError>> + Send + 'static,
        C: FnOnce() -> CFut + Send + 'static,
        CFut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.register::<T>().async_factory_with_cleanup(factory);
    }

    /// Registers a factory for a [`Cleanup`] resource: the instance's own
    /// `cleanup` runs at container close.
    pub fn register_resource<T, F>(&self, factory: F)
    where
        T: Cleanup,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register::<T>().resource(factory);
    }

    /// Registers an async factory for an [`AsyncCleanup`] resource.
    pub fn register_async_resource<T, F, Fut>(&self, factory: F)
    where
        T: AsyncCleanup,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.register::<T>().async_resource(factory);
    }

    /// Whether a registration exists for `T`.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.services.read().iter().any(|s| s.key.type_id() == id)
    }

    /// One [`ServicePing`] per registration that declared a probe, in
    /// registration order.
    pub fn get_pings(&self) -> Vec<ServicePing> {
        self.services
            .read()
            .iter()
            .filter_map(|s| s.ping.clone().map(|p| ServicePing::new(s.name(), p)))
            .collect()
    }

    /// Runs every synchronous close hook exactly once, in registration order,
    /// continuing past individual failures.
    ///
    /// Async hooks cannot run on this path; each is skipped with a warning.
    /// Use [`aclose`](Self::aclose) when any were registered. Failures are
    /// collected into [`DiError::Cleanup`] and returned after the full drain.
    /// Calling `close` again is a no-op. The registry is unusable afterward
    /// by contract.
    pub fn close(&self) -> DiResult<()> {
        let hooks = mem::take(&mut *self.on_close.lock());
        let mut failures = Vec::new();
        for hook in hooks {
            match hook {
                CloseHook::Sync { service, hook } => {
                    if let Err(source) = hook() {
                        tracing::warn!(service, error = %source, "registry close hook failed");
                        failures.push(CleanupFailure { service, source });
                    }
                }
                CloseHook::Async { service, .. } => {
                    tracing::warn!(
                        service,
                        "async registry close hook skipped, use aclose()"
                    );
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::Cleanup { failures })
        }
    }

    /// Like [`close`](Self::close), but drives async hooks too.
    pub async fn aclose(&self) -> DiResult<()> {
        let hooks = mem::take(&mut *self.on_close.lock());
        let mut failures = Vec::new();
        for hook in hooks {
            let (service, result) = match hook {
                CloseHook::Sync { service, hook } => (service, hook()),
                CloseHook::Async { service, hook } => (service, hook().await),
            };
            if let Err(source) = result {
                tracing::warn!(service, error = %source, "registry close hook failed");
                failures.push(CleanupFailure { service, source });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::Cleanup { failures })
        }
    }

    fn insert(&self, service: RegisteredService, hook: Option<CloseHook>) {
        {
            let mut services = self.services.write();
            if let Some(pos) = services.iter().position(|s| s.key == service.key) {
                services[pos] = service;
            } else {
                services.push(service);
            }
        }
        if let Some(hook) = hook {
            self.on_close.lock().push(hook);
        }
    }

    pub(crate) fn lookup(&self, id: TypeId) -> Option<RegisteredService> {
        self.services
            .read()
            .iter()
            .find(|s| s.key.type_id() == id)
            .cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let hooks = mem::take(self.on_close.get_mut());
        if hooks.is_empty() {
            return;
        }
        tracing::warn!(
            pending = hooks.len(),
            "registry dropped without close(), running sync close hooks"
        );
        for hook in hooks {
            match hook {
                CloseHook::Sync { service, hook } => {
                    if let Err(error) = hook() {
                        tracing::warn!(service, error = %error, "registry close hook failed");
                    }
                }
                CloseHook::Async { service, .. } => {
                    tracing::warn!(service, "async registry close hook skipped on drop");
                }
            }
        }
    }
}

/// Registration in progress for one service type.
///
/// Optional parts ([`ping`](Self::ping), [`on_registry_close`](Self::on_registry_close))
/// chain before a terminal call picks the provider kind and commits. Nothing
/// is stored until a terminal runs.
#[must_use = "a registration does nothing until a terminal call (value, factory, ...) commits it"]
pub struct ServiceBuilder<'r, T> {
    registry: &'r Registry,
    ping: Option<Ping>,
    on_close: Option<PendingHook>,
    _service: PhantomData<fn() -> T>,
}

impl<'r, T: 'static> ServiceBuilder<'r, T> {
    /// Attaches a synchronous health probe.
    ///
    /// The probe signals "unhealthy" by returning an error; it runs without
    /// the service ever being resolved.
    pub fn ping<P>(mut self, probe: P) -> Self
    where
        P: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.ping = Some(Ping::Sync(Arc::new(probe)));
        self
    }

    /// Attaches an asynchronous health probe, driven by
    /// [`ServicePing::aping`](crate::ServicePing::aping).
    pub fn aping<P, Fut>(mut self, probe: P) -> Self
    where
        P: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.ping = Some(Ping::Async(Arc::new(move || {
            Box::pin(probe()) as BoxFuture<'static, _>
        })));
        self
    }

    /// Attaches a hook run once when the *registry* closes.
    ///
    /// This releases whatever the factory itself holds (a pool, a client),
    /// not per-container instances.
    pub fn on_registry_close<H>(mut self, hook: H) -> Self
    where
        H: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        self.on_close = Some(PendingHook::Sync(Box::new(hook)));
        self
    }

    /// Async variant of [`on_registry_close`](Self::on_registry_close), run
    /// by [`Registry::aclose`].
    pub fn on_registry_aclose<H, Fut>(mut self, hook: H) -> Self
    where
        H: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_close = Some(PendingHook::Async(Box::new(move || {
            Box::pin(hook()) as BoxFuture<'static, _>
        })));
        self
    }

    fn commit(self, provider: Provider) {
        let key = ServiceKey::of::<T>();
        let hook = self
            .on_close
            .map(|h| h.into_close_hook(key.display_name()));
        self.registry.insert(
            RegisteredService {
                key,
                provider,
                ping: self.ping,
            },
            hook,
        );
    }
}

impl<'r, T: Send + Sync + 'static> ServiceBuilder<'r, T> {
    /// Commits a fixed-value registration.
    pub fn value(self, value: T) {
        self.commit(Provider::Value(Arc::new(value)));
    }

    /// Commits a factory registration.
    pub fn factory<F>(self, factory: F)
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.commit(Provider::Factory(Arc::new(move || {
            factory().map(|value| Arc::new(value) as AnyArc)
        })));
    }

    /// Commits a factory-with-cleanup registration: the factory acquires the
    /// instance and returns the release step alongside it.
    pub fn factory_with_cleanup<F, C>(self, factory: F)
    where
        F: Fn() -> Result<(T, C), BoxError> + Send + Sync + 'static,
        C: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        self.commit(Provider::FactoryWithCleanup(Arc::new(move || {
            let (value, cleanup) = factory()?;
            Ok((Arc::new(value) as AnyArc, Box::new(cleanup) as SyncCleanupFn))
        })));
    }

    /// Commits an async factory registration.
    pub fn async_factory<F, Fut>(self, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.commit(Provider::AsyncFactory(Arc::new(move || {
            let fut = factory();
            Box::pin(async move { fut.await.map(|value| Arc::new(value) as AnyArc) })
                as BoxFuture<'static, _>
        })));
    }

    /// Commits an async factory-with-cleanup registration.
    pub fn async_factory_with_cleanup<F, Fut, C, CFut>(self, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(T, C), BoxError>> + Send + 'static,
        C: FnOnce() -> CFut + Send + 'static,
        CFut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.commit(Provider::AsyncFactoryWithCleanup(Arc::new(move || {
            let fut = factory();
            Box::pin(async move {
                let (value, cleanup) = fut.await?;
                let cleanup: AsyncCleanupFn =
                    Box::new(move || Box::pin(cleanup()) as BoxFuture<'static, _>);
                Ok((Arc::new(value) as AnyArc, cleanup))
            }) as BoxFuture<'static, _>
        })));
    }

    /// Commits a factory registration for a [`Cleanup`] resource; the cached
    /// instance's own `cleanup` becomes the release step.
    pub fn resource<F>(self, factory: F)
    where
        T: Cleanup,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.commit(Provider::FactoryWithCleanup(Arc::new(move || {
            let instance = Arc::new(factory()?);
            let handle = instance.clone();
            let cleanup: SyncCleanupFn = Box::new(move || handle.cleanup());
            Ok((instance as AnyArc, cleanup))
        })));
    }

    /// Async counterpart of [`resource`](Self::resource) for
    /// [`AsyncCleanup`] resources.
    pub fn async_resource<F, Fut>(self, factory: F)
    where
        T: AsyncCleanup,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.commit(Provider::AsyncFactoryWithCleanup(Arc::new(move || {
            let fut = factory();
            Box::pin(async move {
                let instance = Arc::new(fut.await?);
                let handle = instance.clone();
                let cleanup: AsyncCleanupFn = Box::new(move || {
                    Box::pin(async move { handle.cleanup().await }) as BoxFuture<'static, _>
                });
                Ok((instance as AnyArc, cleanup))
            }) as BoxFuture<'static, _>
        })));
    }
}
