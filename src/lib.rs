//! # lodestone-di
//!
//! Service registry and per-request container with deterministic teardown
//! and health-check probes.
//!
//! ## Features
//!
//! - **Central registry**: register how to build each service once, at
//!   startup — a fixed value, a factory, or a factory with a release step
//! - **Per-scope caching**: each container constructs a service at most
//!   once and hands out shared `Arc` handles
//! - **Deterministic teardown**: release steps run at container close in
//!   reverse acquisition order, like nested resource acquisition
//! - **Sync/async duality**: `get`/`close` and `aget`/`aclose` mirror each
//!   other end to end; mixed acquisitions drain correctly under `aclose`
//! - **Health probes**: per-registration pings that run without
//!   instantiating anything
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use lodestone_di::{Container, Registry};
//!
//! struct Config {
//!     greeting: String,
//! }
//!
//! struct Greeter {
//!     prefix: String,
//! }
//!
//! // Register at startup.
//! let registry = Arc::new(Registry::new());
//! registry.register_value(Config {
//!     greeting: "hello".to_string(),
//! });
//! registry.register_factory(|| {
//!     Ok(Greeter {
//!         prefix: "hello".to_string(),
//!     })
//! });
//!
//! // One container per unit of work.
//! let container = Container::new(registry.clone());
//! let (config, greeter) = container.get_many::<(Config, Greeter)>().unwrap();
//! assert_eq!(config.greeting, greeter.prefix);
//! container.close().unwrap();
//! ```
//!
//! ## Cleanup
//!
//! A factory can return its release step alongside the instance. The step
//! runs when the container closes, after everything acquired later has been
//! released:
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use lodestone_di::{Container, Registry};
//!
//! struct Session(u32);
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let registry = Arc::new(Registry::new());
//!
//! let release_log = log.clone();
//! registry.register_factory_with_cleanup(move || {
//!     let log = release_log.clone();
//!     Ok((Session(1), move || {
//!         log.lock().unwrap().push("released");
//!         Ok(())
//!     }))
//! });
//!
//! let container = Container::new(registry);
//! let session = container.get::<Session>().unwrap();
//! assert_eq!(session.0, 1);
//! assert!(log.lock().unwrap().is_empty());
//!
//! container.close().unwrap();
//! assert_eq!(*log.lock().unwrap(), vec!["released"]);
//! ```
//!
//! ## Health checks
//!
//! Registrations may carry a ping; probing never constructs the service:
//!
//! ```rust
//! use lodestone_di::Registry;
//!
//! struct Database;
//!
//! let registry = Registry::new();
//! registry
//!     .register::<Database>()
//!     .ping(|| Err("connection refused".into()))
//!     .factory(|| Ok(Database));
//!
//! for ping in registry.get_pings() {
//!     assert!(ping.ping().is_err());
//! }
//! ```

pub mod container;
pub mod error;
pub mod key;
pub mod ping;
pub mod registry;
pub mod traits;

mod internal;
mod registration;

pub use container::{Container, ServiceSet};
pub use error::{BoxError, CleanupFailure, DiError, DiResult};
pub use key::ServiceKey;
pub use ping::ServicePing;
pub use registry::{Registry, ServiceBuilder};
pub use traits::{AsyncCleanup, Cleanup};
