use std::sync::{Arc, Mutex};

use lodestone_di::{BoxError, Cleanup, Container, DiError, Registry};

type Log = Arc<Mutex<Vec<&'static str>>>;

struct ServiceA;
struct ServiceB;
struct ServiceC;

/// Registers a cleanup-bearing factory that appends `tag` to `log` when its
/// release step runs.
macro_rules! register_logged {
    ($registry:expr, $log:expr, $value:expr, $tag:literal) => {{
        let log: Log = $log.clone();
        $registry.register_factory_with_cleanup(move || {
            let log = log.clone();
            Ok(($value, move || {
                log.lock().unwrap().push($tag);
                Ok(())
            }))
        });
    }};
}

#[test]
fn close_runs_cleanups_in_reverse_acquisition_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new());
    register_logged!(registry, log, ServiceA, "a");
    register_logged!(registry, log, ServiceB, "b");
    register_logged!(registry, log, ServiceC, "c");

    let container = Container::new(registry);
    container.get::<ServiceA>().unwrap();
    container.get::<ServiceB>().unwrap();
    container.get::<ServiceC>().unwrap();
    assert!(log.lock().unwrap().is_empty());

    container.close().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
}

#[test]
fn close_is_idempotent() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new());
    register_logged!(registry, log, ServiceA, "a");

    let container = Container::new(registry);
    container.get::<ServiceA>().unwrap();
    container.close().unwrap();
    container.close().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["a"]);
}

#[test]
fn single_step_factory_yields_then_cleans_up() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new());
    register_logged!(registry, log, 1u32, "done");

    let container = Container::new(registry);
    assert_eq!(*container.get::<u32>().unwrap(), 1);
    assert!(log.lock().unwrap().is_empty());

    container.close().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["done"]);
}

#[test]
fn forget_about_rebuilds_but_keeps_the_old_cleanup_queued() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new());
    register_logged!(registry, log, ServiceA, "cleanup");

    let container = Container::new(registry);
    let first = container.get::<ServiceA>().unwrap();
    container.forget_about::<ServiceA>();
    let second = container.get::<ServiceA>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    // Both the old and the new instance's cleanups fire.
    container.close().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["cleanup", "cleanup"]);
}

#[test]
fn forget_about_unresolved_type_is_a_no_op() {
    let registry = Arc::new(Registry::new());
    let container = Container::new(registry);
    container.forget_about::<ServiceA>();
    container.close().unwrap();
}

#[test]
fn cleanup_failure_does_not_stop_the_drain() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new());
    register_logged!(registry, log, ServiceA, "a");
    registry.register_factory_with_cleanup(|| {
        Ok((ServiceB, || Err::<(), BoxError>("flush failed".into())))
    });
    register_logged!(registry, log, ServiceC, "c");

    let container = Container::new(registry);
    container.get::<ServiceA>().unwrap();
    container.get::<ServiceB>().unwrap();
    container.get::<ServiceC>().unwrap();

    match container.close() {
        Err(DiError::Cleanup { failures }) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].service.ends_with("ServiceB"));
            assert_eq!(failures[0].source.to_string(), "flush failed");
        }
        other => panic!("unexpected: {other:?}"),
    }
    // The failing step did not prevent its neighbors from running.
    assert_eq!(*log.lock().unwrap(), vec!["c", "a"]);
}

#[test]
fn dropping_a_container_drains_sync_cleanups() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new());
    register_logged!(registry, log, ServiceA, "a");
    register_logged!(registry, log, ServiceB, "b");

    {
        let container = Container::new(registry);
        container.get::<ServiceA>().unwrap();
        container.get::<ServiceB>().unwrap();
    }

    assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
}

#[test]
fn resource_cleanup_runs_on_the_cached_instance() {
    struct Flusher {
        log: Log,
    }

    impl Cleanup for Flusher {
        fn cleanup(&self) -> Result<(), BoxError> {
            self.log.lock().unwrap().push("flushed");
            Ok(())
        }
    }

    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new());
    let factory_log = log.clone();
    registry.register_resource(move || {
        Ok(Flusher {
            log: factory_log.clone(),
        })
    });

    let container = Container::new(registry);
    container.get::<Flusher>().unwrap();
    container.close().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["flushed"]);
}

#[test]
fn registry_close_hooks_run_in_registration_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Registry::new();

    let first = log.clone();
    registry
        .register::<ServiceA>()
        .on_registry_close(move || {
            first.lock().unwrap().push("pool-a");
            Ok(())
        })
        .factory(|| Ok(ServiceA));

    let second = log.clone();
    registry
        .register::<ServiceB>()
        .on_registry_close(move || {
            second.lock().unwrap().push("pool-b");
            Ok(())
        })
        .factory(|| Ok(ServiceB));

    registry.close().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["pool-a", "pool-b"]);
}

#[test]
fn registry_close_hooks_run_exactly_once_and_continue_past_failure() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Registry::new();

    registry
        .register::<ServiceA>()
        .on_registry_close(|| Err("pool leak".into()))
        .factory(|| Ok(ServiceA));

    let survivor = log.clone();
    registry
        .register::<ServiceB>()
        .on_registry_close(move || {
            survivor.lock().unwrap().push("pool-b");
            Ok(())
        })
        .factory(|| Ok(ServiceB));

    match registry.close() {
        Err(DiError::Cleanup { failures }) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].service.ends_with("ServiceA"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(*log.lock().unwrap(), vec!["pool-b"]);

    // Second close finds nothing left to run.
    registry.close().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["pool-b"]);
}

#[test]
fn container_close_does_not_touch_registry_hooks() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new());

    let hook_log = log.clone();
    registry
        .register::<ServiceA>()
        .on_registry_close(move || {
            hook_log.lock().unwrap().push("registry");
            Ok(())
        })
        .factory(|| Ok(ServiceA));

    let container = Container::new(registry.clone());
    container.get::<ServiceA>().unwrap();
    container.close().unwrap();
    assert!(log.lock().unwrap().is_empty());

    registry.close().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["registry"]);
}
