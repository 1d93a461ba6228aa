//! Property-based tests for registration and teardown invariants.

use std::sync::{Arc, Mutex};

use lodestone_di::{Container, Registry};
use proptest::prelude::*;

#[derive(Debug)]
struct Tagged {
    id: u32,
}

#[derive(Debug)]
struct Step(usize);

proptest! {
    // Any overwrite sequence: a fresh container always sees the last registration.
    #[test]
    fn last_registration_wins(ids in prop::collection::vec(0u32..1000, 1..10)) {
        let registry = Arc::new(Registry::new());
        for id in &ids {
            let id = *id;
            registry.register_factory(move || Ok(Tagged { id }));
        }

        let container = Container::new(registry);
        let resolved = container.get::<Tagged>().unwrap();
        prop_assert_eq!(resolved.id, *ids.last().unwrap());
    }
}

proptest! {
    // Repeated resolution never re-runs the factory within one container.
    #[test]
    fn resolution_is_cached(repeats in 1usize..20) {
        let registry = Arc::new(Registry::new());
        let calls = Arc::new(Mutex::new(0u32));

        let factory_calls = calls.clone();
        registry.register_factory(move || {
            *factory_calls.lock().unwrap() += 1;
            Ok(Tagged { id: 7 })
        });

        let container = Container::new(registry);
        let first = container.get::<Tagged>().unwrap();
        for _ in 0..repeats {
            let again = container.get::<Tagged>().unwrap();
            prop_assert!(Arc::ptr_eq(&first, &again));
        }
        prop_assert_eq!(*calls.lock().unwrap(), 1);
    }
}

proptest! {
    // Cleanup order is the exact reverse of acquisition order, for any count.
    //
    // One cleanup-bearing registration per step is simulated with a single
    // registration plus forget_about: every acquisition queues its own step.
    #[test]
    fn cleanups_drain_in_reverse(count in 1usize..20) {
        let registry = Arc::new(Registry::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let next = Arc::new(Mutex::new(0usize));

        let cleanup_order = order.clone();
        let counter = next.clone();
        registry.register_factory_with_cleanup(move || {
            let mut n = counter.lock().unwrap();
            let id = *n;
            *n += 1;
            let order = cleanup_order.clone();
            Ok((Step(id), move || {
                order.lock().unwrap().push(id);
                Ok(())
            }))
        });

        let container = Container::new(registry);
        for _ in 0..count {
            container.get::<Step>().unwrap();
            container.forget_about::<Step>();
        }

        container.close().unwrap();
        let expected: Vec<usize> = (0..count).rev().collect();
        prop_assert_eq!(&*order.lock().unwrap(), &expected);
    }
}
