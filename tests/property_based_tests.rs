//! Property tests over the public API: script determinism, channel
//! initialisation and store round trips through the orchestrator.

use artrpc::{Config, NativeRunner, Orchestrator, ScriptTemplate, Store};
use proptest::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

fn store_strategy() -> impl Strategy<Value = Store> {
    let var = prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        Just(Value::Null),
        proptest::collection::vec(any::<i32>(), 0..4).prop_map(|v| json!(v)),
    ];
    (
        proptest::option::of(proptest::collection::vec("[a-z]{1,6}->[a-z ]{0,10}", 0..6)),
        proptest::collection::btree_map("[a-z_]{1,8}", var, 0..6),
    )
        .prop_map(|(signals, vars)| {
            let mut store = Store::new();
            store.signals = signals;
            for (key, value) in vars {
                store.set_var(key, value);
            }
            store
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_script_is_deterministic(body in ".*", name in "[a-z][a-z0-9_-]{0,10}") {
        let template = ScriptTemplate::new(name).unwrap();
        prop_assert_eq!(template.render(&body), template.render(&body));
        prop_assert!(template.render(&body).ends_with(&body));
    }

    #[test]
    fn prop_ensure_channels_keeps_existing_values(store in store_strategy()) {
        let mut initialised = store.clone();
        initialised.ensure_channels();

        prop_assert_eq!(
            initialised.signals.clone().unwrap_or_default(),
            store.signals.clone().unwrap_or_default()
        );
        for (key, value) in store.vars.iter().flatten() {
            prop_assert_eq!(initialised.var(key), Some(value));
        }

        let mut twice = initialised.clone();
        twice.ensure_channels();
        prop_assert_eq!(twice, initialised);
    }

    #[test]
    fn prop_commit_then_load_round_trips(store in store_strategy()) {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home").to_str().unwrap().to_string();
        let config = Config::builder()
            .home(home)
            .executable("/nonexistent/arturo")
            .build()
            .unwrap();
        let mut orchestrator =
            Orchestrator::without_initial_load(&config, NativeRunner::new()).unwrap();

        orchestrator.commit(Some(store.clone())).unwrap();
        prop_assert!(orchestrator.load().unwrap());

        prop_assert_eq!(orchestrator.store(), &store);
        prop_assert_eq!(orchestrator.read_document().unwrap(), store);
    }
}
