//! Cross-pool coordination and staged publishing

mod common;

use std::sync::Arc;

use common::{build_runtime, EventLog, RecordingPlugin};
use poolhook_core::coordinator::{GlobalCoordinator, PluginPublisher, PoolSelector};
use poolhook_core::error::PoolHookError;
use poolhook_core::plugin::{Capability, Plugin};
use poolhook_core::registry::{FnRegistrar, Registrar};
use tokio_test::{assert_err, assert_ok};

fn coordinator_with_pools(pool_ids: &[&str]) -> GlobalCoordinator {
    let coordinator = GlobalCoordinator::new();
    for pool_id in pool_ids {
        assert!(coordinator.register_pool(build_runtime(pool_id, 1, 1, 8)));
    }
    coordinator
}

fn per_pool_registrar(log: &EventLog) -> Arc<dyn Registrar> {
    let log = log.clone();
    Arc::new(FnRegistrar::new("per-pool", move |registry| {
        let id = format!("local-{}", registry.pool_id());
        registry.register(RecordingPlugin::new(&id, 0, &log));
    }))
}

#[test]
fn test_shared_plugin_is_one_instance_across_pools() {
    let log = EventLog::new();
    let coordinator = coordinator_with_pools(&["orders", "billing", "audit"]);
    let shared = RecordingPlugin::new("shared", 0, &log);
    assert!(coordinator.register_plugin(shared.clone()));
    assert!(!coordinator.register_plugin(shared.clone()));

    assert!(coordinator.apply_plugin_to_pool("shared", &PoolSelector::All));

    let instances = coordinator.get_plugins_by_id("shared");
    assert_eq!(instances.len(), 3);
    assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(shared.starts(), 3);
    assert_eq!(coordinator.get_all_plugins_across_pools().len(), 3);
    assert_eq!(coordinator.get_plugins_of_capability(Capability::TaskAware).len(), 3);
}

#[test]
fn test_broadcast_return_values() {
    let log = EventLog::new();
    let coordinator = coordinator_with_pools(&["orders", "billing"]);
    coordinator.register_plugin(RecordingPlugin::new("shared", 0, &log));

    assert!(!coordinator.apply_plugin_to_pool("missing", &PoolSelector::All));
    assert!(!coordinator.apply_plugin_to_pool("shared", &PoolSelector::pool("nowhere")));
    assert!(coordinator.apply_plugin_to_pool("shared", &PoolSelector::pools(["orders", "nowhere"])));

    assert!(coordinator.get_pool("orders").unwrap().registry().is_registered("shared"));
    assert!(!coordinator.get_pool("billing").unwrap().registry().is_registered("shared"));

    assert!(coordinator.disable_plugin("shared", &PoolSelector::All));
    assert!(!coordinator.get_pool("orders").unwrap().registry().is_enabled("shared"));
    assert!(!coordinator.disable_plugin("shared", &PoolSelector::pool("billing")));
    assert!(coordinator.enable_plugin("shared", &PoolSelector::All));
    assert!(coordinator.get_pool("orders").unwrap().registry().is_enabled("shared"));
}

#[test]
fn test_registrar_creates_fresh_instances_per_pool() {
    let log = EventLog::new();
    let coordinator = coordinator_with_pools(&["orders", "billing"]);
    assert_ok!(coordinator.register_registrar(per_pool_registrar(&log)));

    let duplicate = coordinator.register_registrar(per_pool_registrar(&log));
    assert!(matches!(
        assert_err!(duplicate),
        PoolHookError::DuplicateRegistrar { .. }
    ));

    assert!(coordinator.apply_registrar_to_pool("per-pool", &PoolSelector::All));
    assert!(!coordinator.apply_registrar_to_pool("unknown", &PoolSelector::All));

    assert_eq!(coordinator.get_plugins_by_id("local-orders").len(), 1);
    assert_eq!(coordinator.get_plugins_by_id("local-billing").len(), 1);
    assert!(coordinator.get_plugins_by_id("local-audit").is_empty());
}

#[test]
fn test_apply_all_to_pool_registers_everything() {
    let log = EventLog::new();
    let coordinator = coordinator_with_pools(&["orders"]);
    coordinator.register_plugin(RecordingPlugin::new("shared", 0, &log));
    let singleton: Arc<dyn Plugin> = RecordingPlugin::new("singleton", 0, &log);
    let registrar = assert_ok!(coordinator.register_singleton_registrar(singleton));
    assert_eq!(registrar.id(), "singleton");
    assert_ok!(coordinator.register_registrar(per_pool_registrar(&log)));

    assert!(!coordinator.apply_all_to_pool("unknown"));
    assert!(coordinator.apply_all_to_pool("orders"));

    let registry_ids: Vec<String> = coordinator
        .get_pool("orders")
        .unwrap()
        .registry()
        .get_all()
        .iter()
        .map(|plugin| plugin.id().to_string())
        .collect();
    for expected in ["shared", "singleton", "local-orders"] {
        assert!(registry_ids.iter().any(|id| id == expected), "missing {expected}");
    }

    // Applying again changes nothing
    coordinator.apply_all_to_all_pools();
    assert_eq!(coordinator.get_pool("orders").unwrap().registry().len(), 3);
}

#[test]
fn test_unregister_pool_leaves_its_plugins_alone() {
    let log = EventLog::new();
    let coordinator = coordinator_with_pools(&["orders"]);
    let shared = RecordingPlugin::new("shared", 0, &log);
    coordinator.register_plugin(shared.clone());
    coordinator.apply_plugin_to_pool("shared", &PoolSelector::All);

    let runtime = coordinator.unregister_pool("orders").unwrap();
    assert!(coordinator.get_all_pools().is_empty());
    assert!(runtime.registry().is_registered("shared"));
    assert_eq!(shared.stops(), 0);

    assert!(coordinator.unregister_plugin("shared").is_some());
    assert!(coordinator.get_plugin("shared").is_none());
    runtime.shutdown();
}

#[test]
fn test_publisher_applies_staged_items_on_commit() {
    let log = EventLog::new();
    let coordinator = Arc::new(GlobalCoordinator::new());
    let publisher = PluginPublisher::new(Arc::clone(&coordinator));

    assert!(publisher.stage_pool(build_runtime("orders", 1, 1, 8)));
    assert!(publisher.stage_plugin(RecordingPlugin::new("shared", 0, &log)));
    assert_ok!(publisher.stage_registrar(per_pool_registrar(&log)));

    let orders = coordinator.get_pool("orders").unwrap();
    assert!(orders.registry().is_empty());
    assert!(!publisher.is_committed());

    publisher.commit();
    publisher.commit();
    assert!(publisher.is_committed());
    assert!(orders.registry().is_registered("shared"));
    assert!(orders.registry().is_registered("local-orders"));
    assert_eq!(orders.registry().len(), 2);

    // Staged after commit: applied immediately in both directions
    assert!(publisher.stage_pool(build_runtime("billing", 1, 1, 8)));
    let billing = coordinator.get_pool("billing").unwrap();
    assert!(billing.registry().is_registered("shared"));
    assert!(billing.registry().is_registered("local-billing"));

    assert!(publisher.stage_plugin(RecordingPlugin::new("late", 0, &log)));
    assert!(orders.registry().is_registered("late"));
    assert!(billing.registry().is_registered("late"));

    assert!(!publisher.stage_pool(build_runtime("orders", 1, 1, 8)));
    assert_err!(publisher.stage_registrar(per_pool_registrar(&log)));
}
