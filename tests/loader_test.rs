//! Layered configuration loading from files and environment overrides

use std::collections::HashMap;
use std::fs;

use poolhook_core::config::ConfigLoader;
use poolhook_core::executor::DynamicThreadPoolExecutor;
use tempfile::TempDir;

const BASE: &str = r#"
[plugins]
includes = "*"
excludes = "task-reject-alarm"

[plugins.plugins.task-timeout-alarm]
execute-timeout-ms = "500"

[pools.orders]
execute_timeout_ms = 250
await_termination_ms = 100
wait_for_tasks_to_complete_on_shutdown = false

[pools.orders.thread_pool]
core_pool_size = 2
maximum_pool_size = 4
queue_capacity = 16
thread_name_prefix = "orders"

[pools.orders.plugins]
excludes = ""
"#;

const TEST_OVERRIDES: &str = r#"
[pools.orders.thread_pool]
maximum_pool_size = 6
"#;

#[test]
fn test_directory_layers_environment_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("poolhook.toml"), BASE).unwrap();
    fs::write(dir.path().join("poolhook.test.toml"), TEST_OVERRIDES).unwrap();

    let config = ConfigLoader::new()
        .with_environment("test")
        .with_directory(dir.path())
        .without_env_overrides()
        .load()
        .unwrap();

    let orders = config.pool("orders").unwrap();
    assert_eq!(orders.thread_pool.core_pool_size, 2);
    assert_eq!(orders.thread_pool.maximum_pool_size, 6);
    assert_eq!(orders.thread_pool.queue_capacity, 16);
    assert_eq!(orders.execute_timeout_ms, 250);
    assert!(!orders.wait_for_tasks_to_complete_on_shutdown);

    let merged = config.plugin_properties_for("orders").unwrap();
    assert_eq!(merged.includes.as_deref(), Some("*"));
    assert_eq!(merged.excludes.as_deref(), Some(""));
    assert_eq!(merged.plugins["task-timeout-alarm"]["execute-timeout-ms"], "500");
}

#[test]
fn test_missing_directory_files_are_optional() {
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::new()
        .with_environment("production")
        .with_directory(dir.path())
        .without_env_overrides()
        .load()
        .unwrap();
    assert!(config.pools.is_empty());
}

#[test]
fn test_explicit_file_must_exist() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .with_file(dir.path().join("absent.toml"))
        .without_env_overrides()
        .load();
    assert!(result.is_err());
}

#[test]
fn test_env_overrides_and_pool_construction() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pools.toml");
    fs::write(&path, BASE).unwrap();

    let mut vars = HashMap::new();
    vars.insert(
        "POOLHOOK__POOLS__ORDERS__AWAIT_TERMINATION_MS".to_string(),
        "40".to_string(),
    );
    let config = ConfigLoader::new()
        .with_file(&path)
        .with_env_overrides(vars)
        .load()
        .unwrap();

    let orders = config.pool("orders").unwrap();
    assert_eq!(orders.await_termination_ms, 40);

    let pool = DynamicThreadPoolExecutor::new("orders", orders).unwrap();
    assert_eq!(pool.execute_timeout(), Some(250));
    assert_eq!(pool.await_termination(), Some(40));
    pool.destroy();
}
