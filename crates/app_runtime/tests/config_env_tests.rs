//! Environment-driven configuration
//!
//! Kept in its own test binary because it mutates process environment.

use app_runtime::{LendingConfig, LendingRuntime, StorageBackend};
use core_kernel::Currency;

#[tokio::test]
async fn test_env_vars_override_defaults() {
    std::env::set_var("LENDING__STORAGE", "memory");
    std::env::set_var("LENDING__CURRENCY", "GBP");
    std::env::set_var("LENDING__TIMEZONE", "Europe/London");
    std::env::set_var("LENDING__LOG__JSON", "true");
    std::env::set_var("LENDING__DATABASE__MAX_CONNECTIONS", "4");

    let config = LendingConfig::load().unwrap();
    assert_eq!(config.storage, StorageBackend::Memory);
    assert_eq!(config.currency().unwrap(), Currency::GBP);
    assert!(config.log.json);
    assert_eq!(config.database.max_connections, 4);
    assert_eq!(config.category_table().unwrap().len(), 4);

    let runtime = LendingRuntime::start(config).await.unwrap();
    assert_eq!(runtime.currency(), Currency::GBP);
    runtime.shutdown().await;
}
