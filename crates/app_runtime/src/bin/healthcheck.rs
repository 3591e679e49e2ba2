//! Circulation store health check
//!
//! Loads the runtime configuration, starts the runtime (applying pending
//! migrations), prints the store's health as JSON and exits non-zero when
//! the store is not healthy.
//!
//! ```bash
//! LENDING__DATABASE__URL=postgres://library@db/library lending-healthcheck
//! ```

use anyhow::Context;

use app_runtime::{init_tracing, LendingConfig, LendingRuntime};
use core_kernel::AdapterHealth;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LendingConfig::load().context("loading configuration")?;
    init_tracing(&config.log).context("initialising tracing")?;

    let runtime = LendingRuntime::start(config)
        .await
        .context("starting circulation runtime")?;

    let health = runtime.health().await;
    println!("{}", serde_json::to_string_pretty(&health)?);
    runtime.shutdown().await;

    if health.status != AdapterHealth::Healthy {
        anyhow::bail!("lending store is {:?}", health.status);
    }
    Ok(())
}
