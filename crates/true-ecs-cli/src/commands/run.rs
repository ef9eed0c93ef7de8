//! Run the batch conversion

use anyhow::{Context, Result};
use true_ecs_core::Settings;
use true_ecs_runtime::{AstrometryClient, Runtime};

/// Run every configured target
///
/// Directory-level failures are logged by the runtime and leave the exit
/// status untouched; only configuration and authentication errors fail.
pub fn run(config_path: &str) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let settings = Settings::load(config_path).context("Failed to load configuration")?;
    let client = AstrometryClient::from_settings(&settings)?;

    let mut runtime = Runtime::new(settings, client);
    runtime.run()?;
    Ok(())
}
