//! Validate configuration command

use anyhow::{Context, Result};
use true_ecs_core::Settings;
use true_ecs_runtime::engine::matching_directories;

/// Run the validate command
pub fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let settings = Settings::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Targets: {}", settings.targets.join(", "));
    tracing::info!("✓ Data directory: {}", settings.data_directory);
    tracing::info!(
        "✓ Files: image={} data={} wcs={} output={}",
        settings.image_filename,
        settings.data_filename,
        settings.wcs_filename,
        settings.output_filename
    );
    tracing::info!(
        "✓ Overwrite: wcs={} output={}, ICRS: {}",
        settings.overwrite_wcs_file,
        settings.overwrite_output_file,
        settings.transform_to_icrs
    );
    if let Some(bounds) = settings.custom_scale_bounds {
        tracing::info!(
            "✓ Scale bounds: {} to {} {}",
            bounds.lower,
            bounds.upper,
            true_ecs_core::ScaleBounds::UNITS
        );
    }
    tracing::info!("✓ Plate solver: {}", settings.astrometry_url);

    for target in &settings.targets {
        let directories = matching_directories(&settings, target)?;
        if directories.is_empty() {
            tracing::warn!("{}: no matching directories", target);
        }
        for directory in directories {
            tracing::info!("{}: {}", target, directory.display());
        }
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
