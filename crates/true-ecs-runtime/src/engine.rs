//! Batch driver
//!
//! Authenticates once, then walks every target in declaration order and
//! every directory its pattern matches, one at a time.

use anyhow::Context;
use directories::BaseDirs;
use std::path::PathBuf;
use true_ecs_core::Settings;

use crate::error::Result;
use crate::processor::{DirectoryOutcome, TargetProcessor};
use crate::solver::WcsProvider;

/// Outcomes for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    /// Target identifier
    pub target: String,
    /// Matched directories with their outcome, in discovery order
    pub directories: Vec<(PathBuf, DirectoryOutcome)>,
}

/// Outcomes of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// One entry per configured target
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    fn outcomes(&self) -> impl Iterator<Item = &DirectoryOutcome> {
        self.targets
            .iter()
            .flat_map(|t| t.directories.iter().map(|(_, o)| o))
    }

    /// Directories whose output was written.
    pub fn done(&self) -> usize {
        self.outcomes()
            .filter(|o| matches!(o, DirectoryOutcome::Done { .. }))
            .count()
    }

    /// Directories skipped.
    pub fn skipped(&self) -> usize {
        self.outcomes()
            .filter(|o| matches!(o, DirectoryOutcome::Skipped(_)))
            .count()
    }

    /// Directories that failed.
    pub fn failed(&self) -> usize {
        self.outcomes()
            .filter(|o| matches!(o, DirectoryOutcome::Failed { .. }))
            .count()
    }
}

/// Runtime driving a batch with a given WCS provider.
pub struct Runtime<P: WcsProvider> {
    settings: Settings,
    provider: P,
}

impl<P: WcsProvider> Runtime<P> {
    /// Create a runtime from validated settings.
    pub fn new(settings: Settings, provider: P) -> Self {
        Self { settings, provider }
    }

    /// The provider, e.g. to inspect it after a run.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Check the directory patterns, authenticate, then process every target.
    ///
    /// Malformed directory patterns and authentication failure are fatal
    /// and stop the run before any directory is touched. Everything else
    /// is reported per directory.
    pub fn run(&mut self) -> Result<RunReport> {
        let patterns = directory_patterns(&self.settings)?;

        self.provider
            .authenticate(&self.settings.astrometry_api_key)
            .context("Authentication with the plate-solving service failed")?;

        let processor = TargetProcessor::new(&self.settings);
        let mut report = RunReport::default();

        for (target, pattern) in self.settings.targets.iter().zip(&patterns) {
            tracing::info!("TARGET: {}", target);
            let mut target_report = TargetReport {
                target: target.clone(),
                directories: Vec::new(),
            };

            for directory in glob_directories(pattern)? {
                tracing::info!("Found in: {}", directory.display());
                let outcome = processor.process(&mut self.provider, target, &directory);
                target_report.directories.push((directory, outcome));
            }

            report.targets.push(target_report);
        }

        tracing::info!(
            "Finished: {} written, {} skipped, {} failed",
            report.done(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }
}

/// The expanded data-directory pattern of every target, in target order.
///
/// Fails on the first pattern that is not a valid glob.
pub fn directory_patterns(settings: &Settings) -> Result<Vec<String>> {
    settings
        .targets
        .iter()
        .map(|target| -> Result<String> {
            let pattern = expand_home(&settings.directory_pattern(target));
            glob::Pattern::new(&pattern).with_context(|| {
                format!("Invalid data_directory pattern '{}' for target {}", pattern, target)
            })?;
            Ok(pattern)
        })
        .collect()
}

/// Directories matched by the target's data-directory pattern, sorted.
pub fn matching_directories(settings: &Settings, target: &str) -> Result<Vec<PathBuf>> {
    glob_directories(&expand_home(&settings.directory_pattern(target)))
}

fn glob_directories(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .with_context(|| format!("Invalid data_directory pattern '{}'", pattern))?;

    let mut directories = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_dir() => directories.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("Cannot read {}: {}", e.path().display(), e.error()),
        }
    }
    if directories.is_empty() {
        tracing::debug!("No directories match {}", pattern);
    }
    Ok(directories)
}

/// Replace a leading `~` with the user's home directory.
fn expand_home(pattern: &str) -> String {
    let rest = match pattern.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return pattern.to_string(),
    };
    match BaseDirs::new() {
        Some(dirs) => format!("{}{}", dirs.home_dir().display(), rest),
        None => pattern.to_string(),
    }
}
