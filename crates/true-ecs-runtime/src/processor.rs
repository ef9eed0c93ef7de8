//! Per-directory processing state machine.
//!
//! For one (target, directory) pair the processor walks
//!
//! ```text
//! NeedWcs ──▶ HaveWcs ──▶ NeedConversion ──▶ Done
//!    │           ├──▶ SkippedExistingOutput
//!    ▼           └──▶ SkippedMissingData
//! SkippedMissingImage
//! ```
//!
//! A skip or failure ends the pair only; it is reported as a
//! [`DirectoryOutcome`] and never aborts the batch.

use std::path::{Path, PathBuf};

use true_ecs_core::config::TargetFiles;
use true_ecs_core::{OutputTable, PixelTable, Settings, WcsSolution, converter};

use crate::error::Result;
use crate::solver::WcsProvider;

/// States of one (target, directory) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    /// WCS file must be checked and possibly queried
    NeedWcs,
    /// WCS file is in place
    HaveWcs,
    /// Pixel data must be converted and written
    NeedConversion,
    /// Output written
    Done,
    /// A WCS query was required but the image is missing
    SkippedMissingImage,
    /// Pixel-data file is missing
    SkippedMissingData,
    /// Output exists and overwriting was not requested
    SkippedExistingOutput,
}

impl DirectoryState {
    /// Whether processing stops in this state.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            DirectoryState::NeedWcs | DirectoryState::HaveWcs | DirectoryState::NeedConversion
        )
    }
}

/// Why a pair was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Image needed for plate solving does not exist
    MissingImage(PathBuf),
    /// Pixel-data file does not exist
    MissingData(PathBuf),
    /// Output file already exists
    ExistingOutput(PathBuf),
}

/// Result of processing one (target, directory) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOutcome {
    /// Output table written
    Done {
        /// Path of the written table
        output: PathBuf,
    },
    /// Nothing (more) to do for this pair
    Skipped(SkipReason),
    /// A step raised an error
    Failed {
        /// State in which the error occurred
        stage: DirectoryState,
        /// Error chain
        message: String,
    },
}

/// Runs the state machine for (target, directory) pairs.
#[derive(Debug)]
pub struct TargetProcessor<'a> {
    settings: &'a Settings,
}

impl<'a> TargetProcessor<'a> {
    /// Create a processor for the given settings.
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Process one directory matched for `target`.
    pub fn process(
        &self,
        provider: &mut dyn WcsProvider,
        target: &str,
        directory: &Path,
    ) -> DirectoryOutcome {
        let files = self.settings.target_files(target, directory);
        let mut state = DirectoryState::NeedWcs;

        while !state.is_terminal() {
            state = match self.step(state, &files, provider) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("{}: {:#}", directory.display(), e);
                    return DirectoryOutcome::Failed {
                        stage: state,
                        message: format!("{:#}", e),
                    };
                }
            };
        }

        match state {
            DirectoryState::SkippedMissingImage => {
                DirectoryOutcome::Skipped(SkipReason::MissingImage(files.image))
            }
            DirectoryState::SkippedMissingData => {
                DirectoryOutcome::Skipped(SkipReason::MissingData(files.data))
            }
            DirectoryState::SkippedExistingOutput => {
                DirectoryOutcome::Skipped(SkipReason::ExistingOutput(files.output))
            }
            _ => DirectoryOutcome::Done {
                output: files.output,
            },
        }
    }

    /// Advance a non-terminal state by one transition.
    pub fn step(
        &self,
        state: DirectoryState,
        files: &TargetFiles,
        provider: &mut dyn WcsProvider,
    ) -> Result<DirectoryState> {
        match state {
            DirectoryState::NeedWcs => self.resolve_wcs(files, provider),
            DirectoryState::HaveWcs => Ok(self.check_inputs(files)),
            DirectoryState::NeedConversion => {
                self.convert(files)?;
                Ok(DirectoryState::Done)
            }
            terminal => Ok(terminal),
        }
    }

    fn resolve_wcs(
        &self,
        files: &TargetFiles,
        provider: &mut dyn WcsProvider,
    ) -> Result<DirectoryState> {
        if files.wcs.exists() && !self.settings.overwrite_wcs_file {
            tracing::info!(
                "WCS solution already present in {}, skipping query",
                file_name(&files.wcs)
            );
            return Ok(DirectoryState::HaveWcs);
        }

        if !files.image.exists() {
            tracing::warn!(
                "File {} does not exist, cannot query WCS solution",
                files.image.display()
            );
            return Ok(DirectoryState::SkippedMissingImage);
        }

        tracing::info!("{} found, querying WCS solution", file_name(&files.image));
        provider.solve(&files.image, &files.wcs, self.settings.custom_scale_bounds)?;
        Ok(DirectoryState::HaveWcs)
    }

    fn check_inputs(&self, files: &TargetFiles) -> DirectoryState {
        if files.output.exists() && !self.settings.overwrite_output_file {
            tracing::info!(
                "{} already exists, skipping conversion",
                file_name(&files.output)
            );
            return DirectoryState::SkippedExistingOutput;
        }

        if !files.data.exists() {
            tracing::warn!("File {} does not exist", files.data.display());
            return DirectoryState::SkippedMissingData;
        }

        DirectoryState::NeedConversion
    }

    fn convert(&self, files: &TargetFiles) -> Result<()> {
        tracing::info!(
            "{} found, converting X,Y coordinates to ECS",
            file_name(&files.data)
        );
        let pixels = PixelTable::read(&files.data, &self.settings.table_layout())?;
        let wcs = WcsSolution::read(&files.wcs)?;
        let [width, height] = wcs.image_size();
        tracing::debug!("WCS solution in {} for a {}x{} image", wcs.frame, width, height);

        if self.settings.transform_to_icrs {
            tracing::info!("Transforming from {} to ICRS frame", wcs.frame);
        }
        let sky = converter::pixel_to_sky(&wcs, &pixels, self.settings.transform_to_icrs)?;

        tracing::info!(
            "Writing {} ({} rows)",
            file_name(&files.output),
            pixels.len()
        );
        OutputTable::assemble(&sky, &pixels)?.write(&files.output)?;
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
