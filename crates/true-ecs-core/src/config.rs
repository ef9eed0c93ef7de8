//! Configuration parsing and validation
//!
//! This module handles loading and validating the True-ECS settings file
//! (`config.yaml` by default). Every recognized option is listed on
//! [`Settings`]; unknown keys are rejected so a misspelled option fails at
//! startup instead of silently falling back to its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Placeholder substituted with the target identifier in path templates.
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Validated settings from `config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Credential for the plate-solving service
    #[serde(default)]
    pub astrometry_api_key: String,

    /// Target identifiers, processed in declaration order
    #[serde(default)]
    pub targets: Vec<String>,

    /// Glob pattern of the data directories, with a `{target}` placeholder
    #[serde(default = "default_data_directory")]
    pub data_directory: String,

    /// Image submitted for plate solving
    #[serde(default = "default_image_filename")]
    pub image_filename: String,

    /// Whitespace-delimited pixel-coordinate table
    #[serde(default = "default_data_filename")]
    pub data_filename: String,

    /// Calibrated WCS file, written by the plate solver
    #[serde(default = "default_wcs_filename")]
    pub wcs_filename: String,

    /// CSV file with the sky coordinates
    #[serde(default = "default_output_filename")]
    pub output_filename: String,

    /// Query a new WCS solution even if the WCS file exists
    #[serde(default)]
    pub overwrite_wcs_file: bool,

    /// Recompute the output even if the output file exists
    #[serde(default)]
    pub overwrite_output_file: bool,

    /// Reframe sky coordinates from the WCS native frame to ICRS
    #[serde(default)]
    pub transform_to_icrs: bool,

    /// Column names of the pixel table; when absent they come from a header row
    #[serde(default)]
    pub custom_data_column_names: Option<Vec<String>>,

    /// Lower/upper image width hints for the plate solver
    #[serde(default)]
    pub custom_scale_bounds: Option<ScaleBounds>,

    /// Number of non-comment lines preceding the data in the pixel table
    #[serde(default)]
    pub data_header_lines: Option<usize>,

    /// Base URL of the plate-solving service
    #[serde(default = "default_astrometry_url")]
    pub astrometry_url: String,

    /// Seconds to wait for a single plate solution (unbounded when absent)
    #[serde(default)]
    pub solve_timeout: Option<u64>,
}

fn default_data_directory() -> String {
    "./data/{target}".to_string()
}

fn default_image_filename() -> String {
    "{target}.fits".to_string()
}

fn default_data_filename() -> String {
    "{target}.txt".to_string()
}

fn default_wcs_filename() -> String {
    "{target}_wcs.fits".to_string()
}

fn default_output_filename() -> String {
    "{target}_ecs.csv".to_string()
}

fn default_astrometry_url() -> String {
    "https://nova.astrometry.net".to_string()
}

/// Image width bounds passed to the plate solver, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ScaleBounds {
    /// Smallest plausible image width
    pub lower: f64,
    /// Largest plausible image width
    pub upper: f64,
}

impl ScaleBounds {
    /// Unit understood by the service for these bounds.
    pub const UNITS: &'static str = "degwidth";
}

impl TryFrom<Vec<f64>> for ScaleBounds {
    type Error = String;

    fn try_from(values: Vec<f64>) -> std::result::Result<Self, Self::Error> {
        let [lower, upper] = values[..] else {
            return Err(format!(
                "custom_scale_bounds must have exactly two values, got {}",
                values.len()
            ));
        };
        if !(lower > 0.0 && upper.is_finite()) {
            return Err("custom_scale_bounds must be positive".to_string());
        }
        if lower > upper {
            return Err(format!(
                "custom_scale_bounds lower bound {} exceeds upper bound {}",
                lower, upper
            ));
        }
        Ok(Self { lower, upper })
    }
}

impl From<ScaleBounds> for Vec<f64> {
    fn from(bounds: ScaleBounds) -> Self {
        vec![bounds.lower, bounds.upper]
    }
}

/// How a pixel table is laid out on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// Fixed column names, or `None` to take them from the last header line
    pub column_names: Option<Vec<String>>,
    /// Non-comment lines before the first data row
    pub header_lines: usize,
}

/// Paths of the files belonging to one (target, directory) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFiles {
    /// Image submitted for plate solving
    pub image: PathBuf,
    /// WCS calibration file
    pub wcs: PathBuf,
    /// Pixel-coordinate table
    pub data: PathBuf,
    /// Sky-coordinate output table
    pub output: PathBuf,
}

/// Substitute the target identifier into a path template.
pub fn render_template(template: &str, target: &str) -> String {
    template.replace(TARGET_PLACEHOLDER, target)
}

impl Settings {
    /// Load settings from a YAML file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let settings = Settings::load("config.yaml")?;
    /// for target in &settings.targets {
    ///     println!("Target: {}", target);
    /// }
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate settings from a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.astrometry_api_key.trim().is_empty() {
            return Err(Error::invalid("the 'astrometry_api_key' option must be set"));
        }
        if self.targets.is_empty() {
            return Err(Error::invalid("the 'targets' list must not be empty"));
        }
        if self.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::invalid("target identifiers must not be empty"));
        }

        for (name, value) in [
            ("data_directory", &self.data_directory),
            ("image_filename", &self.image_filename),
            ("data_filename", &self.data_filename),
            ("wcs_filename", &self.wcs_filename),
            ("output_filename", &self.output_filename),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid(format!("'{}' must not be empty", name)));
            }
        }

        match &self.custom_data_column_names {
            Some(names) => {
                for required in ["X", "Y"] {
                    if !names.iter().any(|n| n == required) {
                        return Err(Error::invalid(format!(
                            "custom_data_column_names must include '{}'",
                            required
                        )));
                    }
                }
                for (i, name) in names.iter().enumerate() {
                    if names[..i].contains(name) {
                        return Err(Error::invalid(format!(
                            "duplicate column name '{}' in custom_data_column_names",
                            name
                        )));
                    }
                }
            }
            None => {
                if self.data_header_lines == Some(0) {
                    return Err(Error::invalid(
                        "data_header_lines must be at least 1 when column names come from a header",
                    ));
                }
            }
        }

        if self.astrometry_url.trim().is_empty() {
            return Err(Error::invalid("'astrometry_url' must not be empty"));
        }
        if self.solve_timeout == Some(0) {
            return Err(Error::invalid("solve_timeout must be positive"));
        }

        Ok(())
    }

    /// Layout of the pixel tables implied by these settings.
    pub fn table_layout(&self) -> TableLayout {
        let column_names = self.custom_data_column_names.clone();
        let default_lines = if column_names.is_some() { 0 } else { 1 };
        TableLayout {
            header_lines: self.data_header_lines.unwrap_or(default_lines),
            column_names,
        }
    }

    /// Directory glob pattern for a target.
    pub fn directory_pattern(&self, target: &str) -> String {
        render_template(&self.data_directory, target)
    }

    /// Files of a target inside one matched directory.
    pub fn target_files(&self, target: &str, directory: &Path) -> TargetFiles {
        TargetFiles {
            image: directory.join(render_template(&self.image_filename, target)),
            wcs: directory.join(render_template(&self.wcs_filename, target)),
            data: directory.join(render_template(&self.data_filename, target)),
            output: directory.join(render_template(&self.output_filename, target)),
        }
    }
}
