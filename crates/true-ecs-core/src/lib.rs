//! True-ECS Core Library
//!
//! This crate provides the data-side functionality for True-ECS:
//! - Settings parsing and validation
//! - Pixel-coordinate tables and the CSV output table
//! - WCS header reading and the pixel-to-world mapping
//! - Celestial frames of WCS solutions
//! - Conversion of pixel tables to sky coordinates
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Pixel table │────▶│  Converter  │────▶│ Output table│
//! │  (X, Y...)  │     │ (WCS+frame) │     │ (RA,DEC...) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use true_ecs_core::{PixelTable, Settings, WcsSolution, converter};
//!
//! let settings = Settings::load("config.yaml")?;
//! let pixels = PixelTable::read("M42.txt", &settings.table_layout())?;
//! let wcs = WcsSolution::read("M42_wcs.fits")?;
//! let sky = converter::pixel_to_sky(&wcs, &pixels, settings.transform_to_icrs)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod converter;
pub mod error;
pub mod frames;
pub mod table;
pub mod wcs;

pub use config::{ScaleBounds, Settings, TableLayout};
pub use error::{Error, Result};
pub use frames::CelestialFrame;
pub use table::{OutputTable, PixelTable, SkyTable};
pub use wcs::WcsSolution;
