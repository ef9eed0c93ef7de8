//! True-ECS Runtime
//!
//! Batch execution for True-ECS: plate solving through an external
//! service, the per-directory processing state machine, and the driver
//! that walks every configured target.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod processor;
pub mod solver;

pub use engine::{RunReport, Runtime, TargetReport};
pub use error::{Error, Result};
pub use processor::{DirectoryOutcome, DirectoryState, SkipReason, TargetProcessor};
pub use solver::{AstrometryClient, WcsProvider};
