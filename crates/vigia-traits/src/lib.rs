#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vigia/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core data contracts for the vigia ensemble and risk engines.
//!
//! This crate holds what every other vigia crate agrees on: the error
//! taxonomy, the forecast record contract, ensemble weight snapshots, the
//! stacking meta-model seam, and small statistics helpers.

/// The version of the vigia-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod forecast;
pub mod meta;
pub mod stats;
pub mod weights;

// Re-exports
pub use error::{ErrorKind, Result, VigiaError};
pub use forecast::{
    AccuracyReport, ConfidenceInterval, ForecastRecord, ModelKind, validate_ensemble,
};
pub use meta::{LinearMetaModel, MetaModel};
pub use weights::{EnsembleWeights, WeightBounds};
