//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model families and their parameter schemas (`ModelKind`, `ModelChoice`)
//! - estimator/solver knobs (`SplitPolicy`, `EstimateMode`, `SolverStrategy`)
//! - fit outputs (`FitOutcome`, `DoubleGaussianFit`, `FermiLinearFit`, etc.)
//! - the structured advisory channel (`Advisory`)

pub mod types;

pub use types::*;
