//! Mathematical utilities: robust statistics, smoothing filters, spectral
//! frequency estimation, and linear least squares.

pub mod filter;
pub mod freq;
pub mod ols;
pub mod stats;

pub use filter::*;
pub use freq::*;
pub use ols::*;
pub use stats::*;
