//! Input/output helpers.
//!
//! - CSV trace ingest + validation (`ingest`)
//! - fit result exports (JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
