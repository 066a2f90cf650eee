//! Model-family implementations.
//!
//! Models are implemented as small, pure functions of
//! `(independent variable, parameters)` so the estimation and solver code can
//! stay generic over the family being fitted.

pub mod model;

pub use model::*;
