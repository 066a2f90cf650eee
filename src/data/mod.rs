//! Data sources: synthetic trace generation for demos and tests.

pub mod sample;

pub use sample::*;
