//! Schema module - Settings and palette types for image-backed simulations.

mod config;
mod palette;

pub use config::*;
pub use palette::*;
