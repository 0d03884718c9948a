//! Compute module - Board evolution and the pixel codec.

mod board;
mod codec;
mod counter;
mod engine;
mod rule;

pub use board::*;
pub use codec::*;
pub use counter::*;
pub use engine::*;
pub use rule::*;
