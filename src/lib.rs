//! Pixel Life - Conway's Game of Life that lives inside an image.
//!
//! There is no state file: every invocation decodes the previously written
//! frame back into a cell grid, advances it one generation and writes the
//! next frame over it. Pixels that do not belong to the palette (an overlay
//! drawn on top of the board) are carried forward untouched.
//!
//! # Architecture
//!
//! - `schema`: settings, palettes and their validation
//! - `compute`: the board, the rule, the image codec and the engine
//! - `animation`: looping GIF sequences and cross-fade transitions
//! - `render`: rasterising SVG sources through headless Chrome
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! use pixel_life::render::ChromeRenderer;
//! use pixel_life::schema::SettingsInput;
//!
//! let resolved = SettingsInput::default().resolve(&ChromeRenderer::new())?;
//! let outcome = pixel_life::run(resolved.settings.clone(), Arc::new(AtomicBool::new(false)))?;
//! println!("{:?}", outcome);
//! # Ok::<(), pixel_life::Error>(())
//! ```

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub mod animation;
pub mod compute;
pub mod render;
pub mod schema;

// Re-export commonly used types
pub use animation::{Animation, SequenceBuilder, SequenceError};
pub use compute::{Board, CellState, CodecError, EvolutionEngine, FrameOutcome, RunOutcome, StateCodec};
pub use render::RenderError;
pub use schema::{ConfigError, Palette, PaletteMode, Settings, SettingsInput};

/// Any failure of a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Run one invocation with entropy-seeded randomness.
///
/// Raising `cancel` stops animated exports early; the frames generated so
/// far are still written.
pub fn run(settings: Settings, cancel: Arc<AtomicBool>) -> Result<RunOutcome, Error> {
    EvolutionEngine::new(settings).with_cancel_flag(cancel).run()
}
