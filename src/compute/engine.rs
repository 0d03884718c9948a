//! Per-invocation driver.
//!
//! Each run reads the persisted frame, advances it one generation and writes
//! it back. A frame that would not change (only still lifes, or nothing
//! alive) is replaced by a fresh random board, as is a frame that cannot be
//! decoded at all.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::codec::{CodecError, Geometry, StateCodec, frames_equal, load_frame, save_frame};
use super::counter::{CounterUpdate, IterationCounter};
use super::rule::advance;
use crate::animation::{
    SequenceBuilder, SequenceError, sequence_output_path, transition_output_path,
};
use crate::schema::{Palette, RunMode, Settings};

/// How a single-frame run ended.
#[derive(Debug)]
pub enum FrameOutcome {
    /// No persisted frame existed; a random board was written.
    Started,
    /// The next generation looked identical; a random board was written.
    Converged,
    /// The next generation was written and the counter incremented.
    Progressed,
    /// The persisted frame could not be decoded or advanced; a random board
    /// was written.
    Recovered { reason: CodecError },
}

/// Result of one invocation.
#[derive(Debug)]
pub enum RunOutcome {
    Frame(FrameOutcome),
    Exported {
        path: PathBuf,
        frames: usize,
        cancelled: bool,
    },
}

enum Step {
    Converged,
    Progressed,
}

/// Evolution engine for one invocation.
pub struct EvolutionEngine {
    settings: Settings,
    codec: StateCodec,
    /// Palette in effect; replaced by the detected one after an auto decode.
    palette: Palette,
    counter: IterationCounter,
    rng: StdRng,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create an engine with an entropy-seeded generator.
    pub fn new(settings: Settings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Create an engine with a deterministic generator.
    pub fn with_seed(settings: Settings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: Settings, rng: StdRng) -> Self {
        let codec = StateCodec::new(
            Geometry::new(settings.canvas, settings.grid),
            settings.palette,
        );
        Self {
            palette: settings.palette.initial(),
            counter: IterationCounter::new(settings.counter_path()),
            codec,
            settings,
            rng,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag with animated exports.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn geometry(&self) -> &Geometry {
        self.codec.geometry()
    }

    pub fn counter(&self) -> &IterationCounter {
        &self.counter
    }

    /// Run whatever the settings ask for.
    pub fn run(&mut self) -> Result<RunOutcome, crate::Error> {
        match self.settings.mode.clone() {
            RunMode::Evolve => Ok(RunOutcome::Frame(self.evolve()?)),
            RunMode::Sequence { source, length } => {
                let mut builder = self.builder();
                let animation = builder.build_sequence(&source, length)?;
                let path = sequence_output_path(&source);
                log::info!("Saving gif...");
                animation.save(&path).map_err(SequenceError::from)?;
                Ok(RunOutcome::Exported {
                    path,
                    frames: animation.frames.len(),
                    cancelled: animation.cancelled,
                })
            }
            RunMode::Transition { from, to, length } => {
                let mut builder = self.builder();
                let animation = builder.build_transition(&from, &to, length, &mut self.rng)?;
                let path = transition_output_path(&from);
                log::info!("Saving gif...");
                animation.save(&path).map_err(SequenceError::from)?;
                Ok(RunOutcome::Exported {
                    path,
                    frames: animation.frames.len(),
                    cancelled: animation.cancelled,
                })
            }
        }
    }

    fn builder(&self) -> SequenceBuilder {
        SequenceBuilder::new(self.codec.clone(), self.settings.frame_duration_ms)
            .with_cancel_flag(Arc::clone(&self.cancelled))
    }

    /// Advance the persisted frame by one generation.
    ///
    /// Only a failure to write the replacement random board is returned as
    /// an error.
    pub fn evolve(&mut self) -> Result<FrameOutcome, CodecError> {
        let target = self.settings.target_image();

        if !target.exists() {
            log::info!("starting new game...");
            self.start_new_game(&target)?;
            log::info!("generating index counter...");
            self.counter.update(self.palette.alive, CounterUpdate::Reset);
            return Ok(FrameOutcome::Started);
        }

        let outcome = match self.try_advance(&target) {
            Ok(Step::Progressed) => {
                log::info!("updating index counter...");
                self.counter
                    .update(self.palette.alive, CounterUpdate::Increment);
                return Ok(FrameOutcome::Progressed);
            }
            Ok(Step::Converged) => {
                log::info!("game finished, only still-lifes or no lifes");
                FrameOutcome::Converged
            }
            Err(reason) => {
                log::warn!("an error occurred: {}", reason);
                FrameOutcome::Recovered { reason }
            }
        };

        log::info!("starting over...");
        self.start_new_game(&target)?;
        log::info!("resetting index counter...");
        self.counter.update(self.palette.alive, CounterUpdate::Reset);
        Ok(outcome)
    }

    fn try_advance(&mut self, target: &Path) -> Result<Step, CodecError> {
        log::info!("reading game state...");
        let image = load_frame(target)?;
        let decoded = self.codec.decode(&image)?;
        self.palette = decoded.palette;

        let previous = self.codec.encode(&decoded.board, &self.palette);
        log::info!("updating game cycle...");
        let board = advance(&decoded.board);
        log::info!("generating new image...");
        let mut frame = self.codec.encode(&board, &self.palette);

        if frames_equal(&previous, &frame) {
            return Ok(Step::Converged);
        }

        decoded.overlay.apply(&mut frame);
        log::info!("saving image...");
        save_frame(&frame, target)?;
        Ok(Step::Progressed)
    }

    fn start_new_game(&mut self, target: &Path) -> Result<(), CodecError> {
        let board = self.codec.random_board(&mut self.rng);
        let frame = self.codec.encode(&board, &self.palette);
        save_frame(&frame, target)
    }
}
