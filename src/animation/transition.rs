//! Cross-fade transitions between two independently evolving boards.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use rand::Rng;

use super::playback::{
    TRANSITION_PAUSE_MS, crossfade_probabilities, crossfade_steps, pause_count, transition_order,
};
use super::sequence::{Animation, SequenceBuilder, SequenceError};
use crate::compute::{Board, Geometry, Overlay, advance, encode, load_frame};
use crate::schema::Palette;

/// Probability that a cell taken from the target board in one cross-fade
/// step is taken again in the next.
pub const STICKY_PROBABILITY: f64 = 0.75;

/// Per-cell selection carried between cross-fade steps.
#[derive(Debug, Clone)]
pub struct CrossFade {
    mask: Vec<bool>,
}

impl CrossFade {
    /// Start with every cell where the two boards already agree selected.
    pub fn new(from: &Board, to: &Board) -> Self {
        Self {
            mask: from.cells().iter().zip(to.cells()).map(|(a, b)| a == b).collect(),
        }
    }

    /// Draw the next mask and blend `to` into `from` where it is set.
    ///
    /// Cells selected last step stay selected with [`STICKY_PROBABILITY`];
    /// every other cell is selected with `probability`.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        from: &Board,
        to: &Board,
        probability: f64,
        rng: &mut R,
    ) -> Board {
        for selected in &mut self.mask {
            let sticky = *selected && rng.gen_bool(STICKY_PROBABILITY);
            let fresh = rng.gen_bool(probability.clamp(0.0, 1.0));
            *selected = sticky || fresh;
        }

        let mut blended = from.clone();
        let cols = from.cols();
        for (i, selected) in self.mask.iter().enumerate() {
            if *selected {
                let (row, col) = (i / cols, i % cols);
                blended.set(row, col, to.get(row, col));
            }
        }
        blended
    }

    pub fn selected(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }
}

/// Frames rendered from one evolving board.
struct Track {
    board: Board,
    palette: Palette,
    geometry: Geometry,
    frames: Vec<RgbaImage>,
}

impl SequenceBuilder {
    fn open_track(&mut self, source: &Path) -> Result<(Track, Overlay), SequenceError> {
        let image = load_frame(source).map_err(|e| SequenceError::unreadable(source, e))?;
        let decoded = self
            .codec
            .decode(&image)
            .map_err(|e| SequenceError::unreadable(source, e))?;
        SequenceError::require_opaque(source, &decoded.palette)?;
        let track = Track {
            board: decoded.board,
            palette: decoded.palette,
            geometry: *self.codec.geometry(),
            frames: vec![image],
        };
        Ok((track, decoded.overlay))
    }

    /// Advance `track` up to `generations` times; false if cancelled first.
    fn extend_track(
        &self,
        track: &mut Track,
        generations: usize,
        label: &str,
        offset: usize,
        total: i64,
    ) -> bool {
        for i in 0..generations {
            if self.is_cancelled() {
                log::warn!("Cancelled while generating {} frames", label);
                return false;
            }
            log::info!("Generating image ({}) {}/{}", label, offset + i + 1, total);
            track.board = advance(&track.board);
            track
                .frames
                .push(encode(&track.board, &track.palette, &track.geometry));
        }
        true
    }

    /// Build a loop that evolves `from`, cross-fades into `to`, evolves `to`
    /// and plays everything back in reverse.
    ///
    /// `length` generations are split between the two boards, `from`
    /// getting `floor(length / 2)`.
    pub fn build_transition<R: Rng + ?Sized>(
        &mut self,
        from: &Path,
        to: &Path,
        length: i64,
        rng: &mut R,
    ) -> Result<Animation, SequenceError> {
        let (mut from_track, from_overlay) = self.open_track(from)?;
        let (mut to_track, to_overlay) = self.open_track(to)?;
        log::info!("Transition {} -> {}", from.display(), to.display());

        if from_track.board.shape() != to_track.board.shape() {
            return Err(SequenceError::ShapeMismatch {
                from: from_track.board.shape(),
                to: to_track.board.shape(),
            });
        }

        let split = length.div_euclid(2);
        let from_generations = usize::try_from(split).unwrap_or(0);
        let to_generations = usize::try_from(length - split).unwrap_or(0);

        let mut completed = self.extend_track(&mut from_track, from_generations, "from", 0, length);
        if completed {
            completed =
                self.extend_track(&mut to_track, to_generations, "to", from_generations, length);
        }

        let mut transition = Vec::new();
        if completed {
            let steps = crossfade_steps(length);
            let mut fade = CrossFade::new(&from_track.board, &to_track.board);
            for (i, probability) in crossfade_probabilities(steps).into_iter().enumerate() {
                if self.is_cancelled() {
                    log::warn!("Cancelled while generating transition frames");
                    completed = false;
                    break;
                }
                log::info!("Generating transition {}/{}", i + 1, steps);
                let blended = fade.step(&from_track.board, &to_track.board, probability, rng);
                transition.push(encode(&blended, &from_track.palette, &from_track.geometry));
            }
        }

        for frame in from_track.frames.iter_mut().chain(transition.iter_mut()) {
            from_overlay.apply(frame);
        }
        for frame in &mut to_track.frames {
            to_overlay.apply(frame);
        }

        let pause = pause_count(TRANSITION_PAUSE_MS, self.frame_duration_ms);
        Ok(Animation {
            distinct_frames: from_track.frames.len() + transition.len() + to_track.frames.len(),
            frames: transition_order(&from_track.frames, &transition, &to_track.frames, pause),
            cancelled: !completed,
            frame_duration_ms: self.frame_duration_ms,
        })
    }
}

/// `{from without extension}-transition.gif`.
pub fn transition_output_path(from: &Path) -> PathBuf {
    let mut stem = from.with_extension("").into_os_string();
    stem.push("-transition.gif");
    PathBuf::from(stem)
}
