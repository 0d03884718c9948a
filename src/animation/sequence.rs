//! Plain multi-generation sequences.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbaImage;

use super::gif::{count_frames, is_gif, read_frames, resume_frame_count, write_gif};
use super::playback::{SEQUENCE_PAUSE_MS, pause_count, sequence_order};
use crate::compute::{CodecError, StateCodec, advance, load_frame};
use crate::schema::Palette;

/// A finished export, frames already in playback order.
#[derive(Debug, Clone)]
pub struct Animation {
    /// Frames in playback order.
    pub frames: Vec<RgbaImage>,
    /// Frames the simulation produced before ordering (pauses and mirrored
    /// frames excluded).
    pub distinct_frames: usize,
    /// True if generation stopped early on cancellation.
    pub cancelled: bool,
    pub frame_duration_ms: u32,
}

impl Animation {
    /// Write as a looping GIF.
    pub fn save(&self, path: &Path) -> Result<(), CodecError> {
        write_gif(&self.frames, path, self.frame_duration_ms)
    }
}

/// Builds animated exports by repeatedly advancing decoded boards.
///
/// Usage:
/// ```ignore
/// let mut builder = SequenceBuilder::new(codec, 100);
/// let animation = builder.build_sequence(Path::new("seed.png"), 30)?;
/// animation.save(&sequence_output_path(Path::new("seed.png")))?;
/// ```
pub struct SequenceBuilder {
    pub(super) codec: StateCodec,
    pub(super) frame_duration_ms: u32,
    pub(super) cancelled: Arc<AtomicBool>,
}

impl SequenceBuilder {
    pub fn new(codec: StateCodec, frame_duration_ms: u32) -> Self {
        Self {
            codec,
            frame_duration_ms,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag; once set, builds stop generating frames
    /// and finish with what they have.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    #[inline]
    pub(super) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Build a forward-backward loop of `length` generations starting at `source`.
    ///
    /// A GIF source is resumed: the first half of its frames (plus one) are
    /// kept and the board continues from the last of them. A negative
    /// `length` means one frame more than the frames already present.
    pub fn build_sequence(&mut self, source: &Path, length: i64) -> Result<Animation, SequenceError> {
        let mut frames = if is_gif(source) {
            let total = count_frames(source).map_err(|e| SequenceError::unreadable(source, e))?;
            let keep = resume_frame_count(total);
            log::info!("Resuming from {} of {} frames", keep, total);
            read_frames(source, keep).map_err(|e| SequenceError::unreadable(source, e))?
        } else {
            vec![load_frame(source).map_err(|e| SequenceError::unreadable(source, e))?]
        };

        let last = frames.last().ok_or(SequenceError::Codec(CodecError::NoFrames))?;
        let decoded = self
            .codec
            .decode(last)
            .map_err(|e| SequenceError::unreadable(source, e))?;
        SequenceError::require_opaque(source, &decoded.palette)?;

        let target = if length < 0 {
            frames.len() + 1
        } else {
            length as usize
        };

        let mut board = decoded.board;
        let mut cancelled = false;
        for index in frames.len()..target {
            if self.is_cancelled() {
                log::warn!("Cancelled after {} of {} frames", index, target);
                cancelled = true;
                break;
            }
            log::info!("Generating image {}/{}", index + 1, target);
            board = advance(&board);
            frames.push(self.codec.encode(&board, &decoded.palette));
        }

        for frame in &mut frames {
            decoded.overlay.apply(frame);
        }

        let pause = pause_count(SEQUENCE_PAUSE_MS, self.frame_duration_ms);
        Ok(Animation {
            distinct_frames: frames.len(),
            frames: sequence_order(&frames, pause),
            cancelled,
            frame_duration_ms: self.frame_duration_ms,
        })
    }
}

/// `{source without extension}.gif`.
pub fn sequence_output_path(source: &Path) -> PathBuf {
    source.with_extension("gif")
}

/// Failures while building an animated export.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Could not decode {path:?}")]
    Source {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Animated exports require fully opaque colors, {path:?} decodes to {palette:?}")]
    TranslucentPalette { path: PathBuf, palette: Palette },
    #[error("Boards differ in shape: {from:?} vs {to:?}")]
    ShapeMismatch {
        from: (usize, usize),
        to: (usize, usize),
    },
}

impl SequenceError {
    pub(super) fn unreadable(path: &Path, source: CodecError) -> Self {
        SequenceError::Source {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(super) fn require_opaque(path: &Path, palette: &Palette) -> Result<(), Self> {
        if palette.is_opaque() {
            return Ok(());
        }
        Err(SequenceError::TranslucentPalette {
            path: path.to_path_buf(),
            palette: *palette,
        })
    }
}
