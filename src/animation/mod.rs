//! Animated exports built from image-encoded boards.
//!
//! Two exports exist, both written as looping GIFs:
//!
//! - **Sequence**: one board advanced for N generations, played forward then
//!   backward.
//! - **Transition**: two boards advanced independently, joined by a
//!   probabilistic cross-fade, played as a from → to → from loop.

mod gif;
mod playback;
mod sequence;
mod transition;

pub use gif::{count_frames, is_gif, read_frames, resume_frame_count, write_gif};
pub use playback::{
    MIN_CROSSFADE_STEPS, SEQUENCE_PAUSE_MS, TRANSITION_PAUSE_MS, crossfade_probabilities,
    crossfade_steps, pause_count, sequence_order, transition_order,
};
pub use sequence::{Animation, SequenceBuilder, SequenceError, sequence_output_path};
pub use transition::{CrossFade, STICKY_PROBABILITY, transition_output_path};
