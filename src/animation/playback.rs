//! Playback ordering for looping exports.
//!
//! Both exports play forward and then backward so the loop has no seam.
//! The first frame is held for a fixed pause before playback starts.

/// Hold time before a plain sequence starts, in milliseconds.
pub const SEQUENCE_PAUSE_MS: u32 = 400;
/// Hold time at either end of a transition, in milliseconds.
pub const TRANSITION_PAUSE_MS: u32 = 600;
/// Minimum number of cross-fade steps in a transition.
pub const MIN_CROSSFADE_STEPS: usize = 5;

/// Number of extra copies of a frame needed to hold it for `hold_ms`.
#[inline]
pub fn pause_count(hold_ms: u32, frame_duration_ms: u32) -> usize {
    if frame_duration_ms == 0 {
        return 0;
    }
    (hold_ms / frame_duration_ms) as usize
}

/// Plain sequence order: pause on the first frame, every frame forward, then
/// the inner frames backward (both endpoints appear once per loop).
pub fn sequence_order<T: Clone>(frames: &[T], pause: usize) -> Vec<T> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };

    let inner = if frames.len() > 2 {
        &frames[1..frames.len() - 1]
    } else {
        &[]
    };

    let mut out = Vec::with_capacity(pause + frames.len() + inner.len());
    out.extend(std::iter::repeat_n(first.clone(), pause));
    out.extend_from_slice(frames);
    out.extend(inner.iter().rev().cloned());
    out
}

/// Transition order: from, cross-fade, to (backward), pause, to (forward),
/// cross-fade backward, from backward.
pub fn transition_order<T: Clone>(from: &[T], transition: &[T], to: &[T], pause: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(2 * (pause + from.len() + transition.len() + to.len()));

    if let Some(first) = from.first() {
        out.extend(std::iter::repeat_n(first.clone(), pause));
    }
    out.extend_from_slice(from);
    out.extend_from_slice(transition);
    out.extend(to.iter().rev().cloned());
    if let Some(first) = to.first() {
        out.extend(std::iter::repeat_n(first.clone(), pause));
    }
    out.extend_from_slice(to);
    out.extend(transition.iter().rev().cloned());
    out.extend(from.iter().skip(1).rev().cloned());
    out
}

/// Number of cross-fade steps for a transition of `length` generated frames.
pub fn crossfade_steps(length: i64) -> usize {
    let tenth = usize::try_from(length.div_euclid(10)).unwrap_or(0);
    tenth.max(MIN_CROSSFADE_STEPS)
}

/// Blend probabilities of the cross-fade frames actually generated for
/// `steps` steps: step `i` of `n` has probability `i / (n + 1)`; steps below
/// 0.1 are skipped and generation stops at the first step above 0.9.
pub fn crossfade_probabilities(steps: usize) -> Vec<f64> {
    let mut out = Vec::new();
    for i in 1..=steps {
        let probability = i as f64 / (steps + 1) as f64;
        if probability < 0.1 {
            continue;
        }
        if probability > 0.9 {
            break;
        }
        out.push(probability);
    }
    out
}
