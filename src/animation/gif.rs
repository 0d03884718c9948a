//! Animated GIF input and output.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, Frame, RgbaImage};

use crate::compute::CodecError;

/// True if `path` has a `.gif` extension (any case).
pub fn is_gif(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"))
}

fn open_gif(path: &Path) -> Result<GifDecoder<BufReader<File>>, CodecError> {
    Ok(GifDecoder::new(BufReader::new(File::open(path)?))?)
}

/// Number of frames in an animated GIF. Each frame is dropped once counted.
pub fn count_frames(path: &Path) -> Result<usize, CodecError> {
    let mut total = 0;
    for frame in open_gif(path)?.into_frames() {
        frame?;
        total += 1;
    }
    if total == 0 {
        return Err(CodecError::NoFrames);
    }
    Ok(total)
}

/// Decode the first `limit` frames of an animated GIF, composited to full
/// RGBA canvases. Decoding stops at the limit.
pub fn read_frames(path: &Path, limit: usize) -> Result<Vec<RgbaImage>, CodecError> {
    let frames = open_gif(path)?
        .into_frames()
        .take(limit)
        .map(|frame| frame.map(|f| f.into_buffer()))
        .collect::<Result<Vec<_>, _>>()?;

    if frames.is_empty() {
        return Err(CodecError::NoFrames);
    }
    Ok(frames)
}

/// Number of frames taken from an existing animation when extending it:
/// the first half plus one, capped at the total.
#[inline]
pub fn resume_frame_count(total: usize) -> usize {
    (total / 2 + 1).min(total)
}

/// Write `frames` as a GIF that loops forever, showing each for `frame_duration_ms`.
pub fn write_gif(frames: &[RgbaImage], path: &Path, frame_duration_ms: u32) -> Result<(), CodecError> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = GifEncoder::new(writer);
    encoder.set_repeat(Repeat::Infinite)?;

    let delay = Delay::from_numer_denom_ms(frame_duration_ms, 1);
    for frame in frames {
        encoder.encode_frame(Frame::from_parts(frame.clone(), 0, 0, delay))?;
    }
    Ok(())
}
