//! Mapping between boards and pixels.
//!
//! A board is rendered by painting each cell as a `cell_size` block of its
//! palette color and cropping to the canvas. Decoding samples the top-left
//! pixel of every block. Pixels that match none of the palette colors are
//! foreign overlay content: they read as dead cells and are copied back onto
//! every frame generated from that image.

use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;

use super::board::{Board, CellState};
use crate::schema::{Dimensions, GridSpec, Palette, PaletteMode, Rgba};

/// Canvas and grid dimensions with the derived cell size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    canvas: Dimensions,
    grid: GridSpec,
    /// `(height, width)` of one cell block in pixels.
    cell: (u32, u32),
}

impl Geometry {
    pub fn new(canvas: Dimensions, grid: GridSpec) -> Self {
        Self {
            canvas,
            grid,
            cell: cell_size(canvas, grid),
        }
    }

    #[inline]
    pub fn canvas(&self) -> Dimensions {
        self.canvas
    }

    #[inline]
    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    /// `(height, width)` of one cell block: `ceil(canvas / grid)` per axis.
    #[inline]
    pub fn cell_size(&self) -> (u32, u32) {
        self.cell
    }

    /// Adopt the dimensions of an image that does not match the canvas.
    ///
    /// An unpinned grid is replaced by the raw pixel dimensions. Returns
    /// true if anything changed.
    pub fn adopt_canvas(&mut self, height: u32, width: u32) -> bool {
        if self.canvas.height == height && self.canvas.width == width {
            return false;
        }
        self.canvas = Dimensions { height, width };
        if !self.grid.explicit {
            self.grid.rows = height;
            self.grid.cols = width;
        }
        self.cell = cell_size(self.canvas, self.grid);
        log::debug!(
            "Modified canvas size: {}x{}, cell size {:?}",
            height,
            width,
            self.cell
        );
        true
    }
}

fn cell_size(canvas: Dimensions, grid: GridSpec) -> (u32, u32) {
    (
        canvas.height.div_ceil(grid.rows.max(1)).max(1),
        canvas.width.div_ceil(grid.cols.max(1)).max(1),
    )
}

/// Foreign pixels of a decoded image, kept for re-compositing.
#[derive(Debug, Clone)]
pub struct Overlay {
    /// One entry per source pixel, row-major; true where the pixel matches
    /// no palette color.
    mask: Vec<bool>,
    /// The untouched decoded image.
    source: RgbaImage,
}

impl Overlay {
    /// Copy the foreign source pixels onto `frame`, leaving every other
    /// pixel untouched.
    pub fn apply(&self, frame: &mut RgbaImage) {
        let (width, height) = self.source.dimensions();
        let w = width.min(frame.width());
        let h = height.min(frame.height());
        for y in 0..h {
            for x in 0..w {
                if self.mask[(y * width + x) as usize] {
                    frame.put_pixel(x, y, *self.source.get_pixel(x, y));
                }
            }
        }
    }

    /// `apply` on an owned frame.
    pub fn applied(&self, mut frame: RgbaImage) -> RgbaImage {
        self.apply(&mut frame);
        frame
    }

    /// Number of foreign pixels.
    pub fn len(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.mask.iter().any(|m| *m)
    }

    #[inline]
    pub fn is_foreign(&self, x: u32, y: u32) -> bool {
        self.mask[(y * self.source.width() + x) as usize]
    }
}

/// Result of decoding an image.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub board: Board,
    pub overlay: Overlay,
    /// Palette the image was decoded with (detected in auto mode).
    pub palette: Palette,
}

/// Encoder/decoder for one run, owning the (possibly drifting) geometry.
#[derive(Debug, Clone)]
pub struct StateCodec {
    geometry: Geometry,
    palette_mode: PaletteMode,
}

impl StateCodec {
    pub fn new(geometry: Geometry, palette_mode: PaletteMode) -> Self {
        Self {
            geometry,
            palette_mode,
        }
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Uniformly random board with the configured grid dimensions.
    pub fn random_board<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Board {
        let grid = self.geometry.grid();
        Board::random(grid.rows as usize, grid.cols as usize, rng)
    }

    /// Render `board` to a canvas-sized image.
    pub fn encode(&self, board: &Board, palette: &Palette) -> RgbaImage {
        encode(board, palette, &self.geometry)
    }

    /// Decode `image` into a board, adopting its dimensions if they drifted
    /// from the canvas.
    pub fn decode(&mut self, image: &RgbaImage) -> Result<DecodedFrame, CodecError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CodecError::EmptyImage);
        }
        self.geometry.adopt_canvas(height, width);

        let (cell_h, cell_w) = self.geometry.cell_size();
        let palette = match self.palette_mode {
            PaletteMode::Fixed(palette) => palette,
            PaletteMode::Auto => {
                let palette = detect_palette(image, (cell_h, cell_w));
                log::debug!(
                    "Resolved colors: dead = {:?}, alive = {:?}, dying = {:?}",
                    palette.dead.0,
                    palette.alive.0,
                    palette.dying.0
                );
                palette
            }
        };

        let mask: Vec<bool> = image
            .pixels()
            .map(|p| !palette.contains(Rgba::from(*p)))
            .collect();

        let rows = height.div_ceil(cell_h) as usize;
        let cols = width.div_ceil(cell_w) as usize;
        let mut board = Board::new(rows, cols);
        for row in 0..rows {
            let y = row as u32 * cell_h;
            for col in 0..cols {
                let x = col as u32 * cell_w;
                // Overlay pixels read as dead.
                if mask[(y * width + x) as usize] {
                    continue;
                }
                if Rgba::from(*image.get_pixel(x, y)) != palette.dead {
                    board.set(row, col, CellState::Alive);
                }
            }
        }

        Ok(DecodedFrame {
            board,
            overlay: Overlay {
                mask,
                source: image.clone(),
            },
            palette,
        })
    }
}

/// Render `board` with `palette`, one `cell_size` block per cell, cropped to
/// the canvas.
pub fn encode(board: &Board, palette: &Palette, geometry: &Geometry) -> RgbaImage {
    let canvas = geometry.canvas();
    let (cell_h, cell_w) = geometry.cell_size();
    let (rows, cols) = board.shape();

    RgbaImage::from_fn(canvas.width, canvas.height, |x, y| {
        let row = (y / cell_h) as usize;
        let col = (x / cell_w) as usize;
        let color = if row < rows && col < cols {
            match board.get(row, col) {
                CellState::Dead => palette.dead,
                CellState::Alive => palette.alive,
                CellState::Dying => palette.dying,
            }
        } else {
            palette.dead
        };
        color.pixel()
    })
}

/// The three most frequent colors among the cell-sample pixels, most
/// frequent first, padded with the fallback colors.
///
/// Ties are broken by the smaller RGBA value.
pub fn detect_palette(image: &RgbaImage, cell: (u32, u32)) -> Palette {
    let (cell_h, cell_w) = cell;
    let mut counts: HashMap<Rgba, usize> = HashMap::new();
    for y in (0..image.height()).step_by(cell_h.max(1) as usize) {
        for x in (0..image.width()).step_by(cell_w.max(1) as usize) {
            *counts.entry(Rgba::from(*image.get_pixel(x, y))).or_default() += 1;
        }
    }

    let mut ranked: Vec<(Rgba, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let top: Vec<Rgba> = ranked.into_iter().take(3).map(|(color, _)| color).collect();
    Palette::from_ranked(&top)
}

/// True if two frames have identical dimensions and pixels.
pub fn frames_equal(a: &RgbaImage, b: &RgbaImage) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}

/// Read a raster file as RGBA.
pub fn load_frame(path: &Path) -> Result<RgbaImage, CodecError> {
    Ok(image::open(path)?.into_rgba8())
}

/// Write a frame; the format follows the file extension.
pub fn save_frame(frame: &RgbaImage, path: &Path) -> Result<(), CodecError> {
    frame.save(path)?;
    Ok(())
}

/// Failures while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image has no pixels")]
    EmptyImage,
    #[error("Animation has no frames")]
    NoFrames,
}

#[cfg(test)]
mod tests {
    use super::*;
    use CellState::{Alive, Dead, Dying};

    const DEAD: Rgba = Rgba::new(255, 255, 255, 255);
    const ALIVE: Rgba = Rgba::new(0, 200, 0, 255);
    const DYING: Rgba = Rgba::new(0, 0, 90, 255);

    fn palette() -> Palette {
        Palette {
            dead: DEAD,
            alive: ALIVE,
            dying: DYING,
        }
    }

    fn geometry(h: u32, w: u32, rows: u32, cols: u32, explicit: bool) -> Geometry {
        Geometry::new(
            Dimensions {
                height: h,
                width: w,
            },
            GridSpec {
                rows,
                cols,
                explicit,
            },
        )
    }

    fn sample_board() -> Board {
        Board::from_rows(&[
            vec![Dead, Alive, Dead, Dying],
            vec![Alive, Dead, Dying, Dead],
            vec![Dead, Dead, Alive, Alive],
        ])
    }

    #[test]
    fn test_cell_size_rounds_up() {
        let g = geometry(10, 11, 3, 4, true);
        assert_eq!(g.cell_size(), (4, 3));
    }

    #[test]
    fn test_encode_crops_to_canvas() {
        let g = geometry(10, 11, 3, 4, true);
        let frame = encode(&sample_board(), &palette(), &g);
        assert_eq!(frame.dimensions(), (11, 10));

        // Cell (0, 1) covers x in 3..6, y in 0..4.
        assert_eq!(Rgba::from(*frame.get_pixel(3, 0)), ALIVE);
        assert_eq!(Rgba::from(*frame.get_pixel(5, 3)), ALIVE);
        assert_eq!(Rgba::from(*frame.get_pixel(6, 3)), DEAD);
        // Cell (2, 3) is cropped to x in 9..11, y in 8..10.
        assert_eq!(Rgba::from(*frame.get_pixel(10, 9)), ALIVE);
        assert_eq!(Rgba::from(*frame.get_pixel(9, 4)), DEAD);
        assert_eq!(Rgba::from(*frame.get_pixel(0, 4)), ALIVE);
        assert_eq!(Rgba::from(*frame.get_pixel(9, 0)), DYING);
    }

    #[test]
    fn test_decode_reproduces_pattern() {
        let g = geometry(12, 16, 3, 4, true);
        let board = sample_board();
        let frame = encode(&board, &palette(), &g);

        let mut codec = StateCodec::new(g, PaletteMode::Fixed(palette()));
        let decoded = codec.decode(&frame).unwrap();

        let expected: Vec<CellState> = board.cells().iter().map(|c| c.sanitized()).collect();
        assert_eq!(decoded.board.cells(), expected.as_slice());
        assert!(decoded.overlay.is_empty());
        assert_eq!(codec.geometry(), &g);
    }

    #[test]
    fn test_overlay_reads_dead_and_is_restored() {
        let g = geometry(6, 6, 3, 3, true);
        let board = Board::from_rows(&[
            vec![Alive, Alive, Dead],
            vec![Dead, Alive, Dead],
            vec![Dead, Dead, Dead],
        ]);
        let mut frame = encode(&board, &palette(), &g);

        let foreign = image::Rgba([12, 34, 56, 255]);
        // Top-left of cell (0, 0): the cell must read as dead.
        frame.put_pixel(0, 0, foreign);
        // Interior of cell (2, 2): not sampled, still preserved.
        frame.put_pixel(5, 5, foreign);

        let mut codec = StateCodec::new(g, PaletteMode::Fixed(palette()));
        let decoded = codec.decode(&frame).unwrap();
        assert_eq!(decoded.board.get(0, 0), Dead);
        assert_eq!(decoded.board.get(0, 1), Alive);
        assert_eq!(decoded.overlay.len(), 2);
        assert!(decoded.overlay.is_foreign(5, 5));

        let blank = encode(&Board::new(3, 3), &palette(), &g);
        let composed = decoded.overlay.applied(blank);
        assert_eq!(*composed.get_pixel(0, 0), foreign);
        assert_eq!(*composed.get_pixel(5, 5), foreign);
        assert_eq!(Rgba::from(*composed.get_pixel(1, 1)), DEAD);
    }

    #[test]
    fn test_canvas_drift_adopts_pixels_when_grid_unpinned() {
        let mut codec = StateCodec::new(geometry(4, 4, 2, 2, false), PaletteMode::Fixed(palette()));
        let image = RgbaImage::from_pixel(5, 3, DEAD.pixel());

        let decoded = codec.decode(&image).unwrap();
        let g = codec.geometry();
        assert_eq!(
            g.canvas(),
            Dimensions {
                height: 3,
                width: 5
            }
        );
        assert_eq!((g.grid().rows, g.grid().cols), (3, 5));
        assert_eq!(g.cell_size(), (1, 1));
        assert_eq!(decoded.board.shape(), (3, 5));
    }

    #[test]
    fn test_canvas_drift_keeps_pinned_grid() {
        let mut codec = StateCodec::new(geometry(4, 4, 2, 2, true), PaletteMode::Fixed(palette()));
        let image = RgbaImage::from_pixel(8, 6, DEAD.pixel());

        let decoded = codec.decode(&image).unwrap();
        let g = codec.geometry();
        assert_eq!((g.grid().rows, g.grid().cols), (2, 2));
        assert_eq!(g.cell_size(), (3, 4));
        assert_eq!(decoded.board.shape(), (2, 2));
    }

    #[test]
    fn test_auto_palette_ranks_by_frequency() {
        let g = geometry(4, 4, 4, 4, true);
        let board = Board::from_rows(&[
            vec![Dead, Dead, Dead, Dead],
            vec![Dead, Alive, Alive, Dead],
            vec![Dead, Alive, Dying, Dead],
            vec![Dead, Dead, Dead, Dead],
        ]);
        let frame = encode(&board, &palette(), &g);

        let mut codec = StateCodec::new(g, PaletteMode::Auto);
        let decoded = codec.decode(&frame).unwrap();
        assert_eq!(decoded.palette, palette());
        assert_eq!(decoded.board.population(), 4);
    }

    #[test]
    fn test_auto_palette_pads_missing_colors() {
        let image = RgbaImage::from_pixel(3, 3, image::Rgba([1, 2, 3, 255]));
        let detected = detect_palette(&image, (1, 1));
        assert_eq!(detected.dead, Rgba::new(1, 2, 3, 255));
        assert_eq!(detected.alive, crate::schema::FALLBACK_ALIVE);
        assert_eq!(detected.dying, crate::schema::FALLBACK_DYING);
    }

    #[test]
    fn test_empty_image_is_an_error() {
        let mut codec = StateCodec::new(geometry(4, 4, 2, 2, true), PaletteMode::Auto);
        assert!(matches!(
            codec.decode(&RgbaImage::new(0, 0)),
            Err(CodecError::EmptyImage)
        ));
    }
}
