//! Run settings and their validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::palette::{FALLBACK_ALIVE, FALLBACK_DEAD, FALLBACK_DYING, Palette, PaletteMode, parse_color};
use crate::render::{RenderError, SvgRenderer, TempRaster, is_vector_source, resolve_source};

/// Raster extensions accepted as animation sources (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["bmp", "jpg", "jpeg", "png", "tif", "tiff", "gif"];

/// Default canvas, `height,width` in pixels.
pub const DEFAULT_CANVAS: &str = "420,1200";
/// Default grid, `rows,cols` in cells.
pub const DEFAULT_GRID: &str = "84,240";
/// Default artifact base name.
pub const DEFAULT_NAME: &str = "GameOfLife";

/// Pixel dimensions of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub height: u32,
    pub width: u32,
}

/// Cell grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
    /// Set by the user, as opposed to the default. A pinned grid survives
    /// canvas drift; an unpinned one is replaced by the pixel dimensions.
    pub explicit: bool,
}

/// What a single invocation produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunMode {
    /// Advance the persisted frame by one generation.
    Evolve,
    /// Build a looping animation from one source.
    Sequence {
        source: PathBuf,
        /// Target frame count; negative means one past the frames already present.
        length: i64,
    },
    /// Build a looping cross-fade animation between two sources.
    Transition {
        from: PathBuf,
        to: PathBuf,
        /// Total generated frames, split between the two boards.
        length: i64,
    },
}

impl RunMode {
    pub fn is_animated(&self) -> bool {
        !matches!(self, RunMode::Evolve)
    }
}

/// Validated settings for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Output directory.
    pub path: PathBuf,
    /// Artifact base name.
    pub name: String,
    pub palette: PaletteMode,
    pub canvas: Dimensions,
    pub grid: GridSpec,
    pub mode: RunMode,
    /// Per-frame delay of animated exports.
    pub frame_duration_ms: u32,
}

impl Settings {
    /// Persisted frame: `{path}/{name}.png`.
    pub fn target_image(&self) -> PathBuf {
        self.path.join(format!("{}.png", self.name))
    }

    /// Iteration counter artifact: `{path}/{name}_Iteration.svg`.
    pub fn counter_path(&self) -> PathBuf {
        self.path.join(format!("{}_Iteration.svg", self.name))
    }
}

/// Settings as given on the command line, before validation.
#[derive(Debug, Clone)]
pub struct SettingsInput {
    pub path: String,
    pub name: String,
    pub cdead: Option<String>,
    pub calive: Option<String>,
    pub cdying: Option<String>,
    pub canvas: String,
    /// `None` when the user did not pin the grid.
    pub grid: Option<String>,
    pub gif: Option<String>,
    pub gif_length: i64,
    pub gif_speed: i64,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl Default for SettingsInput {
    fn default() -> Self {
        Self {
            path: ".".to_string(),
            name: DEFAULT_NAME.to_string(),
            cdead: None,
            calive: None,
            cdying: None,
            canvas: DEFAULT_CANVAS.to_string(),
            grid: None,
            gif: None,
            gif_length: 10,
            gif_speed: 100,
            from: None,
            to: None,
        }
    }
}

/// Validated settings plus any rasters rendered from vector sources.
///
/// The rasters are deleted when this value is dropped.
pub struct ResolvedSettings {
    pub settings: Settings,
    pub temporaries: Vec<TempRaster>,
}

impl SettingsInput {
    /// Validate every field, rendering vector or URL sources through `renderer`.
    pub fn resolve(self, renderer: &dyn SvgRenderer) -> Result<ResolvedSettings, ConfigError> {
        let path = absolute(Path::new(&self.path));
        if !path.is_dir() {
            return Err(ConfigError::InvalidPath(path));
        }

        let palette = self.palette()?;
        let (height, width) = parse_int_pair(&self.canvas, "canvas")?;
        let grid = match &self.grid {
            Some(raw) => {
                let (rows, cols) = parse_int_pair(raw, "grid")?;
                GridSpec {
                    rows,
                    cols,
                    explicit: true,
                }
            }
            None => {
                let (rows, cols) = parse_int_pair(DEFAULT_GRID, "grid")?;
                GridSpec {
                    rows,
                    cols,
                    explicit: false,
                }
            }
        };

        let frame_duration_ms = u32::try_from(self.gif_speed)
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or(ConfigError::InvalidFrameDuration(self.gif_speed))?;

        let mut temporaries = Vec::new();
        let mut source = |raw: &str, field: &'static str| -> Result<PathBuf, ConfigError> {
            if is_vector_source(raw) {
                let raster = resolve_source(raw, &path, &self.name, renderer)
                    .map_err(|source| ConfigError::Render { field, source })?;
                let out = raster.path().to_path_buf();
                temporaries.push(raster);
                Ok(out)
            } else {
                Ok(absolute(Path::new(raw)))
            }
        };

        let gif = non_empty(&self.gif).map(|raw| source(raw, "gif")).transpose()?;
        let from = non_empty(&self.from).map(|raw| source(raw, "from")).transpose()?;
        let to = non_empty(&self.to).map(|raw| source(raw, "to")).transpose()?;

        if from.is_some() != to.is_some() {
            return Err(ConfigError::IncompleteTransition);
        }

        let mode = match (gif, from, to) {
            (Some(source), _, _) => RunMode::Sequence {
                source: validate_image_file(source, "gif")?,
                length: self.gif_length,
            },
            (None, Some(from), Some(to)) => RunMode::Transition {
                from: validate_image_file(from, "from")?,
                to: validate_image_file(to, "to")?,
                length: self.gif_length,
            },
            _ => RunMode::Evolve,
        };

        if mode.is_animated() {
            if let PaletteMode::Fixed(fixed) = &palette {
                if !fixed.is_opaque() {
                    return Err(ConfigError::TranslucentPalette);
                }
            }
        }

        Ok(ResolvedSettings {
            settings: Settings {
                path,
                name: self.name,
                palette,
                canvas: Dimensions { height, width },
                grid,
                mode,
                frame_duration_ms,
            },
            temporaries,
        })
    }

    fn palette(&self) -> Result<PaletteMode, ConfigError> {
        if self.cdead.is_none() && self.calive.is_none() && self.cdying.is_none() {
            return Ok(PaletteMode::Auto);
        }
        let color = |raw: &Option<String>, field, fallback| match raw {
            Some(raw) => parse_color(raw, field),
            None => Ok(fallback),
        };
        Ok(PaletteMode::Fixed(Palette {
            dead: color(&self.cdead, "cdead", FALLBACK_DEAD)?,
            alive: color(&self.calive, "calive", FALLBACK_ALIVE)?,
            dying: color(&self.cdying, "cdying", FALLBACK_DYING)?,
        }))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Parse `a,b` into two positive integers.
pub fn parse_int_pair(raw: &str, field: &'static str) -> Result<(u32, u32), ConfigError> {
    let values: Vec<i64> = raw
        .split(',')
        .map(|item| item.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ConfigError::InvalidPair {
            field,
            value: raw.to_string(),
        })?;

    match values.as_slice() {
        [a, b] if *a > 0 && *b > 0 => {
            let a = u32::try_from(*a).map_err(|_| ConfigError::NonPositivePair { field })?;
            let b = u32::try_from(*b).map_err(|_| ConfigError::NonPositivePair { field })?;
            Ok((a, b))
        }
        _ => Err(ConfigError::NonPositivePair { field }),
    }
}

/// Check that `path` is an existing file with an accepted raster extension.
pub fn validate_image_file(path: PathBuf, field: &'static str) -> Result<PathBuf, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::MissingFile { field, path });
    }
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false);
    if !supported {
        return Err(ConfigError::UnsupportedExtension { field, path });
    }
    Ok(path)
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid path {0:?}: choose an existing folder")]
    InvalidPath(PathBuf),
    #[error("Invalid {field}: {value:?} is not a color value")]
    InvalidColor { field: &'static str, value: String },
    #[error("Invalid {field}: expected a,b but got {value:?}")]
    InvalidPair { field: &'static str, value: String },
    #[error("Invalid {field}: expected two positive integers")]
    NonPositivePair { field: &'static str },
    #[error("Invalid {field}: file {path:?} does not exist")]
    MissingFile { field: &'static str, path: PathBuf },
    #[error(
        "Invalid {field}: unsupported file type {path:?}, allowed: {:?}",
        ALLOWED_EXTENSIONS
    )]
    UnsupportedExtension { field: &'static str, path: PathBuf },
    #[error("Transition requires both from and to")]
    IncompleteTransition,
    #[error("GIF/transition generation requires fully opaque colors")]
    TranslucentPalette,
    #[error("Frame duration must be a positive number of milliseconds, got {0}")]
    InvalidFrameDuration(i64),
    #[error("Could not render {field} source")]
    Render {
        field: &'static str,
        #[source]
        source: RenderError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Rgba;
    use std::cell::Cell;
    use tempfile::tempdir;

    /// Writes a 2x2 PNG instead of driving a browser.
    struct StubRenderer {
        calls: Cell<usize>,
    }

    impl SvgRenderer for StubRenderer {
        fn render(&self, _source: &str, out: &Path) -> Result<(), RenderError> {
            self.calls.set(self.calls.get() + 1);
            image::RgbaImage::new(2, 2).save(out)?;
            Ok(())
        }
    }

    fn stub() -> StubRenderer {
        StubRenderer {
            calls: Cell::new(0),
        }
    }

    fn input_in(dir: &Path) -> SettingsInput {
        SettingsInput {
            path: dir.to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    fn write_png(path: &Path) {
        image::RgbaImage::new(4, 4).save(path).unwrap();
    }

    #[test]
    fn test_defaults_resolve_to_evolve_with_auto_palette() {
        let dir = tempdir().unwrap();
        let resolved = input_in(dir.path()).resolve(&stub()).unwrap();
        let settings = resolved.settings;

        assert_eq!(settings.mode, RunMode::Evolve);
        assert!(settings.palette.is_auto());
        assert_eq!(
            settings.canvas,
            Dimensions {
                height: 420,
                width: 1200
            }
        );
        assert_eq!(settings.grid.rows, 84);
        assert_eq!(settings.grid.cols, 240);
        assert!(!settings.grid.explicit);
        assert_eq!(settings.target_image(), settings.path.join("GameOfLife.png"));
        assert_eq!(
            settings.counter_path(),
            settings.path.join("GameOfLife_Iteration.svg")
        );
    }

    #[test]
    fn test_partial_palette_fills_fallbacks() {
        let dir = tempdir().unwrap();
        let input = SettingsInput {
            calive: Some("#000000".to_string()),
            grid: Some("10,20".to_string()),
            ..input_in(dir.path())
        };
        let settings = input.resolve(&stub()).unwrap().settings;

        match settings.palette {
            PaletteMode::Fixed(p) => {
                assert_eq!(p.alive, Rgba::new(0, 0, 0, 255));
                assert_eq!(p.dead, FALLBACK_DEAD);
                assert_eq!(p.dying, FALLBACK_DYING);
            }
            PaletteMode::Auto => panic!("expected fixed palette"),
        }
        assert!(settings.grid.explicit);
    }

    #[test]
    fn test_invalid_path_rejected() {
        let dir = tempdir().unwrap();
        let input = input_in(&dir.path().join("missing"));
        assert!(matches!(
            input.resolve(&stub()),
            Err(ConfigError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_int_pair_validation() {
        assert_eq!(parse_int_pair(" 3, 4 ", "canvas").unwrap(), (3, 4));
        assert!(matches!(
            parse_int_pair("3", "canvas"),
            Err(ConfigError::NonPositivePair { .. })
        ));
        assert!(matches!(
            parse_int_pair("0,4", "canvas"),
            Err(ConfigError::NonPositivePair { .. })
        ));
        assert!(matches!(
            parse_int_pair("a,b", "canvas"),
            Err(ConfigError::InvalidPair { .. })
        ));
    }

    #[test]
    fn test_transition_requires_both_sources() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("from.png");
        write_png(&from);
        let input = SettingsInput {
            from: Some(from.to_string_lossy().into_owned()),
            ..input_in(dir.path())
        };
        assert!(matches!(
            input.resolve(&stub()),
            Err(ConfigError::IncompleteTransition)
        ));
    }

    #[test]
    fn test_translucent_palette_rejected_for_animation() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("seed.png");
        write_png(&source);
        let input = SettingsInput {
            cdead: Some("#ffffff80".to_string()),
            gif: Some(source.to_string_lossy().into_owned()),
            ..input_in(dir.path())
        };
        assert!(matches!(
            input.resolve(&stub()),
            Err(ConfigError::TranslucentPalette)
        ));

        // A translucent palette is fine for a single frame.
        let input = SettingsInput {
            cdead: Some("#ffffff80".to_string()),
            ..input_in(dir.path())
        };
        assert!(input.resolve(&stub()).is_ok());
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, "hello").unwrap();
        let input = SettingsInput {
            gif: Some(source.to_string_lossy().into_owned()),
            ..input_in(dir.path())
        };
        assert!(matches!(
            input.resolve(&stub()),
            Err(ConfigError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_gif_takes_precedence_over_transition() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.PNG");
        let b = dir.path().join("b.png");
        write_png(&a);
        write_png(&b);
        let input = SettingsInput {
            gif: Some(a.to_string_lossy().into_owned()),
            from: Some(a.to_string_lossy().into_owned()),
            to: Some(b.to_string_lossy().into_owned()),
            gif_length: -1,
            ..input_in(dir.path())
        };
        let settings = input.resolve(&stub()).unwrap().settings;
        assert!(matches!(settings.mode, RunMode::Sequence { length: -1, .. }));
    }

    #[test]
    fn test_vector_source_rendered_and_cleaned_up() {
        let dir = tempdir().unwrap();
        let svg = dir.path().join("banner.svg");
        std::fs::write(&svg, "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
        let renderer = stub();
        let input = SettingsInput {
            gif: Some(svg.to_string_lossy().into_owned()),
            ..input_in(dir.path())
        };

        let resolved = input.resolve(&renderer).unwrap();
        assert_eq!(renderer.calls.get(), 1);
        let rendered = dir.path().join("banner.png");
        assert!(rendered.exists());
        match &resolved.settings.mode {
            RunMode::Sequence { source, .. } => assert!(source.ends_with("banner.png")),
            other => panic!("unexpected mode {other:?}"),
        }

        drop(resolved);
        assert!(!rendered.exists());
    }

    #[test]
    fn test_zero_frame_duration_rejected() {
        let dir = tempdir().unwrap();
        let input = SettingsInput {
            gif_speed: 0,
            ..input_in(dir.path())
        };
        assert!(matches!(
            input.resolve(&stub()),
            Err(ConfigError::InvalidFrameDuration(0))
        ));
    }
}
