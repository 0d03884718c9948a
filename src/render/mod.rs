//! Rendering vector sources to rasters.
//!
//! Simulation code only ever sees raster files. Sources given as SVG files
//! or URLs are rendered once, during settings resolution, through an
//! [`SvgRenderer`]; the resulting PNG lives next to the output and is
//! removed when the run ends.

mod cdp;
mod chrome;

use std::path::{Path, PathBuf};

pub use cdp::{CdpSession, CdpTransport};
pub use chrome::{ChromeRenderer, ScreenshotMetrics, find_browser, finish_screenshot};

/// Renders vector markup (a local file or a URL) to a PNG.
pub trait SvgRenderer {
    /// Render `source`, a `file://`, `http://` or `https://` URL, to `out`.
    fn render(&self, source: &str, out: &Path) -> Result<(), RenderError>;
}

/// True for `.svg` paths (any case) and HTTP(S) URLs.
pub fn is_vector_source(raw: &str) -> bool {
    let raw = raw.trim();
    raw.to_ascii_lowercase().ends_with(".svg")
        || raw.starts_with("http://")
        || raw.starts_with("https://")
}

/// A rendered raster, deleted on drop.
#[derive(Debug)]
pub struct TempRaster {
    path: PathBuf,
}

impl TempRaster {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempRaster {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Render `raw` into `{dir}/{stem}.png`.
///
/// `stem` is the file stem for an existing local file and `name` otherwise.
pub fn resolve_source(
    raw: &str,
    dir: &Path,
    name: &str,
    renderer: &dyn SvgRenderer,
) -> Result<TempRaster, RenderError> {
    let raw = raw.trim();
    let local = std::path::absolute(raw).ok().filter(|p| p.is_file());

    let (source, stem) = match &local {
        Some(path) => {
            let url = reqwest::Url::from_file_path(path)
                .map_err(|_| RenderError::Protocol(format!("cannot express {path:?} as a URL")))?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string());
            (url.to_string(), stem)
        }
        None => (raw.to_string(), name.to_string()),
    };

    let out = dir.join(format!("{stem}.png"));
    log::info!("Converting SVG to PNG: {}", raw);
    renderer.render(&source, &out)?;
    Ok(TempRaster::new(out))
}

/// Failures while rendering vector sources.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Chrome/Chromium not found. Install it or add it to PATH.")]
    BrowserNotFound,
    #[error("Could not launch {browser:?}")]
    Launch {
        browser: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Chrome DevTools did not start in time")]
    DevToolsTimeout,
    #[error("DevTools protocol error: {0}")]
    Protocol(String),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Screenshot payload error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
