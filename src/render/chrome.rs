//! Headless Chrome driven over the DevTools protocol.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use image::imageops::FilterType;
use serde::Deserialize;
use serde_json::{Value, json};

use super::cdp::CdpSession;
use super::{RenderError, SvgRenderer};

const BROWSER_NAMES: [&str; 5] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium-browser",
    "chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

#[cfg(windows)]
const WINDOWS_INSTALLS: [&str; 3] = [
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

/// Pixels trimmed from each edge of the screenshot.
const BORDER_CROP: u32 = 4;

const DEVTOOLS_ATTEMPTS: usize = 40;
const DEVTOOLS_POLL: Duration = Duration::from_millis(250);
const READY_ATTEMPTS: usize = 50;
const READY_POLL: Duration = Duration::from_millis(200);
const SETTLE: Duration = Duration::from_millis(100);

/// Pauses SVG (SMIL) and CSS animations at their final state.
const FREEZE_ANIMATIONS_JS: &str = r#"
const svg = document.querySelector("svg");
if (svg) {
    try {
        svg.pauseAnimations();
        let maxDur = 0;
        document.querySelectorAll("animate, animateTransform, animateMotion")
        .forEach(el => {
            const dur = el.getAttribute("dur");
            if (!dur) return;
            let seconds = 0;
            if (dur.endsWith("ms")) seconds = parseFloat(dur) / 1000;
            else if (dur.endsWith("s")) seconds = parseFloat(dur);
            if (seconds > maxDur) maxDur = seconds;
        });
        svg.setCurrentTime(maxDur > 0 ? maxDur + 0.1 : 9999);
    } catch(e) {}
    document.querySelectorAll("*").forEach(el => {
        const style = window.getComputedStyle(el);
        if (style.animationDuration !== "0s") {
            el.style.animationPlayState = "paused";
            el.style.animationDelay = "0s";
            el.style.animationDuration = "0s";
        }
        if (style.transitionDuration !== "0s") {
            el.style.transition = "none";
        }
    });
}
"#;

const METRICS_JS: &str = r#"
(function() {
    const svg = document.querySelector("svg");
    const rect = svg.getBoundingClientRect();
    return JSON.stringify({
        x: rect.x, y: rect.y,
        width: rect.width, height: rect.height
    });
})()
"#;

/// Bounding box of the root `<svg>` element in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScreenshotMetrics {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Locate a Chrome or Chromium executable.
pub fn find_browser() -> Result<PathBuf, RenderError> {
    #[cfg(windows)]
    for candidate in WINDOWS_INSTALLS {
        let path = Path::new(candidate);
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
    }

    let search_path = std::env::var_os("PATH").unwrap_or_default();
    for name in BROWSER_NAMES {
        let direct = Path::new(name);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }
        for dir in std::env::split_paths(&search_path) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            #[cfg(windows)]
            {
                let candidate = candidate.with_extension("exe");
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
    }
    Err(RenderError::BrowserNotFound)
}

/// Child process killed on drop.
struct BrowserProcess(Child);

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// [`SvgRenderer`] backed by a headless Chrome launched per render.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    browser: Option<PathBuf>,
    scale: u32,
}

impl Default for ChromeRenderer {
    fn default() -> Self {
        Self {
            browser: None,
            scale: 1,
        }
    }
}

impl ChromeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this executable instead of searching for one.
    pub fn with_browser(mut self, browser: PathBuf) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Device scale factor; the output is `scale` times the CSS size.
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    fn launch(&self, port: u16) -> Result<BrowserProcess, RenderError> {
        let browser = match &self.browser {
            Some(path) => path.clone(),
            None => find_browser()?,
        };
        log::debug!("Launching {} on port {}", browser.display(), port);

        let scale_flag = format!("--force-device-scale-factor={}", self.scale);
        let port_flag = format!("--remote-debugging-port={port}");
        Command::new(&browser)
            .args([
                "--headless=new",
                "--disable-gpu",
                "--hide-scrollbars",
                "--no-sandbox",
                "--allow-file-access-from-files",
                scale_flag.as_str(),
                "--window-size=1920,1080",
                port_flag.as_str(),
                "about:blank",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(BrowserProcess)
            .map_err(|source| RenderError::Launch { browser, source })
    }

    fn capture(&self, source: &str, port: u16) -> Result<(Vec<u8>, ScreenshotMetrics), RenderError> {
        let socket_url = wait_for_page(port)?;
        let (socket, _) = tungstenite::connect(socket_url.as_str())?;
        let mut session = CdpSession::new(socket);

        session.call("Page.enable", json!({}))?;
        session.call("Page.navigate", json!({ "url": source }))?;

        for _ in 0..READY_ATTEMPTS {
            thread::sleep(READY_POLL);
            if session.evaluate("document.readyState")? == "complete" {
                break;
            }
        }

        session.call("Runtime.evaluate", json!({ "expression": FREEZE_ANIMATIONS_JS }))?;
        thread::sleep(SETTLE);

        let metrics = match session.evaluate(METRICS_JS)? {
            Value::String(raw) => serde_json::from_str::<ScreenshotMetrics>(&raw)?,
            other => {
                return Err(RenderError::Protocol(format!(
                    "no <svg> element found in {source}: {other}"
                )));
            }
        };

        let screenshot = session.call(
            "Page.captureScreenshot",
            json!({
                "format": "png",
                "clip": {
                    "x": metrics.x,
                    "y": metrics.y,
                    "width": metrics.width,
                    "height": metrics.height,
                    "scale": 1,
                },
            }),
        )?;
        let _ = session.into_inner().close(None);

        let data = screenshot
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| RenderError::Protocol("screenshot without data".into()))?;
        Ok((STANDARD.decode(data)?, metrics))
    }
}

impl SvgRenderer for ChromeRenderer {
    fn render(&self, source: &str, out: &Path) -> Result<(), RenderError> {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let port = free_port()?;
        let _browser = self.launch(port)?;
        let (png, metrics) = self.capture(source, port)?;
        finish_screenshot(&png, &metrics, self.scale)?.save(out)?;
        log::debug!("Rendered {} to {}", source, out.display());
        Ok(())
    }
}

/// Resize a captured screenshot to the exact element size and trim its border.
pub fn finish_screenshot(
    png: &[u8],
    metrics: &ScreenshotMetrics,
    scale: u32,
) -> Result<DynamicImage, RenderError> {
    let mut image = image::load_from_memory(png)?;
    let exact_width = metrics.width as u32 * scale;
    let exact_height = metrics.height as u32 * scale;
    if (image.width(), image.height()) != (exact_width, exact_height) {
        image = image.resize_exact(exact_width, exact_height, FilterType::Lanczos3);
    }

    if image.width() <= 2 * BORDER_CROP || image.height() <= 2 * BORDER_CROP {
        return Err(RenderError::Protocol(format!(
            "rendered image too small: {}x{}",
            image.width(),
            image.height()
        )));
    }
    Ok(image.crop_imm(
        BORDER_CROP,
        BORDER_CROP,
        image.width() - 2 * BORDER_CROP,
        image.height() - 2 * BORDER_CROP,
    ))
}

fn free_port() -> Result<u16, RenderError> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Poll the DevTools endpoint until a page target is available.
fn wait_for_page(port: u16) -> Result<String, RenderError> {
    let endpoint = format!("http://127.0.0.1:{port}/json");
    for _ in 0..DEVTOOLS_ATTEMPTS {
        thread::sleep(DEVTOOLS_POLL);
        let targets = match reqwest::blocking::get(&endpoint).and_then(|r| r.json::<Vec<Value>>()) {
            Ok(targets) => targets,
            Err(e) => {
                log::trace!("DevTools not ready: {}", e);
                continue;
            }
        };
        let page = targets
            .iter()
            .filter(|t| t.get("type").and_then(Value::as_str) == Some("page"))
            .find_map(|t| t.get("webSocketDebuggerUrl").and_then(Value::as_str));
        if let Some(url) = page {
            return Ok(url.to_string());
        }
    }
    Err(RenderError::DevToolsTimeout)
}
