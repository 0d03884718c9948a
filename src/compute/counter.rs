//! Iteration counter artifact.
//!
//! A small SVG next to the rendered frame reads `Current Iteration: N`. It is
//! best effort: read and write failures are logged and otherwise ignored.

use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::Rgba;

const HEADING_OPEN: &str = "<h1>";
const HEADING_CLOSE: &str = "</h1>";
const LABEL: &str = "Current Iteration: ";

/// How the counter changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    Increment,
    Reset,
}

/// The `{name}_Iteration.svg` artifact.
#[derive(Debug, Clone)]
pub struct IterationCounter {
    path: PathBuf,
}

impl IterationCounter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `update`, creating the artifact at 0 (styled with `alive`) if
    /// it does not exist yet.
    pub fn update(&self, alive: Rgba, update: CounterUpdate) {
        if !self.path.exists() {
            if let Err(e) = fs::write(&self.path, render_counter(alive, 0)) {
                log::warn!("Could not create {}: {}", self.path.display(), e);
            }
            return;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Could not read {}: {}", self.path.display(), e);
                return;
            }
        };

        let Some(updated) = rewrite_counter(&content, update) else {
            log::warn!("No iteration heading in {}", self.path.display());
            return;
        };

        if let Err(e) = fs::write(&self.path, updated) {
            log::warn!("Could not write {}: {}", self.path.display(), e);
        }
    }

    /// Current value, if the artifact exists and carries one.
    pub fn read(&self) -> Option<u64> {
        let content = fs::read_to_string(&self.path).ok()?;
        let heading = heading(&content)?;
        trailing_number(heading)
    }
}

/// SVG document showing iteration `n`.
pub fn render_counter(alive: Rgba, n: u64) -> String {
    format!(
        r#"<svg fill="none" viewBox="0 0 345 20" width="345px" height="20px" xmlns="http://www.w3.org/2000/svg">
  <foreignObject width="100%" height="100%">
    <div xmlns="http://www.w3.org/1999/xhtml">
      <style>
        .wrapper {{ text-align: center; width: 345px; height: 20px; }}
        h1 {{
          background: {color};
          color: #fff;
          font-size: 10px;
          font-weight: 500;
          font-family: "Josefin Sans", sans-serif;
          background-size: 200% auto;
          background-clip: text;
          -webkit-background-clip: text;
          -webkit-text-fill-color: transparent;
          display: inline-block;
        }}
      </style>
      <div class="wrapper"><h1>{LABEL}{n}</h1></div>
    </div>
  </foreignObject>
</svg>"#,
        color = alive.hex_rgb(),
    )
}

fn heading(content: &str) -> Option<&str> {
    let start = content.find(HEADING_OPEN)? + HEADING_OPEN.len();
    let end = content.find(HEADING_CLOSE)?;
    (end > start).then(|| &content[start..end])
}

fn trailing_number(text: &str) -> Option<u64> {
    let digits = text.len() - text.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    text[text.len() - digits..].parse().ok()
}

/// Replace the first occurrence of the heading text with the updated count.
fn rewrite_counter(content: &str, update: CounterUpdate) -> Option<String> {
    let old = heading(content)?;
    let next = match update {
        CounterUpdate::Increment => trailing_number(old).map_or(0, |n| n.saturating_add(1)),
        CounterUpdate::Reset => 0,
    };
    Some(content.replacen(old, &format!("{LABEL}{next}"), 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ALIVE: Rgba = Rgba::new(65, 183, 130, 255);

    #[test]
    fn test_created_at_zero_with_alive_color() {
        let dir = tempdir().unwrap();
        let counter = IterationCounter::new(dir.path().join("Life_Iteration.svg"));

        // Creation ignores the requested update.
        counter.update(ALIVE, CounterUpdate::Increment);

        let content = fs::read_to_string(counter.path()).unwrap();
        assert!(content.contains("<h1>Current Iteration: 0</h1>"));
        assert!(content.contains("background: #41b782;"));
        assert_eq!(counter.read(), Some(0));
    }

    #[test]
    fn test_increment_and_reset() {
        let dir = tempdir().unwrap();
        let counter = IterationCounter::new(dir.path().join("Life_Iteration.svg"));
        counter.update(ALIVE, CounterUpdate::Reset);

        counter.update(ALIVE, CounterUpdate::Increment);
        counter.update(ALIVE, CounterUpdate::Increment);
        assert_eq!(counter.read(), Some(2));

        counter.update(ALIVE, CounterUpdate::Reset);
        assert_eq!(counter.read(), Some(0));
    }

    #[test]
    fn test_increment_without_digits_starts_at_zero() {
        let updated =
            rewrite_counter("<p><h1>Current Iteration: ?</h1></p>", CounterUpdate::Increment)
                .unwrap();
        assert_eq!(updated, "<p><h1>Current Iteration: 0</h1></p>");
    }

    #[test]
    fn test_missing_heading_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Life_Iteration.svg");
        fs::write(&path, "<svg/>").unwrap();

        IterationCounter::new(&path).update(ALIVE, CounterUpdate::Increment);
        assert_eq!(fs::read_to_string(&path).unwrap(), "<svg/>");
    }

    #[test]
    fn test_unwritable_location_is_ignored() {
        let dir = tempdir().unwrap();
        let counter = IterationCounter::new(dir.path().join("missing").join("x.svg"));
        counter.update(ALIVE, CounterUpdate::Reset);
        assert_eq!(counter.read(), None);
    }

    #[test]
    fn test_large_values_keep_counting() {
        let doc = render_counter(ALIVE, 41_999);
        let updated = rewrite_counter(&doc, CounterUpdate::Increment).unwrap();
        assert!(updated.contains("Current Iteration: 42000"));
    }
}
