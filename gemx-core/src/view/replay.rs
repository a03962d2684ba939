use std::path::Path;

use walkdir::WalkDir;

use crate::error::{GemxError, Result, ViewError};
use crate::view::snapshot::read_snapshot;
use crate::view::{ChatView, Rect, ScrollMetrics, ScrollRegion, ScrollTarget};

pub const REPLAY_REGION: &str = "chat-history";
pub const DEFAULT_WINDOW_HEIGHT: f64 = 800.0;

/// Virtualized conversation replayed from captured windows.
///
/// `windows` are ordered oldest first; each covers `window_height` pixels of
/// scroll extent and only the window under the current position is
/// materialized.
#[derive(Debug, Clone)]
pub struct ReplayView {
    windows: Vec<String>,
    window_height: f64,
    scroll_top: f64,
}

impl ReplayView {
    pub fn new(windows: Vec<String>, window_height: f64) -> Self {
        Self {
            windows,
            window_height: window_height.max(1.0),
            scroll_top: 0.0,
        }
    }

    /// Loads `*.html` snapshots from `dir`, ordered by file name.
    pub fn from_dir(dir: &Path, window_height: f64) -> Result<Self> {
        let mut paths = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
            })
            .collect::<Vec<_>>();
        paths.sort();

        if paths.is_empty() {
            return Err(GemxError::NoSnapshots {
                path: dir.to_path_buf(),
            });
        }

        let windows = paths
            .iter()
            .map(|path| read_snapshot(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(windows, window_height))
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    fn current_index(&self) -> usize {
        if self.windows.is_empty() {
            return 0;
        }
        let index = (self.scroll_top / self.window_height).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = index.max(0.0) as usize;
        index.min(self.windows.len() - 1)
    }

    fn region_metrics(&self) -> ScrollMetrics {
        #[allow(clippy::cast_precision_loss)]
        let scroll_height = self.windows.len().max(1) as f64 * self.window_height;
        ScrollMetrics {
            scroll_top: self.scroll_top,
            scroll_height,
            client_height: self.window_height,
        }
    }

    fn check_target(target: &ScrollTarget) -> std::result::Result<(), ViewError> {
        match target {
            ScrollTarget::Region(handle) if handle != REPLAY_REGION => {
                Err(ViewError::UnknownTarget(handle.clone()))
            }
            _ => Ok(()),
        }
    }
}

impl ChatView for ReplayView {
    fn current_html(&mut self) -> std::result::Result<String, ViewError> {
        let index = self.current_index();
        self.windows
            .get(index)
            .cloned()
            .ok_or_else(|| ViewError::Detached("no captured windows".to_string()))
    }

    fn scroll_regions(&mut self) -> std::result::Result<Vec<ScrollRegion>, ViewError> {
        Ok(vec![ScrollRegion {
            handle: REPLAY_REGION.to_string(),
            class_name: "chat-history-scroll-container".to_string(),
            rect: Rect {
                left: 300.0,
                top: 0.0,
                width: 900.0,
                height: self.window_height,
            },
            metrics: self.region_metrics(),
            message_depth: Some(3),
        }])
    }

    fn metrics(&mut self, target: &ScrollTarget) -> std::result::Result<ScrollMetrics, ViewError> {
        Self::check_target(target)?;
        match target {
            ScrollTarget::Viewport => Ok(ScrollMetrics {
                scroll_top: 0.0,
                scroll_height: self.window_height,
                client_height: self.window_height,
            }),
            ScrollTarget::Region(_) => Ok(self.region_metrics()),
        }
    }

    fn scroll_to(&mut self, target: &ScrollTarget, top: f64) -> std::result::Result<(), ViewError> {
        Self::check_target(target)?;
        if let ScrollTarget::Region(_) = target {
            self.scroll_top = top.clamp(0.0, self.region_metrics().max_top());
        }
        Ok(())
    }
}
