use std::fs;
use std::path::Path;

use crate::error::{GemxError, Result, ViewError};
use crate::view::{ChatView, ScrollMetrics, ScrollRegion, ScrollTarget};

const VIEWPORT_HEIGHT: f64 = 1000.0;

/// A fully materialized page, such as a saved conversation.
#[derive(Debug, Clone)]
pub struct StaticView {
    html: String,
}

impl StaticView {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        read_snapshot(path).map(Self::new)
    }
}

impl ChatView for StaticView {
    fn current_html(&mut self) -> std::result::Result<String, ViewError> {
        Ok(self.html.clone())
    }

    fn scroll_regions(&mut self) -> std::result::Result<Vec<ScrollRegion>, ViewError> {
        Ok(Vec::new())
    }

    fn metrics(&mut self, target: &ScrollTarget) -> std::result::Result<ScrollMetrics, ViewError> {
        match target {
            ScrollTarget::Viewport => Ok(ScrollMetrics {
                scroll_top: 0.0,
                scroll_height: VIEWPORT_HEIGHT,
                client_height: VIEWPORT_HEIGHT,
            }),
            ScrollTarget::Region(handle) => Err(ViewError::UnknownTarget(handle.clone())),
        }
    }

    fn scroll_to(&mut self, target: &ScrollTarget, _top: f64) -> std::result::Result<(), ViewError> {
        match target {
            ScrollTarget::Viewport => Ok(()),
            ScrollTarget::Region(handle) => Err(ViewError::UnknownTarget(handle.clone())),
        }
    }
}

pub(crate) fn read_snapshot(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| GemxError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(GemxError::EmptySnapshot {
            path: path.to_path_buf(),
        });
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
