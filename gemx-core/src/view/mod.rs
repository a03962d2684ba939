use std::fmt;

use crate::error::ViewError;

pub mod replay;
pub mod snapshot;

pub use replay::ReplayView;
pub use snapshot::StaticView;

/// Narrow capability over the live conversation page.
///
/// The page is a single shared mutable resource; the `&mut self` receivers
/// keep one extraction at a time per view.
pub trait ChatView {
    /// Serialized markup of whatever is currently materialized.
    fn current_html(&mut self) -> std::result::Result<String, ViewError>;

    /// Scrollable elements the host knows about.
    fn scroll_regions(&mut self) -> std::result::Result<Vec<ScrollRegion>, ViewError>;

    fn metrics(&mut self, target: &ScrollTarget) -> std::result::Result<ScrollMetrics, ViewError>;

    fn scroll_to(&mut self, target: &ScrollTarget, top: f64) -> std::result::Result<(), ViewError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScrollTarget {
    Viewport,
    /// Host handle of a scrollable element.
    Region(String),
}

impl fmt::Display for ScrollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Viewport => write!(f, "viewport"),
            Self::Region(handle) => write!(f, "region:{handle}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn max_top(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    pub fn is_scrollable(&self) -> bool {
        self.scroll_height > self.client_height + 1.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// A scrollable element as described by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRegion {
    pub handle: String,
    pub class_name: String,
    pub rect: Rect,
    pub metrics: ScrollMetrics,
    /// Ancestor distance from the closest located message, when the region
    /// contains one.
    pub message_depth: Option<usize>,
}

impl ScrollRegion {
    pub fn target(&self) -> ScrollTarget {
        ScrollTarget::Region(self.handle.clone())
    }
}
