//! Geometry oracle
//!
//! Everything the engine knows about live layout comes through
//! [`LayoutOracle`]. Rectangles are viewport-relative CSS pixels; "flow"
//! distances are measured along the reading axis from the content origin
//! (downwards for horizontal-tb, leftwards for vertical-rl).

use serde::{Deserialize, Serialize};
use shiori_core::BlockId;

/// A point in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a rectangle
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Area; zero for degenerate rectangles
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap with `other`, if any
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Rect::new(x, y, right - x, bottom - y))
    }

    /// Whether `point` lies inside (edges inclusive on the leading side)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

/// Text direction of the rendered chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritingMode {
    /// Lines run left to right, stacked top to bottom
    #[default]
    HorizontalTb,
    /// Lines run top to bottom, stacked right to left
    VerticalRl,
}

impl WritingMode {
    /// Band covering the leading `ratio` of the viewport along the reading axis
    pub fn reading_band(&self, viewport: Rect, ratio: f64) -> Rect {
        match self {
            WritingMode::HorizontalTb => {
                Rect::new(viewport.x, viewport.y, viewport.width, viewport.height * ratio)
            }
            WritingMode::VerticalRl => {
                let width = viewport.width * ratio;
                Rect::new(viewport.right() - width, viewport.y, width, viewport.height)
            }
        }
    }

    /// Point just inside the reading edge where the first visible character sits
    pub fn edge_point(&self, viewport: Rect) -> Point {
        match self {
            WritingMode::HorizontalTb => Point {
                x: viewport.x + 1.0,
                y: viewport.y + 1.0,
            },
            WritingMode::VerticalRl => Point {
                x: viewport.right() - 1.0,
                y: viewport.y + 1.0,
            },
        }
    }

    /// Fraction of `rect` already past the reading edge, clamped to `[0, 1]`
    pub fn fraction_past_edge(&self, rect: Rect, viewport: Rect) -> f64 {
        let (past, extent) = match self {
            WritingMode::HorizontalTb => (viewport.y - rect.y, rect.height),
            WritingMode::VerticalRl => (rect.right() - viewport.right(), rect.width),
        };
        if extent <= 0.0 {
            return 0.0;
        }
        (past / extent).clamp(0.0, 1.0)
    }

    /// Size of `rect` along the reading axis
    pub fn flow_extent(&self, rect: Rect) -> f64 {
        match self {
            WritingMode::HorizontalTb => rect.height,
            WritingMode::VerticalRl => rect.width,
        }
    }
}

/// Where a scrolled-to block should land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Block start at the reading edge
    Start,
    /// Block centered in the viewport
    Center,
}

/// Overlap of one block with the reading band
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityReport {
    /// Observed block
    pub block_id: BlockId,
    /// Intersection area over block area, in `[0, 1]`
    pub ratio: f64,
}

/// Result of hit-testing a point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitPoint {
    /// Block under the point
    pub block_id: BlockId,
    /// Clean characters into the block
    pub local_offset: usize,
}

/// Column geometry of a paginated layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    /// Width of one column (one page) along the reading axis
    pub column_width: f64,
    /// Gap between columns
    pub gap: f64,
}

impl PageMetrics {
    /// Distance between consecutive page starts
    pub fn page_size(&self) -> f64 {
        self.column_width + self.gap
    }
}

/// Live rendering surface
///
/// Queries may come back empty at any time (content still mounting,
/// zero-size elements); callers degrade instead of failing.
pub trait LayoutOracle {
    /// Writing mode of the rendered content
    fn writing_mode(&self) -> WritingMode;

    /// Visible area
    fn viewport(&self) -> Rect;

    /// Whether a block with this id is present in the rendered view
    fn has_block(&self, id: &str) -> bool;

    /// Viewport-relative box of a block
    fn bounding_box(&self, id: &str) -> Option<Rect>;

    /// Overlap ratios of every block intersecting `band`
    fn visibility(&self, band: Rect) -> Vec<VisibilityReport>;

    /// Block and character under a viewport point
    fn hit_test(&self, point: Point) -> Option<HitPoint>;

    /// Scroll so the block is aligned; false when the block is absent
    fn scroll_into_view(&mut self, id: &str, alignment: Alignment) -> bool;

    /// Scroll forward along the reading axis by `delta` pixels
    fn scroll_by(&mut self, delta: f64);

    /// Return to the content origin
    fn reset_scroll(&mut self);

    /// Flow distance from the content origin to the block start
    fn offset_from_origin(&self, id: &str) -> Option<f64>;

    /// Total flow extent of the content
    fn scroll_extent(&self) -> f64;

    /// Whether the chapter content has been mounted
    fn is_mounted(&self) -> bool {
        true
    }

    /// Whether fonts and images have finished affecting layout
    fn layout_settled(&self) -> bool {
        true
    }

    /// Column geometry, paginated layouts only
    fn page_metrics(&self) -> Option<PageMetrics> {
        None
    }

    /// Page currently shown
    fn current_page(&self) -> usize {
        0
    }

    /// Show `page`; false when the layout is not paginated
    fn go_to_page(&mut self, _page: usize) -> bool {
        false
    }
}
