//! Deterministic layout for tests and the CLI
//!
//! Blocks are stacked along the reading axis: text blocks take
//! `ceil(len / chars_per_line)` lines, image blocks a fixed extent. Scrolling
//! is only clamped at the origin, so any block can be brought to the reading
//! edge.

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use shiori_core::{BlockId, BlockKind, SegmentedChapter};

use crate::geometry::{
    Alignment, HitPoint, LayoutOracle, PageMetrics, Point, Rect, VisibilityReport, WritingMode,
};

/// Typography and viewport of the simulated reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
    /// Viewport width in px
    pub viewport_width: f64,
    /// Viewport height in px
    pub viewport_height: f64,
    /// Font size in px; one character occupies a square of this size
    pub font_size_px: f64,
    /// Line height as a multiple of the font size
    pub line_height: f64,
    /// Margin on both sides of the cross axis
    pub margin_px: f64,
    /// Space between blocks along the reading axis
    pub block_gap_px: f64,
    /// Extent of an image block along the reading axis
    pub image_extent_px: f64,
    /// Text direction
    pub writing_mode: WritingMode,
    /// Paginated (columns) instead of continuous scroll
    pub paginated: bool,
    /// Gap between page columns
    pub column_gap_px: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            viewport_width: 390.0,
            viewport_height: 844.0,
            font_size_px: 18.0,
            line_height: 1.6,
            margin_px: 16.0,
            block_gap_px: 12.0,
            image_extent_px: 240.0,
            writing_mode: WritingMode::HorizontalTb,
            paginated: false,
            column_gap_px: 32.0,
        }
    }
}

impl LayoutMetrics {
    fn cross_extent(&self) -> f64 {
        match self.writing_mode {
            WritingMode::HorizontalTb => self.viewport_width,
            WritingMode::VerticalRl => self.viewport_height,
        }
    }

    /// Viewport size along the reading axis
    pub fn viewport_flow_extent(&self) -> f64 {
        match self.writing_mode {
            WritingMode::HorizontalTb => self.viewport_height,
            WritingMode::VerticalRl => self.viewport_width,
        }
    }

    /// Characters that fit on one line
    pub fn chars_per_line(&self) -> usize {
        let usable = self.cross_extent() - 2.0 * self.margin_px;
        ((usable / self.font_size_px).floor().max(1.0)) as usize
    }

    /// Line advance along the reading axis
    pub fn line_extent(&self) -> f64 {
        self.font_size_px * self.line_height
    }
}

#[derive(Debug, Clone)]
struct SimBlock {
    id: BlockId,
    len: usize,
    image: bool,
    start: f64,
    extent: f64,
}

/// In-memory [`LayoutOracle`] over one segmented chapter
#[derive(Debug)]
pub struct SimulatedLayout {
    metrics: LayoutMetrics,
    blocks: Vec<SimBlock>,
    scroll: f64,
    mount_probes_left: Cell<u32>,
    settle_probes_left: Cell<u32>,
}

impl SimulatedLayout {
    /// Lay out `chapter` with `metrics`, scrolled to the origin
    pub fn new(chapter: &SegmentedChapter, metrics: LayoutMetrics) -> Self {
        let blocks = chapter
            .blocks
            .iter()
            .map(|b| SimBlock {
                id: b.id.clone(),
                len: b.clean_char_count,
                image: b.kind == BlockKind::ImageContainer && b.is_empty(),
                start: 0.0,
                extent: 0.0,
            })
            .collect();
        let mut layout = Self {
            metrics,
            blocks,
            scroll: 0.0,
            mount_probes_left: Cell::new(0),
            settle_probes_left: Cell::new(0),
        };
        layout.layout();
        layout
    }

    /// Report "not mounted" for the first `probes` mount checks
    pub fn with_mount_delay(self, probes: u32) -> Self {
        self.mount_probes_left.set(probes);
        self
    }

    /// Report "not settled" for the first `probes` settle checks
    pub fn with_settle_delay(self, probes: u32) -> Self {
        self.settle_probes_left.set(probes);
        self
    }

    /// Active metrics
    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Reflow with new metrics, keeping the pixel scroll offset
    pub fn relayout(&mut self, metrics: LayoutMetrics) {
        self.metrics = metrics;
        self.layout();
        if self.metrics.paginated {
            let page = self.current_page().min(self.total_pages() - 1);
            self.scroll = page as f64 * self.page_size();
        }
    }

    /// Drop a block from the view, as a re-render with different structure would
    pub fn remove_block(&mut self, id: &str) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|b| b.id.as_str() != id);
        let removed = self.blocks.len() != before;
        if removed {
            self.layout();
        }
        removed
    }

    /// Scroll offset along the reading axis
    pub fn scroll_position(&self) -> f64 {
        self.scroll
    }

    /// Scroll to an absolute flow offset
    pub fn set_scroll(&mut self, offset: f64) {
        self.scroll = offset.max(0.0);
    }

    /// Number of pages in paginated mode
    pub fn total_pages(&self) -> usize {
        let size = self.page_size();
        if size <= 0.0 {
            return 1;
        }
        ((self.content_extent() / size).ceil() as usize).max(1)
    }

    fn page_size(&self) -> f64 {
        self.metrics.viewport_flow_extent() + self.metrics.column_gap_px
    }

    fn content_extent(&self) -> f64 {
        self.blocks.last().map_or(0.0, |b| b.start + b.extent)
    }

    fn layout(&mut self) {
        let per_line = self.metrics.chars_per_line();
        let line = self.metrics.line_extent();
        let mut flow = 0.0;
        for block in &mut self.blocks {
            block.start = flow;
            block.extent = if block.image {
                self.metrics.image_extent_px
            } else {
                block.len.div_ceil(per_line).max(1) as f64 * line
            };
            flow += block.extent + self.metrics.block_gap_px;
        }
    }

    fn find(&self, id: &str) -> Option<&SimBlock> {
        self.blocks.iter().find(|b| b.id.as_str() == id)
    }

    fn rect_of(&self, block: &SimBlock) -> Rect {
        let offset = block.start - self.scroll;
        match self.metrics.writing_mode {
            WritingMode::HorizontalTb => {
                Rect::new(0.0, offset, self.metrics.viewport_width, block.extent)
            }
            WritingMode::VerticalRl => Rect::new(
                self.metrics.viewport_width - offset - block.extent,
                0.0,
                block.extent,
                self.metrics.viewport_height,
            ),
        }
    }
}

impl LayoutOracle for SimulatedLayout {
    fn writing_mode(&self) -> WritingMode {
        self.metrics.writing_mode
    }

    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, self.metrics.viewport_width, self.metrics.viewport_height)
    }

    fn has_block(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    fn bounding_box(&self, id: &str) -> Option<Rect> {
        self.find(id).map(|b| self.rect_of(b))
    }

    fn visibility(&self, band: Rect) -> Vec<VisibilityReport> {
        self.blocks
            .iter()
            .filter_map(|block| {
                let rect = self.rect_of(block);
                let area = rect.area();
                if area <= 0.0 {
                    return None;
                }
                rect.intersection(&band).map(|overlap| VisibilityReport {
                    block_id: block.id.clone(),
                    ratio: overlap.area() / area,
                })
            })
            .collect()
    }

    fn hit_test(&self, point: Point) -> Option<HitPoint> {
        if !self.viewport().contains(point) {
            return None;
        }
        let (flow, cross) = match self.metrics.writing_mode {
            WritingMode::HorizontalTb => (self.scroll + point.y, point.x),
            WritingMode::VerticalRl => {
                (self.scroll + (self.metrics.viewport_width - point.x), point.y)
            }
        };
        let block = self
            .blocks
            .iter()
            .find(|b| flow >= b.start && flow < b.start + b.extent)?;
        if block.image {
            return Some(HitPoint {
                block_id: block.id.clone(),
                local_offset: 0,
            });
        }

        let per_line = self.metrics.chars_per_line();
        let line = ((flow - block.start) / self.metrics.line_extent()).floor() as usize;
        let column = ((cross - self.metrics.margin_px) / self.metrics.font_size_px)
            .floor()
            .max(0.0) as usize;
        Some(HitPoint {
            block_id: block.id.clone(),
            local_offset: (line * per_line + column.min(per_line - 1)).min(block.len),
        })
    }

    fn scroll_into_view(&mut self, id: &str, alignment: Alignment) -> bool {
        let Some(block) = self.find(id) else {
            return false;
        };
        let target = match alignment {
            Alignment::Start => block.start,
            Alignment::Center => {
                block.start + block.extent / 2.0 - self.metrics.viewport_flow_extent() / 2.0
            }
        };
        if self.metrics.paginated {
            let page = (block.start / self.page_size()).floor() as usize;
            return self.go_to_page(page);
        }
        self.scroll = target.max(0.0);
        true
    }

    fn scroll_by(&mut self, delta: f64) {
        self.scroll = (self.scroll + delta).max(0.0);
    }

    fn reset_scroll(&mut self) {
        self.scroll = 0.0;
    }

    fn offset_from_origin(&self, id: &str) -> Option<f64> {
        self.find(id).map(|b| b.start)
    }

    fn scroll_extent(&self) -> f64 {
        self.content_extent()
    }

    fn is_mounted(&self) -> bool {
        countdown(&self.mount_probes_left)
    }

    fn layout_settled(&self) -> bool {
        countdown(&self.settle_probes_left)
    }

    fn page_metrics(&self) -> Option<PageMetrics> {
        self.metrics.paginated.then(|| PageMetrics {
            column_width: self.metrics.viewport_flow_extent(),
            gap: self.metrics.column_gap_px,
        })
    }

    fn current_page(&self) -> usize {
        let size = self.page_size();
        if size <= 0.0 {
            return 0;
        }
        (self.scroll / size).floor() as usize
    }

    fn go_to_page(&mut self, page: usize) -> bool {
        if !self.metrics.paginated {
            return false;
        }
        let page = page.min(self.total_pages() - 1);
        self.scroll = page as f64 * self.page_size();
        true
    }
}

/// True once the counter has run out; each false answer uses one probe.
fn countdown(left: &Cell<u32>) -> bool {
    match left.get() {
        0 => true,
        n => {
            left.set(n - 1);
            false
        }
    }
}
