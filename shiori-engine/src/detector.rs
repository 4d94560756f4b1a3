//! Reading-edge detection
//!
//! Answers one question for either view mode: which block sits at the reading
//! edge, and how far into it the reader is. Recomputation is deferred until
//! scroll / page events have been quiet for the settle delay, and a reading is
//! only emitted when the active block changes.

use std::collections::HashMap;

use shiori_core::{BlockId, SegmentedChapter};

use crate::config::EngineConfig;
use crate::geometry::{LayoutOracle, VisibilityReport};

/// How the chapter is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    /// Continuous scrolling
    #[default]
    Continuous,
    /// One page at a time
    Paged,
}

/// The block at the reading edge and the offset into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeReading {
    /// Block at the reading edge
    pub block_id: BlockId,
    /// Clean characters into the block
    pub local_offset: usize,
    /// Whether the offset came from hit-testing rather than an estimate
    pub precise: bool,
}

/// Tracks the reading edge of one chapter view
#[derive(Debug)]
pub struct PositionDetector {
    mode: ViewMode,
    band_ratio: f64,
    settle_delay_ms: u64,
    visibility: HashMap<BlockId, f64>,
    settle_deadline: Option<u64>,
    restore_pending: bool,
    active_block: Option<BlockId>,
    latest: Option<EdgeReading>,
}

impl PositionDetector {
    /// Create a detector for `mode`
    pub fn new(mode: ViewMode, config: &EngineConfig) -> Self {
        Self {
            mode,
            band_ratio: config.reading_band_ratio,
            settle_delay_ms: config.settle_delay_ms,
            visibility: HashMap::new(),
            settle_deadline: None,
            restore_pending: false,
            active_block: None,
            latest: None,
        }
    }

    /// View mode
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// A scroll happened; restart the settle timer
    pub fn on_scroll(&mut self, now: u64) {
        self.settle_deadline = Some(now + self.settle_delay_ms);
    }

    /// The visible page changed; restart the settle timer
    pub fn on_page_change(&mut self, now: u64) {
        self.settle_deadline = Some(now + self.settle_delay_ms);
    }

    /// Record pushed visibility reports. A zero ratio means the block left the band.
    pub fn on_visibility<I>(&mut self, reports: I)
    where
        I: IntoIterator<Item = VisibilityReport>,
    {
        for report in reports {
            if report.ratio > 0.0 {
                self.visibility.insert(report.block_id, report.ratio);
            } else {
                self.visibility.remove(&report.block_id);
            }
        }
    }

    /// While set, [`poll`](Self::poll) emits nothing
    pub fn set_restore_pending(&mut self, pending: bool) {
        self.restore_pending = pending;
        if pending {
            self.settle_deadline = None;
        }
    }

    /// Whether a restore is in progress
    pub fn is_restore_pending(&self) -> bool {
        self.restore_pending
    }

    /// Whether a settle timer is armed
    pub fn has_pending_settle(&self) -> bool {
        self.settle_deadline.is_some()
    }

    /// Fire the settle timer if due.
    ///
    /// Returns a reading only when the active block differs from the last
    /// emitted one; [`latest`](Self::latest) always holds the newest reading.
    pub fn poll<O>(&mut self, now: u64, oracle: &O, chapter: &SegmentedChapter) -> Option<EdgeReading>
    where
        O: LayoutOracle + ?Sized,
    {
        if self.restore_pending {
            return None;
        }
        match self.settle_deadline {
            Some(deadline) if now >= deadline => self.settle_deadline = None,
            _ => return None,
        }

        let reading = self.detect(oracle, chapter)?;
        self.latest = Some(reading.clone());
        if self.active_block.as_ref() == Some(&reading.block_id) {
            return None;
        }
        log::debug!(
            "reading edge moved to {} (+{}{})",
            reading.block_id,
            reading.local_offset,
            if reading.precise { "" } else { ", estimated" }
        );
        self.active_block = Some(reading.block_id.clone());
        Some(reading)
    }

    /// Compute the reading edge now, without touching timers
    pub fn detect<O>(&self, oracle: &O, chapter: &SegmentedChapter) -> Option<EdgeReading>
    where
        O: LayoutOracle + ?Sized,
    {
        match self.mode {
            ViewMode::Continuous => self.detect_continuous(oracle, chapter),
            ViewMode::Paged => {
                detect_paged(oracle, chapter).or_else(|| self.detect_continuous(oracle, chapter))
            }
        }
    }

    /// Newest reading, emitted or not
    pub fn latest(&self) -> Option<&EdgeReading> {
        self.latest.as_ref()
    }

    /// Forget everything observed; used after a restore or chapter switch
    pub fn reset(&mut self) {
        self.visibility.clear();
        self.settle_deadline = None;
        self.active_block = None;
        self.latest = None;
    }

    fn detect_continuous<O>(&self, oracle: &O, chapter: &SegmentedChapter) -> Option<EdgeReading>
    where
        O: LayoutOracle + ?Sized,
    {
        let mode = oracle.writing_mode();
        let viewport = oracle.viewport();

        let queried;
        let ratios: Vec<(&BlockId, f64)> = if self.visibility.is_empty() {
            queried = oracle.visibility(mode.reading_band(viewport, self.band_ratio));
            queried.iter().map(|r| (&r.block_id, r.ratio)).collect()
        } else {
            self.visibility.iter().map(|(id, ratio)| (id, *ratio)).collect()
        };

        // Highest ratio wins; ties go to the earlier block.
        let (winner, _) = ratios
            .into_iter()
            .filter(|(_, ratio)| *ratio > 0.0)
            .filter_map(|(id, ratio)| chapter.index.ordinal(id.as_str()).map(|ord| (id, ratio, ord)))
            .fold(None::<(&BlockId, (f64, usize))>, |best, (id, ratio, ord)| match best {
                Some((_, (best_ratio, best_ord)))
                    if best_ratio > ratio || (best_ratio == ratio && best_ord < ord) =>
                {
                    best
                }
                _ => Some((id, (ratio, ord))),
            })?;

        let block = chapter.block(winner.as_str())?;

        if let Some(hit) = oracle.hit_test(mode.edge_point(viewport)) {
            if hit.block_id == block.id {
                return Some(EdgeReading {
                    block_id: block.id.clone(),
                    local_offset: hit.local_offset.min(block.clean_char_count),
                    precise: true,
                });
            }
        }

        let fraction = oracle
            .bounding_box(block.id.as_str())
            .map_or(0.0, |rect| mode.fraction_past_edge(rect, viewport));
        Some(EdgeReading {
            block_id: block.id.clone(),
            local_offset: scale(fraction, block.clean_char_count),
            precise: false,
        })
    }
}

/// The block straddling the page start, else the first block starting on the page
fn detect_paged<O>(oracle: &O, chapter: &SegmentedChapter) -> Option<EdgeReading>
where
    O: LayoutOracle + ?Sized,
{
    let metrics = oracle.page_metrics()?;
    let page_size = metrics.page_size();
    if page_size <= 0.0 {
        return None;
    }
    let mode = oracle.writing_mode();
    let page_start = oracle.current_page() as f64 * page_size;
    let page_end = page_start + metrics.column_width;

    let mut first_on_page = None;
    for block in &chapter.blocks {
        let id = block.id.as_str();
        let (Some(start), Some(rect)) = (oracle.offset_from_origin(id), oracle.bounding_box(id))
        else {
            continue;
        };
        let end = start + mode.flow_extent(rect);

        if start < page_start && end > page_start {
            let fraction = (page_start - start) / (end - start);
            return Some(EdgeReading {
                block_id: block.id.clone(),
                local_offset: scale(fraction, block.clean_char_count),
                precise: false,
            });
        }
        if first_on_page.is_none() && start >= page_start && start < page_end {
            first_on_page = Some(block);
        }
    }

    first_on_page.map(|block| EdgeReading {
        block_id: block.id.clone(),
        local_offset: 0,
        precise: false,
    })
}

fn scale(fraction: f64, len: usize) -> usize {
    ((fraction.clamp(0.0, 1.0) * len as f64).round() as usize).min(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Alignment, LayoutOracle};
    use crate::simulated::{LayoutMetrics, SimulatedLayout};
    use shiori_core::Segmenter;

    fn chapter() -> SegmentedChapter {
        let paragraphs: String = (0..6)
            .map(|i| format!("<p>{}</p>", char::from(b'a' + i).to_string().repeat(100)))
            .collect();
        Segmenter::default().segment(&format!("<body>{paragraphs}</body>"), 0)
    }

    fn metrics() -> LayoutMetrics {
        LayoutMetrics {
            viewport_width: 232.0, // 10 chars per line
            viewport_height: 400.0,
            font_size_px: 20.0,
            line_height: 1.5, // 30px lines, 300px per block
            margin_px: 16.0,
            block_gap_px: 0.0,
            ..LayoutMetrics::default()
        }
    }

    fn detector(mode: ViewMode) -> PositionDetector {
        PositionDetector::new(mode, &EngineConfig::default())
    }

    #[test]
    fn test_waits_for_settle_delay() {
        let chapter = chapter();
        let layout = SimulatedLayout::new(&chapter, metrics());
        let mut detector = detector(ViewMode::Continuous);

        detector.on_scroll(1_000);
        assert!(detector.poll(1_100, &layout, &chapter).is_none());
        let reading = detector.poll(1_120, &layout, &chapter).unwrap();
        assert_eq!(reading.block_id.as_str(), "ch0-b0");
        assert!(reading.precise);
        assert!(!detector.has_pending_settle());
    }

    #[test]
    fn test_emits_only_on_block_change() {
        let chapter = chapter();
        let mut layout = SimulatedLayout::new(&chapter, metrics());
        let mut detector = detector(ViewMode::Continuous);

        detector.on_scroll(0);
        assert!(detector.poll(200, &layout, &chapter).is_some());

        layout.scroll_by(60.0);
        detector.on_scroll(300);
        assert!(detector.poll(500, &layout, &chapter).is_none());
        assert_eq!(detector.latest().unwrap().local_offset, 20);

        layout.scroll_into_view("ch0-b2", Alignment::Start);
        detector.on_scroll(600);
        let reading = detector.poll(800, &layout, &chapter).unwrap();
        assert_eq!(reading.block_id.as_str(), "ch0-b2");
    }

    #[test]
    fn test_pushed_reports_pick_highest_ratio_then_document_order() {
        let chapter = chapter();
        let layout = SimulatedLayout::new(&chapter, metrics());
        let mut detector = detector(ViewMode::Continuous);

        detector.on_visibility([
            VisibilityReport {
                block_id: BlockId::new(0, 3),
                ratio: 0.4,
            },
            VisibilityReport {
                block_id: BlockId::new(0, 1),
                ratio: 0.4,
            },
            VisibilityReport {
                block_id: BlockId::new(0, 4),
                ratio: 0.1,
            },
        ]);
        let reading = detector.detect(&layout, &chapter).unwrap();
        assert_eq!(reading.block_id.as_str(), "ch0-b1");
        // The edge point is over ch0-b0, so the offset is estimated.
        assert!(!reading.precise);
        assert_eq!(reading.local_offset, 0);

        detector.on_visibility([VisibilityReport {
            block_id: BlockId::new(0, 1),
            ratio: 0.0,
        }]);
        let reading = detector.detect(&layout, &chapter).unwrap();
        assert_eq!(reading.block_id.as_str(), "ch0-b3");
    }

    #[test]
    fn test_restore_pending_suppresses_emission() {
        let chapter = chapter();
        let layout = SimulatedLayout::new(&chapter, metrics());
        let mut detector = detector(ViewMode::Continuous);

        detector.on_scroll(0);
        detector.set_restore_pending(true);
        assert!(detector.poll(10_000, &layout, &chapter).is_none());

        detector.set_restore_pending(false);
        detector.on_scroll(10_000);
        assert!(detector.poll(10_200, &layout, &chapter).is_some());
    }

    #[test]
    fn test_paged_straddling_block() {
        let chapter = chapter();
        let mut layout = SimulatedLayout::new(
            &chapter,
            LayoutMetrics {
                paginated: true,
                column_gap_px: 0.0,
                ..metrics()
            },
        );
        // Page 1 starts at 400px: ch0-b1 spans 300..600, a third of it is behind.
        assert!(layout.go_to_page(1));
        let reading = detector(ViewMode::Paged).detect(&layout, &chapter).unwrap();
        assert_eq!(reading.block_id.as_str(), "ch0-b1");
        assert_eq!(reading.local_offset, 33);
    }

    #[test]
    fn test_paged_block_starting_on_page() {
        let chapter = chapter();
        let mut layout = SimulatedLayout::new(
            &chapter,
            LayoutMetrics {
                paginated: true,
                viewport_height: 300.0,
                column_gap_px: 0.0,
                ..metrics()
            },
        );
        assert!(layout.go_to_page(2));
        let reading = detector(ViewMode::Paged).detect(&layout, &chapter).unwrap();
        assert_eq!(reading.block_id.as_str(), "ch0-b2");
        assert_eq!(reading.local_offset, 0);
    }

    #[test]
    fn test_vertical_rl_estimate() {
        let chapter = chapter();
        let mut layout = SimulatedLayout::new(
            &chapter,
            LayoutMetrics {
                writing_mode: crate::geometry::WritingMode::VerticalRl,
                viewport_width: 400.0,
                viewport_height: 232.0,
                ..metrics()
            },
        );
        layout.scroll_by(150.0);
        let reading = detector(ViewMode::Continuous).detect(&layout, &chapter).unwrap();
        assert_eq!(reading.block_id.as_str(), "ch0-b0");
        assert!(reading.precise);
        assert_eq!(reading.local_offset, 50);
    }
}
