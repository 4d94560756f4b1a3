//! Pagination reconciliation
//!
//! Paged readers re-measure after every layout change (font, margins, writing
//! mode). The reconciler caches the measured page geometry and hands out a
//! [`RestoreKey`] per distinct layout state so a position is re-restored once
//! per state and not on every resize event.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::geometry::{Alignment, LayoutOracle, WritingMode};
use crate::restorer::{ApplyOutcome, Relocation, RelocationStrategy};
use crate::simulated::LayoutMetrics;

/// Reader settings that change pagination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Font size in px
    pub font_size_px: u32,
    /// Line height in percent of the font size
    pub line_height_percent: u32,
    /// Page margin in px
    pub margin_px: u32,
    /// Text direction
    pub writing_mode: WritingMode,
    /// Paginated or continuous
    pub paginated: bool,
    /// Font family name
    pub font_family: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            font_size_px: 18,
            line_height_percent: 160,
            margin_px: 16,
            writing_mode: WritingMode::HorizontalTb,
            paginated: false,
            font_family: "serif".to_string(),
        }
    }
}

impl LayoutSettings {
    /// Settings matching simulated metrics
    pub fn from_metrics(metrics: &LayoutMetrics) -> Self {
        Self {
            font_size_px: metrics.font_size_px.round().max(0.0) as u32,
            line_height_percent: (metrics.line_height * 100.0).round().max(0.0) as u32,
            margin_px: metrics.margin_px.round().max(0.0) as u32,
            writing_mode: metrics.writing_mode,
            paginated: metrics.paginated,
            ..Self::default()
        }
    }

    /// Stable within one process; not meant to be persisted
    pub fn settings_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Measured page geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Column width plus gap
    pub page_size: f64,
    /// Pages in the chapter, at least 1
    pub total_pages: usize,
}

impl PageGeometry {
    /// Measure a paginated layout; `None` when the layout is not paginated
    pub fn measure<O>(oracle: &O) -> Option<Self>
    where
        O: LayoutOracle + ?Sized,
    {
        let page_size = oracle.page_metrics()?.page_size();
        if page_size <= 0.0 {
            return None;
        }
        let total_pages = ((oracle.scroll_extent() / page_size).ceil() as usize).max(1);
        Some(Self {
            page_size,
            total_pages,
        })
    }

    /// Page containing a flow offset, clamped to the chapter
    pub fn page_for_offset(&self, offset_px: f64) -> usize {
        let page = (offset_px.max(0.0) / self.page_size).floor() as usize;
        page.min(self.total_pages - 1)
    }
}

/// Identity of one layout state of one chapter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestoreKey {
    /// Chapter shown
    pub chapter_index: usize,
    /// [`LayoutSettings::settings_hash`]
    pub settings_hash: u64,
    /// Page size rounded to whole pixels
    pub page_size_px: u64,
    /// Total pages
    pub total_pages: usize,
}

/// Tracks page geometry and which layout states were already restored
#[derive(Debug, Clone, Default)]
pub struct PaginationReconciler {
    geometry: Option<PageGeometry>,
    restored: Option<RestoreKey>,
}

impl PaginationReconciler {
    /// Create a reconciler with nothing measured
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-measure the layout and cache the result
    pub fn measure<O>(&mut self, oracle: &O) -> Option<PageGeometry>
    where
        O: LayoutOracle + ?Sized,
    {
        self.geometry = PageGeometry::measure(oracle);
        self.geometry
    }

    /// Last measured geometry
    pub fn geometry(&self) -> Option<PageGeometry> {
        self.geometry
    }

    /// Page holding the start of block `id`
    pub fn page_for_block<O>(&self, oracle: &O, id: &str) -> Option<usize>
    where
        O: LayoutOracle + ?Sized,
    {
        let geometry = self.geometry?;
        oracle
            .offset_from_origin(id)
            .map(|offset| geometry.page_for_offset(offset))
    }

    /// Key of the current layout state; `None` until measured
    pub fn restore_key(&self, chapter_index: usize, settings: &LayoutSettings) -> Option<RestoreKey> {
        let geometry = self.geometry?;
        Some(RestoreKey {
            chapter_index,
            settings_hash: settings.settings_hash(),
            page_size_px: geometry.page_size.round().max(0.0) as u64,
            total_pages: geometry.total_pages,
        })
    }

    /// True the first time a key is seen; records it
    pub fn should_restore(&mut self, key: &RestoreKey) -> bool {
        if self.restored.as_ref() == Some(key) {
            log::trace!("layout state already restored: {:?}", key);
            return false;
        }
        self.restored = Some(key.clone());
        true
    }

    /// Forget the geometry and the restored key
    pub fn invalidate(&mut self) {
        self.geometry = None;
        self.restored = None;
    }
}

/// Paged relocation: show the page holding the target character
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRelocation;

impl PageRelocation {
    /// Create the strategy
    pub fn new() -> Self {
        Self
    }
}

impl RelocationStrategy for PageRelocation {
    fn apply<O>(&mut self, oracle: &mut O, target: &Relocation<'_>) -> ApplyOutcome
    where
        O: LayoutOracle + ?Sized,
    {
        let id = target.block.id.as_str();
        let Some(geometry) = PageGeometry::measure(oracle) else {
            // Not paginated after all; fall back to the block start.
            return ApplyOutcome {
                applied: oracle.scroll_into_view(id, Alignment::Start),
                page: None,
                geometry_unavailable: true,
            };
        };
        let Some(start) = oracle.offset_from_origin(id) else {
            return ApplyOutcome::default();
        };

        let len = target.block.clean_char_count;
        let extent = oracle
            .bounding_box(id)
            .map(|rect| oracle.writing_mode().flow_extent(rect));
        let (offset, estimated) = match extent {
            Some(extent) if len > 0 => {
                let fraction = target.local_offset.min(len) as f64 / len as f64;
                (start + fraction * extent, false)
            }
            Some(_) => (start, false),
            None => (start, true),
        };

        let page = geometry.page_for_offset(offset);
        if !oracle.go_to_page(page) {
            return ApplyOutcome::default();
        }
        ApplyOutcome {
            applied: true,
            page: Some(page),
            geometry_unavailable: estimated,
        }
    }

    fn reset<O>(&mut self, oracle: &mut O)
    where
        O: LayoutOracle + ?Sized,
    {
        if !oracle.go_to_page(0) {
            oracle.reset_scroll();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restorer::{RestoreMethod, Restorer};
    use crate::simulated::SimulatedLayout;
    use shiori_core::{PositionBuilder, SegmentedChapter, Segmenter};

    fn chapter() -> SegmentedChapter {
        let markup = format!(
            "<body><p>{}</p><div><img src=\"x.png\"/></div><p>{}</p></body>",
            "a".repeat(40),
            "b".repeat(100)
        );
        Segmenter::default().segment(&markup, 0)
    }

    // 10 chars per line, 30px lines, 220px pages; blocks at 0, 130 and 240..540.
    fn paged() -> LayoutMetrics {
        LayoutMetrics {
            viewport_width: 232.0,
            viewport_height: 200.0,
            font_size_px: 20.0,
            line_height: 1.5,
            margin_px: 16.0,
            block_gap_px: 10.0,
            image_extent_px: 100.0,
            paginated: true,
            column_gap_px: 20.0,
            ..LayoutMetrics::default()
        }
    }

    #[test]
    fn test_measure_and_page_lookup() {
        let layout = SimulatedLayout::new(&chapter(), paged());
        let mut reconciler = PaginationReconciler::new();
        let geometry = reconciler.measure(&layout).unwrap();
        assert_eq!(geometry.page_size, 220.0);
        assert_eq!(geometry.total_pages, 3);
        assert_eq!(reconciler.page_for_block(&layout, "ch0-b0"), Some(0));
        assert_eq!(reconciler.page_for_block(&layout, "ch0-b2"), Some(1));
        assert_eq!(geometry.page_for_offset(10_000.0), 2);
        assert_eq!(geometry.page_for_offset(-5.0), 0);
    }

    #[test]
    fn test_continuous_layout_has_no_geometry() {
        let layout = SimulatedLayout::new(
            &chapter(),
            LayoutMetrics {
                paginated: false,
                ..paged()
            },
        );
        assert!(PaginationReconciler::new().measure(&layout).is_none());
    }

    #[test]
    fn test_one_restore_per_layout_state() {
        let layout = SimulatedLayout::new(&chapter(), paged());
        let mut reconciler = PaginationReconciler::new();
        assert!(reconciler.restore_key(0, &LayoutSettings::default()).is_none());
        reconciler.measure(&layout);

        let settings = LayoutSettings::from_metrics(&paged());
        let key = reconciler.restore_key(0, &settings).unwrap();
        assert!(reconciler.should_restore(&key));
        assert!(!reconciler.should_restore(&key));

        let bigger = LayoutSettings {
            font_size_px: 24,
            ..settings
        };
        let changed = reconciler.restore_key(0, &bigger).unwrap();
        assert_ne!(key, changed);
        assert!(reconciler.should_restore(&changed));

        reconciler.invalidate();
        assert!(reconciler.geometry().is_none());
    }

    #[test]
    fn test_settings_hash_tracks_every_field() {
        let base = LayoutSettings::default();
        let vertical = LayoutSettings {
            writing_mode: WritingMode::VerticalRl,
            ..base.clone()
        };
        assert_eq!(base.settings_hash(), LayoutSettings::default().settings_hash());
        assert_ne!(base.settings_hash(), vertical.settings_hash());
    }

    #[test]
    fn test_page_relocation_targets_character_page() {
        let chapter = chapter();
        let mut layout = SimulatedLayout::new(&chapter, paged());
        let mut restorer = Restorer::new(PageRelocation::new());

        let early = PositionBuilder::new().build(&chapter, "ch0-b2", 50).unwrap();
        let result = restorer.restore(&early, &chapter, Some(&chapter.index), &mut layout);
        assert_eq!(result.method, RestoreMethod::Block);
        assert_eq!(result.page, Some(1));
        assert_eq!(layout.current_page(), 1);

        let late = PositionBuilder::new().build(&chapter, "ch0-b2", 90).unwrap();
        let result = restorer.restore(&late, &chapter, Some(&chapter.index), &mut layout);
        assert_eq!(result.page, Some(2));
        assert_eq!(layout.current_page(), 2);
    }

    #[test]
    fn test_page_reset_goes_to_first_page() {
        let chapter = chapter();
        let mut layout = SimulatedLayout::new(&chapter, paged());
        assert!(layout.go_to_page(2));
        PageRelocation::new().reset(&mut layout);
        assert_eq!(layout.current_page(), 0);
    }
}
