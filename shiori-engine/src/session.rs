//! One open chapter of one book
//!
//! [`ReadingSession`] owns the moving parts of a reader view and the two
//! advisory flags between them: the detector's restore-pending flag and the
//! scheduler's save lock. Hosts forward scroll, visibility and page events and
//! call [`tick`](ReadingSession::tick) from their event loop.

use shiori_core::{BookStats, Position, PositionBuilder, SegmentedChapter};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::detector::{EdgeReading, PositionDetector, ViewMode};
use crate::error::Result;
use crate::geometry::{LayoutOracle, VisibilityReport};
use crate::reconciler::{LayoutSettings, PageRelocation, PaginationReconciler};
use crate::restorer::{
    ApplyOutcome, Degradation, Relocation, RelocationStrategy, RestorationResult, Restorer,
    ScrollRelocation,
};
use crate::retry::BoundedPoll;
use crate::scheduler::{FlushReason, SaveScheduler};
use crate::store::PositionStore;

/// Relocation matching the view mode
#[derive(Debug, Clone, Copy)]
enum ModeRelocation {
    Scroll(ScrollRelocation),
    Page(PageRelocation),
}

impl RelocationStrategy for ModeRelocation {
    fn apply<O>(&mut self, oracle: &mut O, target: &Relocation<'_>) -> ApplyOutcome
    where
        O: LayoutOracle + ?Sized,
    {
        match self {
            ModeRelocation::Scroll(strategy) => strategy.apply(oracle, target),
            ModeRelocation::Page(strategy) => strategy.apply(oracle, target),
        }
    }

    fn reset<O>(&mut self, oracle: &mut O)
    where
        O: LayoutOracle + ?Sized,
    {
        match self {
            ModeRelocation::Scroll(strategy) => strategy.reset(oracle),
            ModeRelocation::Page(strategy) => strategy.reset(oracle),
        }
    }
}

/// Reader view of one chapter
pub struct ReadingSession<O, S: PositionStore> {
    book_id: String,
    config: EngineConfig,
    chapter: SegmentedChapter,
    stats: Option<BookStats>,
    oracle: O,
    detector: PositionDetector,
    scheduler: SaveScheduler<S>,
    restorer: Restorer<ModeRelocation>,
    reconciler: PaginationReconciler,
    settings: LayoutSettings,
    last_restore: Option<RestorationResult>,
}

impl<O: LayoutOracle, S: PositionStore> ReadingSession<O, S> {
    /// Session for `chapter` of `book_id`, rendered by `oracle`
    pub fn new(
        book_id: impl Into<String>,
        chapter: SegmentedChapter,
        oracle: O,
        store: S,
        mode: ViewMode,
        config: EngineConfig,
    ) -> Self {
        let book_id = book_id.into();
        let strategy = match mode {
            ViewMode::Continuous => {
                ModeRelocation::Scroll(ScrollRelocation::new(config.precise_offset_threshold))
            }
            ViewMode::Paged => ModeRelocation::Page(PageRelocation::new()),
        };
        Self {
            detector: PositionDetector::new(mode, &config),
            scheduler: SaveScheduler::new(store, book_id.clone(), &config),
            restorer: Restorer::new(strategy).with_snippet_radius(config.snippet_radius),
            reconciler: PaginationReconciler::new(),
            settings: LayoutSettings {
                paginated: mode == ViewMode::Paged,
                ..LayoutSettings::default()
            },
            book_id,
            config,
            chapter,
            stats: None,
            oracle,
            last_restore: None,
        }
    }

    /// Use book statistics for book-wide progress
    pub fn with_stats(mut self, stats: BookStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Layout settings in effect when the session opens
    pub fn with_layout_settings(mut self, settings: LayoutSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Load the saved position and restore it into the view.
    ///
    /// Returns `None` when nothing was saved for this book. Waits (through
    /// `clock`) for the chapter to mount and the layout to settle; a mount
    /// timeout is recorded as [`Degradation::ContentNotYetRendered`] and the
    /// restore is still attempted.
    pub fn open<C>(&mut self, clock: &C) -> Option<RestorationResult>
    where
        C: Clock + ?Sized,
    {
        let saved = self.scheduler.store().load(&self.book_id)?;
        self.detector.set_restore_pending(true);

        let mut early = Vec::new();
        let oracle = &self.oracle;
        if self
            .config
            .mount_poll()
            .run(clock, || oracle.is_mounted().then_some(()))
            .ready()
            .is_none()
        {
            log::info!("chapter {} did not mount in time", self.chapter.chapter_index);
            early.push(Degradation::ContentNotYetRendered);
        }
        let settle = BoundedPoll::new(
            self.config.mount_poll_max_attempts,
            self.config.layout_settle_ms,
        );
        if settle.run(clock, || oracle.layout_settled().then_some(())).ready().is_none() {
            log::debug!("layout still moving; restoring anyway");
        }

        let mut result = self.restore(&saved);
        early.append(&mut result.degradations);
        result.degradations = early;

        if self.detector.mode() == ViewMode::Paged {
            self.reconciler.measure(&self.oracle);
            if let Some(key) = self.reconciler.restore_key(self.chapter.chapter_index, &self.settings) {
                self.reconciler.should_restore(&key);
            }
        }

        let now = clock.now_ms();
        if result.is_high_trust() {
            self.scheduler.lock(self.config.restore_lock_ms, now);
        }
        self.scheduler.seed(&saved);
        self.detector.reset();
        self.detector.set_restore_pending(false);

        self.last_restore = Some(result.clone());
        Some(result)
    }

    fn restore(&mut self, position: &Position) -> RestorationResult {
        self.restorer.restore(
            position,
            &self.chapter,
            Some(&self.chapter.index),
            &mut self.oracle,
        )
    }

    /// The view scrolled
    pub fn on_scroll(&mut self, now: u64) {
        self.detector.on_scroll(now);
    }

    /// The visible page changed
    pub fn on_page_change(&mut self, now: u64) {
        self.detector.on_page_change(now);
    }

    /// Visibility reports pushed by the host
    pub fn on_visibility<I>(&mut self, reports: I)
    where
        I: IntoIterator<Item = VisibilityReport>,
    {
        self.detector.on_visibility(reports);
    }

    /// Advance timers: re-detect the reading edge, schedule and write saves.
    ///
    /// Returns the position written by this tick, if any.
    pub fn tick(&mut self, now: u64) -> Result<Option<Position>> {
        if let Some(reading) = self.detector.poll(now, &self.oracle, &self.chapter) {
            if let Some(position) = self.position_for(&reading) {
                self.scheduler.schedule(position, now);
            }
        }
        self.scheduler.poll(now)
    }

    /// The page became hidden; write the current position now
    pub fn on_page_hidden(&mut self, now: u64) -> Result<Option<Position>> {
        self.flush(FlushReason::PageHidden, now)
    }

    /// The view is going away; write the current position now
    pub fn teardown(&mut self, now: u64) -> Result<Option<Position>> {
        self.flush(FlushReason::Teardown, now)
    }

    /// Writing mode or pagination is about to change.
    ///
    /// Flushes first and returns the position the next reader should restore.
    pub fn switch_layout(&mut self, now: u64) -> Result<Option<Position>> {
        self.flush(FlushReason::LayoutSwitch, now)?;
        Ok(self.scheduler.last_saved().cloned())
    }

    /// The layout reflowed under new settings.
    ///
    /// Paged views re-restore the current position once per distinct layout
    /// state; continuous views and repeated states return `None`.
    pub fn on_layout_change<C>(&mut self, settings: LayoutSettings, clock: &C) -> Option<RestorationResult>
    where
        C: Clock + ?Sized,
    {
        self.settings = settings;
        if self.detector.mode() != ViewMode::Paged {
            return None;
        }
        self.reconciler.measure(&self.oracle)?;
        let key = self
            .reconciler
            .restore_key(self.chapter.chapter_index, &self.settings)?;
        if !self.reconciler.should_restore(&key) {
            return None;
        }

        let position = self.current_position()?;
        log::debug!("re-restoring after relayout to {} pages", key.total_pages);
        self.detector.set_restore_pending(true);
        let result = self.restore(&position);
        if result.is_high_trust() {
            self.scheduler.lock(self.config.restore_lock_ms, clock.now_ms());
        }
        self.detector.reset();
        self.detector.set_restore_pending(false);
        self.last_restore = Some(result.clone());
        Some(result)
    }

    /// Freshest known position: pending, else last written
    pub fn current_position(&self) -> Option<Position> {
        self.scheduler
            .pending()
            .or_else(|| self.scheduler.last_saved())
            .cloned()
    }

    fn flush(&mut self, reason: FlushReason, now: u64) -> Result<Option<Position>> {
        // The detector only emits on block changes; capture the offset too.
        if let Some(reading) = self.detector.latest().cloned() {
            if let Some(position) = self.position_for(&reading) {
                self.scheduler.schedule(position, now);
            }
        }
        self.scheduler.save_now(reason, now)
    }

    fn position_for(&self, reading: &EdgeReading) -> Option<Position> {
        let mut builder = PositionBuilder::new().snippet_radius(self.config.snippet_radius);
        if let Some(stats) = &self.stats {
            builder = builder.with_stats(stats);
        }
        match builder.build(&self.chapter, reading.block_id.as_str(), reading.local_offset) {
            Ok(mut position) => {
                if self.detector.mode() == ViewMode::Paged {
                    position.page_number = Some(self.oracle.current_page());
                }
                Some(position)
            }
            Err(err) => {
                log::warn!("cannot build position at {}: {}", reading.block_id, err);
                None
            }
        }
    }

    /// Book being read
    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    /// Chapter shown
    pub fn chapter(&self) -> &SegmentedChapter {
        &self.chapter
    }

    /// Rendering surface
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Rendering surface, mutably (for host-driven scrolling and relayout)
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Reading-edge detector
    pub fn detector(&self) -> &PositionDetector {
        &self.detector
    }

    /// Save scheduler
    pub fn scheduler(&self) -> &SaveScheduler<S> {
        &self.scheduler
    }

    /// Outcome of the latest restore
    pub fn last_restore(&self) -> Option<&RestorationResult> {
        self.last_restore.as_ref()
    }

    /// Layout settings in effect
    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    /// Engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Give back the store
    pub fn into_store(self) -> S {
        self.scheduler.into_store()
    }
}
