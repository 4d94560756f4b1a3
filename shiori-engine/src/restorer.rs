//! Position restoration
//!
//! A saved [`Position`] is relocated inside a fresh render by trying, in
//! order:
//!
//! 1. the saved block id (`block`, or `block-offset` when the context snippet
//!    no longer matches),
//! 2. the saved chapter offset through an offset index (`block-map`),
//! 3. the context snippet and its 30- and 15-character prefixes
//!    (`text-search`),
//! 4. the chapter offset by counting block lengths (`char-offset`),
//! 5. the first block of the chapter (`fallback`),
//! 6. the chapter origin (`failed`).
//!
//! The first tier that succeeds ends the cascade. Moving the view is delegated
//! to a [`RelocationStrategy`] so continuous and paged readers share the same
//! cascade.

use std::fmt;

use serde::Serialize;
use shiori_core::builder::DEFAULT_SNIPPET_RADIUS;
use shiori_core::{text, Block, BlockId, OffsetIndex, Position, SegmentedChapter};

use crate::geometry::{Alignment, LayoutOracle};

/// Characters of the snippet that still count as a medium-confidence match
const SNIPPET_PREFIX_CHARS: usize = 10;

/// Progressively shorter snippet prefixes tried by text search
const SEARCH_PREFIXES: [usize; 2] = [30, 15];

/// Cascade tier that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreMethod {
    /// Saved block id, snippet consistent
    Block,
    /// Saved block id, snippet inconsistent
    BlockOffset,
    /// Chapter offset through an offset index
    BlockMap,
    /// Context snippet search
    TextSearch,
    /// Chapter offset by linear counting
    CharOffset,
    /// First block of the chapter
    Fallback,
    /// Nothing worked; view reset to the origin
    Failed,
}

impl RestoreMethod {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreMethod::Block => "block",
            RestoreMethod::BlockOffset => "block-offset",
            RestoreMethod::BlockMap => "block-map",
            RestoreMethod::TextSearch => "text-search",
            RestoreMethod::CharOffset => "char-offset",
            RestoreMethod::Fallback => "fallback",
            RestoreMethod::Failed => "failed",
        }
    }
}

impl fmt::Display for RestoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trust in a restoration outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Likely off by more than a paragraph
    Low,
    /// Right block, offset uncertain
    Medium,
    /// Right block and offset
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

/// Something that went wrong on the way to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Degradation {
    /// The saved block id is absent from the fresh render
    StructuralMismatch,
    /// Geometry queries returned nothing; offsets were estimated
    GeometryUnavailable,
    /// The chapter did not mount within the allowed mount probes
    ContentNotYetRendered,
    /// Every tier failed
    TotalFailure,
}

impl Degradation {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Degradation::StructuralMismatch => "structural-mismatch",
            Degradation::GeometryUnavailable => "geometry-unavailable",
            Degradation::ContentNotYetRendered => "content-not-yet-rendered",
            Degradation::TotalFailure => "total-failure",
        }
    }
}

/// Outcome of one restoration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationResult {
    /// Tier that succeeded
    pub method: RestoreMethod,
    /// Trust in the outcome
    pub confidence: Confidence,
    /// Block relocated to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
    /// Characters into that block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_offset: Option<usize>,
    /// Chapter offset of the relocated point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_offset: Option<usize>,
    /// Page shown, paged mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Degradations observed on the way
    pub degradations: Vec<Degradation>,
}

impl RestorationResult {
    /// Tiers 1-2: trustworthy enough to lock saving right away
    pub fn is_high_trust(&self) -> bool {
        matches!(
            self.method,
            RestoreMethod::Block | RestoreMethod::BlockOffset | RestoreMethod::BlockMap
        )
    }

    /// Whether any tier found a block
    pub fn succeeded(&self) -> bool {
        self.method != RestoreMethod::Failed
    }
}

/// Where a strategy should move the view
#[derive(Debug, Clone, Copy)]
pub struct Relocation<'a> {
    /// Target block
    pub block: &'a Block,
    /// Characters into the block
    pub local_offset: usize,
}

/// What a strategy did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    /// The view moved to the block
    pub applied: bool,
    /// Page shown, paged strategies only
    pub page: Option<usize>,
    /// Offset placement fell back to an estimate
    pub geometry_unavailable: bool,
}

/// Mode-specific "move the view there" step
pub trait RelocationStrategy {
    /// Move the view to `target`
    fn apply<O>(&mut self, oracle: &mut O, target: &Relocation<'_>) -> ApplyOutcome
    where
        O: LayoutOracle + ?Sized;

    /// Return the view to the chapter origin
    fn reset<O>(&mut self, oracle: &mut O)
    where
        O: LayoutOracle + ?Sized;
}

/// Continuous-scroll relocation: scroll the block to the reading edge, then
/// advance proportionally and correct once by hit-testing.
#[derive(Debug, Clone, Copy)]
pub struct ScrollRelocation {
    precise_threshold: usize,
}

impl ScrollRelocation {
    /// Offsets at or below `precise_threshold` characters stay at the block start
    pub fn new(precise_threshold: usize) -> Self {
        Self { precise_threshold }
    }
}

impl RelocationStrategy for ScrollRelocation {
    fn apply<O>(&mut self, oracle: &mut O, target: &Relocation<'_>) -> ApplyOutcome
    where
        O: LayoutOracle + ?Sized,
    {
        let id = target.block.id.as_str();
        if !oracle.scroll_into_view(id, Alignment::Start) {
            return ApplyOutcome::default();
        }
        let len = target.block.clean_char_count;
        if target.local_offset <= self.precise_threshold || len == 0 {
            return ApplyOutcome {
                applied: true,
                ..ApplyOutcome::default()
            };
        }

        let mode = oracle.writing_mode();
        let Some(rect) = oracle.bounding_box(id).filter(|r| mode.flow_extent(*r) > 0.0) else {
            log::debug!("no geometry for {}; staying at block start", id);
            return ApplyOutcome {
                applied: true,
                page: None,
                geometry_unavailable: true,
            };
        };
        let px_per_char = mode.flow_extent(rect) / len as f64;
        oracle.scroll_by(px_per_char * target.local_offset as f64);

        // One correction pass against the actual text flow.
        let landed = oracle.hit_test(mode.edge_point(oracle.viewport()));
        match landed {
            Some(hit) if hit.block_id == target.block.id => {
                let diff = target.local_offset as f64 - hit.local_offset as f64;
                if diff.abs() > self.precise_threshold as f64 {
                    oracle.scroll_by(diff * px_per_char);
                }
                ApplyOutcome {
                    applied: true,
                    ..ApplyOutcome::default()
                }
            }
            _ => ApplyOutcome {
                applied: true,
                page: None,
                geometry_unavailable: true,
            },
        }
    }

    fn reset<O>(&mut self, oracle: &mut O)
    where
        O: LayoutOracle + ?Sized,
    {
        oracle.reset_scroll();
    }
}

/// Runs the restoration cascade with a relocation strategy
#[derive(Debug, Clone)]
pub struct Restorer<R> {
    strategy: R,
    snippet_radius: usize,
}

impl<R: RelocationStrategy> Restorer<R> {
    /// Create a restorer
    pub fn new(strategy: R) -> Self {
        Self {
            strategy,
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
        }
    }

    /// Radius the saved context snippets were cut with
    pub fn with_snippet_radius(mut self, radius: usize) -> Self {
        self.snippet_radius = radius;
        self
    }

    /// Relocation strategy
    pub fn strategy(&self) -> &R {
        &self.strategy
    }

    /// Relocation strategy, mutably
    pub fn strategy_mut(&mut self) -> &mut R {
        &mut self.strategy
    }

    /// Relocate `position` inside `chapter` as rendered by `oracle`.
    ///
    /// `index` enables the offset-index tier; pass the current chapter's
    /// index (or one rebuilt from book statistics) or `None` to skip it.
    pub fn restore<O>(
        &mut self,
        position: &Position,
        chapter: &SegmentedChapter,
        index: Option<&OffsetIndex>,
        oracle: &mut O,
    ) -> RestorationResult
    where
        O: LayoutOracle + ?Sized,
    {
        let mut degradations = Vec::new();

        if position.chapter_index == chapter.chapter_index {
            if let Some(result) = self.try_block_id(position, chapter, oracle, &mut degradations) {
                return self.finish(result, chapter);
            }
            if let Some(result) = self.try_offset_index(position, chapter, index, oracle, &mut degradations) {
                return self.finish(result, chapter);
            }
            if let Some(result) = self.try_text_search(position, chapter, oracle, &mut degradations) {
                return self.finish(result, chapter);
            }
            if let Some(result) = self.try_char_count(position, chapter, oracle, &mut degradations) {
                return self.finish(result, chapter);
            }
        } else {
            log::debug!(
                "saved position is in chapter {}, view shows chapter {}",
                position.chapter_index,
                chapter.chapter_index
            );
            degradations.push(Degradation::StructuralMismatch);
        }

        if position.has_locator() {
            let first = chapter.blocks.iter().find(|b| oracle.has_block(b.id.as_str()));
            if let Some(block) = first {
                if let Some(result) = self.relocate(
                    oracle,
                    block,
                    0,
                    RestoreMethod::Fallback,
                    Confidence::Low,
                    &mut degradations,
                ) {
                    return self.finish(result, chapter);
                }
            }
        }

        self.strategy.reset(oracle);
        degradations.push(Degradation::TotalFailure);
        log::warn!(
            "could not restore position in chapter {}; reset to chapter origin",
            chapter.chapter_index
        );
        RestorationResult {
            method: RestoreMethod::Failed,
            confidence: Confidence::Low,
            block_id: None,
            local_offset: None,
            chapter_offset: None,
            page: None,
            degradations,
        }
    }

    fn try_block_id<O>(
        &mut self,
        position: &Position,
        chapter: &SegmentedChapter,
        oracle: &mut O,
        degradations: &mut Vec<Degradation>,
    ) -> Option<RestorationResult>
    where
        O: LayoutOracle + ?Sized,
    {
        let id = position.block_id.as_ref()?;
        let block = match chapter.block(id.as_str()) {
            Some(block) if oracle.has_block(id.as_str()) => block,
            _ => {
                log::debug!("saved block {} not in the fresh render", id);
                degradations.push(Degradation::StructuralMismatch);
                return None;
            }
        };

        let local = position
            .block_local_offset
            .unwrap_or(0)
            .min(block.clean_char_count);
        let (method, confidence) = match position.context_snippet.as_deref() {
            None | Some("") => (RestoreMethod::Block, Confidence::High),
            Some(snippet) if block.text.contains(snippet) => (RestoreMethod::Block, Confidence::High),
            Some(snippet)
                if block
                    .text
                    .contains(text::prefix_chars(snippet, SNIPPET_PREFIX_CHARS)) =>
            {
                (RestoreMethod::Block, Confidence::Medium)
            }
            Some(_) => (RestoreMethod::BlockOffset, Confidence::Low),
        };

        self.relocate(oracle, block, local, method, confidence, degradations)
    }

    fn try_offset_index<O>(
        &mut self,
        position: &Position,
        chapter: &SegmentedChapter,
        index: Option<&OffsetIndex>,
        oracle: &mut O,
        degradations: &mut Vec<Degradation>,
    ) -> Option<RestorationResult>
    where
        O: LayoutOracle + ?Sized,
    {
        let offset = position.chapter_char_offset?;
        let entry = index?.at_offset(offset)?;
        let block = match chapter.block(entry.block_id.as_str()) {
            Some(block) if oracle.has_block(block.id.as_str()) => block,
            _ => {
                log::debug!("offset {} maps to {} which is not rendered", offset, entry.block_id);
                return None;
            }
        };
        let local = offset.saturating_sub(entry.start).min(block.clean_char_count);
        self.relocate(oracle, block, local, RestoreMethod::BlockMap, Confidence::High, degradations)
    }

    fn try_text_search<O>(
        &mut self,
        position: &Position,
        chapter: &SegmentedChapter,
        oracle: &mut O,
        degradations: &mut Vec<Degradation>,
    ) -> Option<RestorationResult>
    where
        O: LayoutOracle + ?Sized,
    {
        let snippet = position.context_snippet.as_deref().filter(|s| !s.is_empty())?;
        let snippet_len = text::char_len(snippet);
        // Snippets are clipped at the block start, so the saved edge sits
        // `min(local, radius)` characters in.
        let edge = position
            .block_local_offset
            .map_or(snippet_len / 2, |local| local.min(self.snippet_radius))
            .min(snippet_len);

        let mut needles = vec![(snippet, Confidence::Medium)];
        for prefix_len in SEARCH_PREFIXES {
            if prefix_len < snippet_len {
                needles.push((text::prefix_chars(snippet, prefix_len), Confidence::Low));
            }
        }

        for (needle, confidence) in needles {
            let found = chapter
                .blocks
                .iter()
                .filter(|b| oracle.has_block(b.id.as_str()))
                .find_map(|b| text::find_chars(&b.text, needle).map(|at| (b, at)));
            if let Some((block, at)) = found {
                let local = (at + edge).min(block.clean_char_count);
                return self.relocate(oracle, block, local, RestoreMethod::TextSearch, confidence, degradations);
            }
        }
        None
    }

    fn try_char_count<O>(
        &mut self,
        position: &Position,
        chapter: &SegmentedChapter,
        oracle: &mut O,
        degradations: &mut Vec<Degradation>,
    ) -> Option<RestorationResult>
    where
        O: LayoutOracle + ?Sized,
    {
        let offset = position.chapter_char_offset?;
        let rendered: Vec<&Block> = chapter
            .blocks
            .iter()
            .filter(|b| oracle.has_block(b.id.as_str()))
            .collect();

        let mut covered = 0;
        let mut target = None;
        for block in &rendered {
            if block.clean_char_count > 0 && offset < covered + block.clean_char_count {
                target = Some((*block, offset - covered));
                break;
            }
            covered += block.clean_char_count;
        }
        // Past the end: last character of the last block.
        let (block, local) = target.or_else(|| rendered.last().map(|b| (*b, b.clean_char_count)))?;
        self.relocate(oracle, block, local, RestoreMethod::CharOffset, Confidence::Low, degradations)
    }

    fn relocate<O>(
        &mut self,
        oracle: &mut O,
        block: &Block,
        local: usize,
        method: RestoreMethod,
        confidence: Confidence,
        degradations: &mut Vec<Degradation>,
    ) -> Option<RestorationResult>
    where
        O: LayoutOracle + ?Sized,
    {
        let outcome = self.strategy.apply(
            oracle,
            &Relocation {
                block,
                local_offset: local,
            },
        );
        if !outcome.applied {
            log::debug!("{} could not move the view to {}", method, block.id);
            degradations.push(Degradation::GeometryUnavailable);
            return None;
        }
        if outcome.geometry_unavailable {
            degradations.push(Degradation::GeometryUnavailable);
        }
        Some(RestorationResult {
            method,
            confidence,
            block_id: Some(block.id.clone()),
            local_offset: Some(local),
            chapter_offset: None,
            page: outcome.page,
            degradations: std::mem::take(degradations),
        })
    }

    fn finish(&self, mut result: RestorationResult, chapter: &SegmentedChapter) -> RestorationResult {
        result.chapter_offset = result
            .block_id
            .as_ref()
            .zip(result.local_offset)
            .and_then(|(id, local)| chapter.index.char_offset_of(id.as_str(), local));
        log::info!(
            "restored to {} +{} via {} ({} confidence)",
            result.block_id.as_ref().map_or("-", |id| id.as_str()),
            result.local_offset.unwrap_or(0),
            result.method,
            result.confidence
        );
        result
    }
}
