//! Property tests for segmentation and the offset index

use proptest::prelude::*;
use shiori_core::{text, OffsetIndex, Segmenter};

fn arb_paragraphs() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Zあ-んア-ン漢字 ]{0,40}", 1..24)
}

fn markup(paragraphs: &[String]) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>\n")).collect();
    format!("<html><body>\n{body}</body></html>")
}

fn segment(paragraphs: &[String]) -> shiori_core::SegmentedChapter {
    Segmenter::default().segment(&markup(paragraphs), 0)
}

proptest! {
    #[test]
    fn prop_blocks_partition_the_chapter(paragraphs in arb_paragraphs()) {
        let chapter = segment(&paragraphs);
        prop_assert_eq!(chapter.blocks.len(), paragraphs.len());

        let mut expected = 0;
        for (block, source) in chapter.blocks.iter().zip(&paragraphs) {
            prop_assert_eq!(block.clean_char_start, expected);
            prop_assert_eq!(block.clean_char_count, text::char_len(&text::clean(source)));
            expected = block.clean_char_end();
        }
        prop_assert_eq!(expected, chapter.index.total());
    }

    #[test]
    fn prop_every_offset_has_exactly_one_owner(paragraphs in arb_paragraphs()) {
        let chapter = segment(&paragraphs);
        for offset in 0..chapter.index.total() {
            let owners = chapter.index.entries().iter().filter(|e| e.contains(offset)).count();
            prop_assert_eq!(owners, 1);
            let found = chapter.index.at_offset(offset).unwrap();
            prop_assert!(found.contains(offset));
        }
    }

    #[test]
    fn prop_offsets_round_trip(paragraphs in arb_paragraphs()) {
        let index = &segment(&paragraphs).index;
        for offset in 0..index.total() {
            let entry = index.at_offset(offset).unwrap();
            let id = entry.block_id.as_str();
            let local = index.local_offset_of(id, offset).unwrap();
            prop_assert!(local < entry.len);
            prop_assert_eq!(index.char_offset_of(id, local), Some(offset));
        }
    }

    #[test]
    fn prop_at_offset_is_monotonic(paragraphs in arb_paragraphs(), a in 0usize..2000, b in 0usize..2000) {
        let index = &segment(&paragraphs).index;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if let (Some(x), Some(y)) = (index.at_offset(lo), index.at_offset(hi)) {
            let ox = index.ordinal(x.block_id.as_str()).unwrap();
            let oy = index.ordinal(y.block_id.as_str()).unwrap();
            prop_assert!(ox <= oy);
        }
    }

    #[test]
    fn prop_segmentation_is_deterministic(paragraphs in arb_paragraphs()) {
        let html = markup(&paragraphs);
        let a = Segmenter::default().segment(&html, 7);
        let b = Segmenter::default().segment(&html, 7);
        prop_assert_eq!(&a.markup, &b.markup);
        prop_assert_eq!(&a.blocks, &b.blocks);
    }

    #[test]
    fn prop_block_maps_rebuild_the_same_index(paragraphs in arb_paragraphs()) {
        let chapter = segment(&paragraphs);
        let stats = shiori_core::BookStats::from_chapters(std::slice::from_ref(&chapter));
        let maps = stats.block_maps.unwrap_or_default();
        let rebuilt = OffsetIndex::from_block_maps(&maps, 0).unwrap();
        prop_assert_eq!(rebuilt.entries(), chapter.index.entries());
    }
}
