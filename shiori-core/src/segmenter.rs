//! Chapter segmentation
//!
//! Splits one chapter's markup into addressable blocks. The markup is parsed
//! leniently into a small element tree, candidate elements are selected by
//! structural role (shallowest first, nested candidates discarded), and every
//! selected element gets `data-block-id` / `data-block-kind` attributes
//! injected into its start tag. The rest of the markup is left byte-for-byte
//! untouched.
//!
//! # Example
//!
//! ```rust
//! use shiori_core::Segmenter;
//!
//! let chapter = Segmenter::default().segment("<p>吾輩は猫である。</p><p>名前はまだ無い。</p>", 0);
//! assert_eq!(chapter.blocks.len(), 2);
//! assert_eq!(chapter.blocks[1].id.as_str(), "ch0-b1");
//! assert_eq!(chapter.index.total(), 16);
//! ```

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockId, BlockKind};
use crate::index::OffsetIndex;
use crate::text;

/// HTML elements that never have content
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Subtrees that never contribute reading characters
const SKIPPED_ELEMENTS: &[&str] = &["rt", "rp", "script", "style"];

/// Containers that become blocks when they hold text directly
const TEXT_CONTAINERS: &[&str] = &[
    "div", "section", "article", "aside", "header", "footer", "main", "nav", "span",
];

/// Segmenter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Attribute carrying the block id in processed markup
    pub id_attribute: String,
    /// Attribute carrying the block kind in processed markup
    pub kind_attribute: String,
    /// Whether figures and image parents become (usually zero-length) blocks
    pub include_image_blocks: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            id_attribute: "data-block-id".to_string(),
            kind_attribute: "data-block-kind".to_string(),
            include_image_blocks: true,
        }
    }
}

/// Output of segmenting one chapter
#[derive(Debug, Clone)]
pub struct SegmentedChapter {
    /// Chapter index the ids were minted for
    pub chapter_index: usize,
    /// Blocks in document order
    pub blocks: Vec<Block>,
    /// Offset index over `blocks`
    pub index: OffsetIndex,
    /// Markup with block attributes injected
    pub markup: String,
}

impl SegmentedChapter {
    /// Look up a block by id
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.index.ordinal(id).and_then(|i| self.blocks.get(i))
    }

    /// Clean character count of the whole chapter
    pub fn total_chars(&self) -> usize {
        self.index.total()
    }

    /// Whether segmentation had to fall back to a single wrapper block
    pub fn is_fallback(&self) -> bool {
        matches!(self.blocks.as_slice(), [only] if only.kind == BlockKind::Fallback)
    }
}

/// Splits chapter markup into blocks
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    /// Create a segmenter with the given settings
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Active settings
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Segment `markup` as chapter `chapter`.
    ///
    /// Never fails: markup that cannot be parsed past some point has its
    /// remaining text appended to the innermost open element.
    pub fn segment(&self, markup: &str, chapter: usize) -> SegmentedChapter {
        let tree = Tree::parse(markup);
        let selected = self.select(&tree);

        if selected.is_empty() {
            return self.fallback(&tree, chapter);
        }

        let mut blocks = Vec::with_capacity(selected.len());
        let mut start = 0;
        for (order, (node, kind)) in selected.iter().enumerate() {
            let clean = tree.clean_text(*node);
            let count = text::char_len(&clean);
            blocks.push(Block {
                id: BlockId::new(chapter, order),
                chapter,
                order,
                kind: *kind,
                clean_char_count: count,
                clean_char_start: start,
                text: clean,
            });
            start += count;
        }

        let markup = self.inject(&tree, &selected, &blocks);
        let index = OffsetIndex::from_blocks(&blocks);
        log::debug!(
            "segmented chapter {} into {} blocks ({} chars)",
            chapter,
            blocks.len(),
            index.total()
        );

        SegmentedChapter {
            chapter_index: chapter,
            blocks,
            index,
            markup,
        }
    }

    /// Pick block elements: shallowest first, then by role priority, then in
    /// document order; anything nested in a chosen element is dropped.
    fn select(&self, tree: &Tree<'_>) -> Vec<(usize, BlockKind)> {
        let mut candidates: Vec<(usize, u8, usize, BlockKind)> = (0..tree.nodes.len())
            .filter_map(|node| {
                self.role(tree, node)
                    .map(|(priority, kind)| (tree.nodes[node].depth, priority, node, kind))
            })
            .collect();
        candidates.sort_by_key(|&(depth, priority, node, _)| (depth, priority, node));

        let mut chosen = vec![false; tree.nodes.len()];
        let mut selected = Vec::new();
        for (_, _, node, kind) in candidates {
            if tree.ancestors(node).any(|a| chosen[a]) {
                continue;
            }
            chosen[node] = true;
            selected.push((node, kind));
        }
        // Arena order is document order.
        selected.sort_by_key(|&(node, _)| node);
        selected
    }

    fn role(&self, tree: &Tree<'_>, node: usize) -> Option<(u8, BlockKind)> {
        let name = tree.element_name(node)?;
        let role = match name {
            "p" => (0, BlockKind::Paragraph),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => (1, BlockKind::Heading),
            "blockquote" => (1, BlockKind::Quote),
            "pre" => (1, BlockKind::Preformatted),
            "li" | "dt" | "dd" => (2, BlockKind::ListItem),
            "td" | "th" => (2, BlockKind::TableCell),
            "figcaption" | "caption" => (2, BlockKind::Caption),
            _ if TEXT_CONTAINERS.contains(&name) && tree.has_direct_text(node) => {
                (3, BlockKind::Container)
            }
            _ if !self.config.include_image_blocks => return None,
            "figure" | "picture" | "svg" => (4, BlockKind::ImageContainer),
            "img" | "image" if tree.parent_is_document_level(node) => {
                (5, BlockKind::ImageContainer)
            }
            _ if !is_document_level(name) && tree.has_image_child(node) => {
                (5, BlockKind::ImageContainer)
            }
            _ => return None,
        };
        Some(role)
    }

    fn inject(&self, tree: &Tree<'_>, selected: &[(usize, BlockKind)], blocks: &[Block]) -> String {
        let source = tree.source;
        let mut out = String::with_capacity(source.len() + blocks.len() * 48);
        let mut cursor = 0;
        for ((node, _), block) in selected.iter().zip(blocks) {
            let Some(element) = tree.element(*node) else {
                continue;
            };
            let at = attribute_insertion_point(source, element.open);
            out.push_str(&source[cursor..at]);
            out.push_str(&self.attributes(block));
            cursor = at;
        }
        out.push_str(&source[cursor..]);
        out
    }

    fn attributes(&self, block: &Block) -> String {
        format!(
            " {}=\"{}\" {}=\"{}\"",
            self.config.id_attribute, block.id, self.config.kind_attribute, block.kind
        )
    }

    /// Wrap the whole body in one block when nothing qualified.
    fn fallback(&self, tree: &Tree<'_>, chapter: usize) -> SegmentedChapter {
        let source = tree.source;
        let body = tree.find_element("body");
        let (inner_start, inner_end, root) = match body.and_then(|b| tree.element(b).map(|e| (b, e))) {
            Some((node, element)) if !element.self_closing => (
                element.open.1,
                element.close_start.unwrap_or(source.len()),
                node,
            ),
            _ => (0, source.len(), 0),
        };

        let clean = tree.clean_text(root);
        let block = Block {
            id: BlockId::new(chapter, 0),
            chapter,
            order: 0,
            kind: BlockKind::Fallback,
            clean_char_count: text::char_len(&clean),
            clean_char_start: 0,
            text: clean,
        };

        let mut markup = String::with_capacity(source.len() + 64);
        markup.push_str(&source[..inner_start]);
        markup.push_str("<div");
        markup.push_str(&self.attributes(&block));
        markup.push('>');
        markup.push_str(&source[inner_start..inner_end]);
        markup.push_str("</div>");
        markup.push_str(&source[inner_end..]);

        log::info!(
            "chapter {} has no block candidates; using a single fallback block",
            chapter
        );

        let blocks = vec![block];
        let index = OffsetIndex::from_blocks(&blocks);
        SegmentedChapter {
            chapter_index: chapter,
            blocks,
            index,
            markup,
        }
    }
}

fn is_document_level(name: &str) -> bool {
    matches!(name, "body" | "html")
}

/// Byte offset just before the closing `>` (or `/>`) of a start tag
fn attribute_insertion_point(source: &str, (start, end): (usize, usize)) -> usize {
    let tag = &source[start..end];
    if tag.ends_with("/>") {
        end - 2
    } else if tag.ends_with('>') {
        end - 1
    } else {
        end
    }
}

struct Element {
    name: String,
    /// Byte span of the start tag
    open: (usize, usize),
    self_closing: bool,
    /// Byte offset of the matching end tag, if one was seen
    close_start: Option<usize>,
}

enum NodeKind {
    Document,
    Element(Element),
    /// Entity-decoded character data
    Text(String),
}

struct Node {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
}

/// Arena element tree; node indices follow document order
struct Tree<'a> {
    source: &'a str,
    nodes: Vec<Node>,
}

impl<'a> Tree<'a> {
    fn parse(source: &'a str) -> Self {
        let mut tree = Tree {
            source,
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                depth: 0,
            }],
        };
        let mut open: Vec<usize> = vec![0];

        // Byte offset of `reader`'s input within `source`.
        let mut base = 0;
        let mut reader = markup_reader(source);

        loop {
            let current = open.last().copied().unwrap_or(0);
            let before = base + byte_position(&reader);
            let event = reader.read_event();
            let after = (base + byte_position(&reader)).min(source.len());
            // The `<` opening this event; the reader may be one byte past it.
            let lt = find_lt(source, before.saturating_sub(1).max(base));
            let tag_start = lt.unwrap_or(before);

            // Set when a `<` turned out not to open markup.
            let stray = match event {
                Ok(Event::Start(e)) if is_tag_name(e.local_name().as_ref()) => {
                    let name = lowercase_name(e.local_name().as_ref());
                    let void = VOID_ELEMENTS.contains(&name.as_str());
                    let span = (tag_start, after);
                    let node = tree.push_element(current, name, span, false);
                    if !void {
                        open.push(node);
                    }
                    false
                }
                Ok(Event::Empty(e)) if is_tag_name(e.local_name().as_ref()) => {
                    let name = lowercase_name(e.local_name().as_ref());
                    let span = (tag_start, after);
                    tree.push_element(current, name, span, true);
                    false
                }
                Ok(Event::Start(_) | Event::Empty(_)) => true,
                Ok(Event::End(e)) => {
                    let name = lowercase_name(e.local_name().as_ref());
                    // Close the nearest matching element; stray end tags are ignored.
                    if let Some(pos) = open
                        .iter()
                        .rposition(|&n| n != 0 && tree.element_name(n) == Some(name.as_str()))
                    {
                        if let NodeKind::Element(element) = &mut tree.nodes[open[pos]].kind {
                            element.close_start = Some(tag_start);
                        }
                        open.truncate(pos);
                    }
                    false
                }
                Ok(Event::Text(_)) => {
                    let raw = &source[before.min(after)..after];
                    // The reader may already have consumed the next '<'.
                    let raw = raw.strip_suffix('<').unwrap_or(raw);
                    tree.push_text(current, text::decode_entities(raw).into_owned());
                    false
                }
                Ok(Event::CData(e)) => {
                    tree.push_text(current, String::from_utf8_lossy(&e).into_owned());
                    false
                }
                Ok(Event::Eof) => break,
                Ok(_) => false,
                Err(err) => {
                    log::debug!("unparseable markup at byte {}: {}", before, err);
                    true
                }
            };

            if stray {
                // Keep the `<` as text and parse again right after it.
                let Some(lt) = lt else {
                    let rest = &source[before.min(source.len())..];
                    tree.push_text(current, text::decode_entities(rest).into_owned());
                    break;
                };
                let mut literal = text::decode_entities(&source[before.min(lt)..lt]).into_owned();
                literal.push('<');
                tree.push_text(current, literal);
                base = lt + 1;
                reader = markup_reader(&source[base..]);
            }
        }
        tree
    }

    fn push_node(&mut self, parent: usize, kind: NodeKind) -> usize {
        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            depth,
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn push_element(
        &mut self,
        parent: usize,
        name: String,
        open: (usize, usize),
        self_closing: bool,
    ) -> usize {
        self.push_node(
            parent,
            NodeKind::Element(Element {
                name,
                open,
                self_closing,
                close_start: None,
            }),
        )
    }

    fn push_text(&mut self, parent: usize, content: String) {
        if !content.is_empty() {
            self.push_node(parent, NodeKind::Text(content));
        }
    }

    fn element(&self, node: usize) -> Option<&Element> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_name(&self, node: usize) -> Option<&str> {
        self.element(node).map(|e| e.name.as_str())
    }

    fn find_element(&self, name: &str) -> Option<usize> {
        (0..self.nodes.len()).find(|&n| self.element_name(n) == Some(name))
    }

    fn ancestors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.nodes[node].parent, move |&n| self.nodes[n].parent)
    }

    fn has_direct_text(&self, node: usize) -> bool {
        self.nodes[node].children.iter().any(|&child| {
            matches!(&self.nodes[child].kind, NodeKind::Text(t) if t.chars().any(|c| !c.is_whitespace()))
        })
    }

    fn has_image_child(&self, node: usize) -> bool {
        self.nodes[node]
            .children
            .iter()
            .any(|&child| matches!(self.element_name(child), Some("img" | "image")))
    }

    fn parent_is_document_level(&self, node: usize) -> bool {
        match self.nodes[node].parent {
            Some(0) | None => true,
            Some(parent) => self.element_name(parent).map_or(true, is_document_level),
        }
    }

    /// Concatenated clean text of a subtree, skipping ruby annotations and
    /// script/style content.
    fn clean_text(&self, node: usize) -> String {
        let mut raw = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match &self.nodes[current].kind {
                NodeKind::Text(content) => raw.push_str(content),
                NodeKind::Element(element) if SKIPPED_ELEMENTS.contains(&element.name.as_str()) => {}
                _ => stack.extend(self.nodes[current].children.iter().rev()),
            }
        }
        text::strip_whitespace(&raw)
    }
}

fn byte_position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn markup_reader(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    reader
}

/// Byte offset of the first `<` at or after byte `from`.
///
/// Scans bytes, so `from` need not sit on a character boundary.
fn find_lt(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let from = from.min(bytes.len());
    bytes[from..].iter().position(|&b| b == b'<').map(|i| from + i)
}

/// Whether a start tag's name can open an element (`<` then a letter)
fn is_tag_name(raw: &[u8]) -> bool {
    raw.first().is_some_and(u8::is_ascii_alphabetic)
}

fn lowercase_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}
