use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::editing::host::{DocPos, DocumentHost, HostError, Visit};
use crate::editing::offset_index::OffsetIndex;

/// Inline formatting carried by a text run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub code: bool,
}

/// A leaf run of text with uniform formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks {
                bold: true,
                ..Marks::default()
            },
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks {
                italic: true,
                ..Marks::default()
            },
        }
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks {
                code: true,
                ..Marks::default()
            },
        }
    }

    /// Length in characters, the unit positions and flat offsets count in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A block-level node of the rich-text tree.
///
/// Text blocks (`Heading`, `Paragraph`, `CodeBlock`) hold inline runs;
/// containers hold further blocks. `ThematicBreak` is an atom of size one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<TextRun>,
    },
    Paragraph {
        content: Vec<TextRun>,
    },
    CodeBlock {
        lang: Option<String>,
        content: Vec<TextRun>,
    },
    BulletList {
        items: Vec<Block>,
    },
    OrderedList {
        start: u64,
        items: Vec<Block>,
    },
    ListItem {
        children: Vec<Block>,
    },
    BlockQuote {
        children: Vec<Block>,
    },
    ThematicBreak,
}

impl Block {
    pub fn paragraph(text: &str) -> Self {
        Block::Paragraph {
            content: runs_from(text),
        }
    }

    pub fn paragraph_runs(content: Vec<TextRun>) -> Self {
        Block::Paragraph {
            content: normalize_runs(content),
        }
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Block::Heading {
            level,
            content: runs_from(text),
        }
    }

    /// A list item wrapping a single paragraph.
    pub fn item(text: &str) -> Self {
        Block::ListItem {
            children: vec![Block::paragraph(text)],
        }
    }

    pub fn bullet_list(items: Vec<Block>) -> Self {
        Block::BulletList { items }
    }

    pub fn is_textblock(&self) -> bool {
        self.runs().is_some()
    }

    pub fn runs(&self) -> Option<&[TextRun]> {
        match self {
            Block::Heading { content, .. }
            | Block::Paragraph { content }
            | Block::CodeBlock { content, .. } => Some(content),
            _ => None,
        }
    }

    pub(crate) fn runs_mut(&mut self) -> Option<&mut Vec<TextRun>> {
        match self {
            Block::Heading { content, .. }
            | Block::Paragraph { content }
            | Block::CodeBlock { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&[Block]> {
        match self {
            Block::BulletList { items } | Block::OrderedList { items, .. } => Some(items),
            Block::ListItem { children } | Block::BlockQuote { children } => Some(children),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Block::BulletList { items } | Block::OrderedList { items, .. } => Some(items),
            Block::ListItem { children } | Block::BlockQuote { children } => Some(children),
            _ => None,
        }
    }

    /// Concatenated text of a text block; empty for containers.
    pub fn text(&self) -> String {
        self.runs()
            .map(|runs| runs.iter().map(|r| r.text.as_str()).collect())
            .unwrap_or_default()
    }

    /// Number of positions this node occupies.
    pub fn size(&self) -> usize {
        if let Some(runs) = self.runs() {
            2 + runs.iter().map(TextRun::char_len).sum::<usize>()
        } else if let Some(children) = self.children() {
            2 + children.iter().map(Block::size).sum::<usize>()
        } else {
            1
        }
    }
}

/// In-memory rich-text document: the canonical store the review core edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichDocument {
    blocks: Vec<Block>,
    #[serde(skip)]
    version: u64,
}

impl RichDocument {
    /// Create a document; an empty block list becomes one empty paragraph.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks: non_empty(blocks),
            version: 0,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Replace the whole content, counting as one edit.
    pub fn replace_blocks(&mut self, blocks: Vec<Block>) {
        self.blocks = non_empty(blocks);
        self.version += 1;
    }

    /// Total number of positions in the document.
    pub fn size(&self) -> usize {
        self.blocks.iter().map(Block::size).sum()
    }

    /// The flat text: text blocks joined by single newlines.
    pub fn text(&self) -> String {
        OffsetIndex::build(self).flat_text().to_string()
    }

    /// Find the text block whose content holds `target`, returning its path
    /// and the character offset inside it.
    fn resolve(&self, target: DocPos) -> Option<(Vec<usize>, usize)> {
        let mut path = Vec::new();
        resolve_in(&self.blocks, DocPos(0), target, &mut path).map(|offset| (path, offset))
    }
}

impl Default for RichDocument {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

// Version is edit history, not content.
impl PartialEq for RichDocument {
    fn eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks
    }
}

impl DocumentHost for RichDocument {
    fn version(&self) -> u64 {
        self.version
    }

    fn visit(&self, visitor: &mut dyn FnMut(Visit<'_>)) {
        walk(&self.blocks, DocPos(0), visitor);
    }

    fn replace_range(&mut self, range: Range<DocPos>, text: &str) -> Result<(), HostError> {
        if range.start > range.end {
            return Err(HostError::ReversedRange {
                start: range.start,
                end: range.end,
            });
        }
        let size = self.size();
        if range.end.0 > size {
            return Err(HostError::OutOfRange {
                pos: range.end,
                size,
            });
        }

        let (from_path, from_offset) = self
            .resolve(range.start)
            .ok_or(HostError::InvalidPosition(range.start))?;
        let (to_path, to_offset) = self
            .resolve(range.end)
            .ok_or(HostError::InvalidPosition(range.end))?;

        let (from_parent, from_index) = from_path.split_at(from_path.len() - 1);
        let (to_parent, to_index) = to_path.split_at(to_path.len() - 1);
        if from_parent != to_parent {
            return Err(HostError::CrossesContainer {
                start: range.start,
                end: range.end,
            });
        }
        let (first, last) = (from_index[0], to_index[0]);

        let siblings = siblings_mut(&mut self.blocks, from_parent)
            .ok_or(HostError::InvalidPosition(range.start))?;

        let tail = {
            let last_runs = siblings[last]
                .runs()
                .ok_or(HostError::InvalidPosition(range.end))?;
            let len = last_runs.iter().map(TextRun::char_len).sum();
            slice_runs(last_runs, to_offset..len)
        };
        let runs = siblings[first]
            .runs_mut()
            .ok_or(HostError::InvalidPosition(range.start))?;
        let marks = marks_at(runs, from_offset, from_offset < to_offset || first < last);
        let mut next = slice_runs(runs, 0..from_offset);
        next.push(TextRun {
            text: text.to_string(),
            marks,
        });
        next.extend(tail);
        *runs = normalize_runs(next);

        if last > first {
            siblings.drain(first + 1..=last);
        }

        self.version += 1;
        Ok(())
    }
}

fn non_empty(blocks: Vec<Block>) -> Vec<Block> {
    if blocks.is_empty() {
        vec![Block::paragraph("")]
    } else {
        blocks
    }
}

fn runs_from(text: &str) -> Vec<TextRun> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![TextRun::plain(text)]
    }
}

fn walk(blocks: &[Block], mut pos: DocPos, visitor: &mut dyn FnMut(Visit<'_>)) {
    for block in blocks {
        let textblock = block.is_textblock();
        visitor(Visit::EnterBlock { textblock, pos });
        if let Some(runs) = block.runs() {
            let mut at = pos.advance(1);
            for run in runs {
                if !run.text.is_empty() {
                    visitor(Visit::Text {
                        text: &run.text,
                        pos: at,
                    });
                }
                at = at.advance(run.char_len());
            }
        } else if let Some(children) = block.children() {
            walk(children, pos.advance(1), visitor);
        }
        pos = pos.advance(block.size());
        visitor(Visit::LeaveBlock { textblock, pos });
    }
}

fn resolve_in(blocks: &[Block], base: DocPos, target: DocPos, path: &mut Vec<usize>) -> Option<usize> {
    let mut pos = base;
    for (i, block) in blocks.iter().enumerate() {
        let end = pos.advance(block.size());
        if let Some(runs) = block.runs() {
            let content_start = pos.advance(1);
            let content_end = content_start.advance(runs.iter().map(TextRun::char_len).sum());
            if content_start <= target && target <= content_end {
                path.push(i);
                return Some(target.0 - content_start.0);
            }
        } else if let Some(children) = block.children()
            && pos < target
            && target < end
        {
            path.push(i);
            let found = resolve_in(children, pos.advance(1), target, path);
            if found.is_none() {
                path.pop();
            }
            return found;
        }
        pos = end;
    }
    None
}

fn siblings_mut<'a>(blocks: &'a mut Vec<Block>, parent: &[usize]) -> Option<&'a mut Vec<Block>> {
    let mut current = blocks;
    for &i in parent {
        current = current.get_mut(i)?.children_mut()?;
    }
    Some(current)
}

fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Copy the characters of `runs` that fall in `range`, keeping their marks.
fn slice_runs(runs: &[TextRun], range: Range<usize>) -> Vec<TextRun> {
    let mut out = Vec::new();
    let mut at = 0;
    for run in runs {
        let len = run.char_len();
        let (start, end) = (at, at + len);
        at = end;
        let lo = range.start.max(start);
        let hi = range.end.min(end);
        if lo < hi {
            let text = &run.text[char_to_byte(&run.text, lo - start)..char_to_byte(&run.text, hi - start)];
            out.push(TextRun {
                text: text.to_string(),
                marks: run.marks.clone(),
            });
        }
    }
    out
}

fn run_containing(runs: &[TextRun], offset: usize) -> Option<&TextRun> {
    let mut at = 0;
    for run in runs {
        let end = at + run.char_len();
        if at <= offset && offset < end {
            return Some(run);
        }
        at = end;
    }
    None
}

/// Marks for inserted text: those of the first replaced character when
/// something is deleted, otherwise those of the character before the caret.
fn marks_at(runs: &[TextRun], offset: usize, deleting: bool) -> Marks {
    let replaced = deleting.then(|| run_containing(runs, offset)).flatten();
    replaced
        .or_else(|| offset.checked_sub(1).and_then(|o| run_containing(runs, o)))
        .or_else(|| runs.first())
        .map(|r| r.marks.clone())
        .unwrap_or_default()
}

/// Drop empty runs and merge neighbours with identical marks.
pub(crate) fn normalize_runs(runs: Vec<TextRun>) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(prev) if prev.marks == run.marks => prev.text.push_str(&run.text),
            _ => out.push(run),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_paragraphs() -> RichDocument {
        // <p>Hello</p><p>World</p>: content at 1..6 and 8..13
        RichDocument::new(vec![Block::paragraph("Hello"), Block::paragraph("World")])
    }

    #[test]
    fn empty_document_has_one_paragraph() {
        let doc = RichDocument::default();
        assert_eq!(doc.blocks(), &[Block::Paragraph { content: vec![] }]);
        assert_eq!(doc.size(), 2);
    }

    #[test]
    fn sizes_count_open_close_and_chars() {
        let list = Block::bullet_list(vec![Block::item("ab"), Block::item("c")]);
        // list(2) + item(2) + para(2+2) + item(2) + para(2+1)
        assert_eq!(list.size(), 13);
        assert_eq!(Block::ThematicBreak.size(), 1);
    }

    #[test]
    fn visit_reports_document_order() {
        let doc = RichDocument::new(vec![
            Block::heading(1, "T"),
            Block::bullet_list(vec![Block::item("x")]),
        ]);
        let mut seen = Vec::new();
        doc.visit(&mut |v| {
            if let Visit::Text { text, pos } = v {
                seen.push((text.to_string(), pos));
            }
        });
        // heading 0..3, list opens at 3, item at 4, paragraph at 5, text at 6
        assert_eq!(seen, vec![("T".to_string(), DocPos(1)), ("x".to_string(), DocPos(6))]);
    }

    #[test]
    fn replace_inside_one_run() {
        let mut doc = two_paragraphs();
        doc.replace_range(DocPos(2)..DocPos(5), "ipp").unwrap();
        assert_eq!(doc.blocks()[0].text(), "Hippo");
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn replace_keeps_marks_of_first_replaced_char() {
        let mut doc = RichDocument::new(vec![Block::paragraph_runs(vec![
            TextRun::plain("a "),
            TextRun::bold("bold"),
            TextRun::plain(" z"),
        ])]);
        // "bold" occupies 3..7
        doc.replace_range(DocPos(3)..DocPos(7), "strong").unwrap();
        assert_eq!(
            doc.blocks()[0].runs().unwrap(),
            &[
                TextRun::plain("a "),
                TextRun::bold("strong"),
                TextRun::plain(" z")
            ]
        );
    }

    #[test]
    fn replace_across_sibling_blocks_joins_them() {
        let mut doc = two_paragraphs();
        doc.replace_range(DocPos(4)..DocPos(10), "-").unwrap();
        assert_eq!(doc.blocks(), &[Block::paragraph("Hel-rld")]);
    }

    #[test]
    fn replace_across_containers_is_refused_and_leaves_document() {
        let mut doc = RichDocument::new(vec![
            Block::paragraph("Intro"),
            Block::bullet_list(vec![Block::item("one")]),
        ]);
        let before = doc.clone();
        let err = doc.replace_range(DocPos(2)..DocPos(12), "x").unwrap_err();
        assert!(matches!(err, HostError::CrossesContainer { .. }));
        assert_eq!(doc, before);
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn replace_rejects_structural_positions() {
        let mut doc = two_paragraphs();
        assert_eq!(
            doc.replace_range(DocPos(0)..DocPos(3), "x"),
            Err(HostError::InvalidPosition(DocPos(0)))
        );
        assert_eq!(
            doc.replace_range(DocPos(3)..DocPos(99), "x"),
            Err(HostError::OutOfRange {
                pos: DocPos(99),
                size: 14
            })
        );
    }

    #[test]
    fn replace_handles_multibyte_characters() {
        let mut doc = RichDocument::new(vec![Block::paragraph("naïve café")]);
        // "café" is chars 6..10, positions 7..11
        doc.replace_range(DocPos(7)..DocPos(11), "bistro").unwrap();
        assert_eq!(doc.blocks()[0].text(), "naïve bistro");
    }

    #[test]
    fn normalize_merges_equal_marks() {
        let runs = normalize_runs(vec![
            TextRun::plain("a"),
            TextRun::plain(""),
            TextRun::plain("b"),
            TextRun::italic("c"),
        ]);
        assert_eq!(runs, vec![TextRun::plain("ab"), TextRun::italic("c")]);
    }
}
