use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use crate::models::document::{Block, Marks, RichDocument, TextRun, normalize_runs};

/// Parse markdown into a structured document.
///
/// Links keep their text and drop their target; raw HTML is kept as text.
pub fn from_markdown(markdown: &str) -> RichDocument {
    let mut processor = MarkdownProcessor::new();
    for event in Parser::new(markdown) {
        processor.process_event(event);
    }
    RichDocument::new(processor.finalize())
}

/// A container still being filled.
enum Frame {
    Document(Vec<Block>),
    BulletList(Vec<Block>),
    OrderedList(u64, Vec<Block>),
    ListItem(Vec<Block>),
    BlockQuote(Vec<Block>),
}

impl Frame {
    fn children_mut(&mut self) -> &mut Vec<Block> {
        match self {
            Frame::Document(c)
            | Frame::BulletList(c)
            | Frame::OrderedList(_, c)
            | Frame::ListItem(c)
            | Frame::BlockQuote(c) => c,
        }
    }

    fn into_block(self) -> Option<Block> {
        match self {
            Frame::Document(_) => None,
            Frame::BulletList(items) => Some(Block::BulletList { items }),
            Frame::OrderedList(start, items) => Some(Block::OrderedList { start, items }),
            Frame::ListItem(mut children) => {
                if children.is_empty() {
                    children.push(Block::paragraph(""));
                }
                Some(Block::ListItem { children })
            }
            Frame::BlockQuote(children) => Some(Block::BlockQuote { children }),
        }
    }
}

/// The text block inline events are currently filling.
enum Open {
    Paragraph,
    Heading(u8),
    CodeBlock(Option<String>),
}

/// Builds blocks from the pulldown-cmark event stream.
///
/// Containers (lists, items, quotes) live on `stack`; inline events fill the
/// one open text block. Tight list items emit text without a paragraph tag,
/// so inline content arriving with no open block opens an implicit paragraph.
struct MarkdownProcessor {
    stack: Vec<Frame>,
    open: Option<Open>,
    runs: Vec<TextRun>,
    bold: usize,
    italic: usize,
}

impl MarkdownProcessor {
    fn new() -> Self {
        Self {
            stack: vec![Frame::Document(Vec::new())],
            open: None,
            runs: Vec::new(),
            bold: 0,
            italic: 0,
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(Tag::Paragraph) => self.open_block(Open::Paragraph),
            Event::Start(Tag::Heading { level, .. }) => self.open_block(Open::Heading(level as u8)),
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.open_block(Open::CodeBlock(lang));
            }
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock) => {
                self.flush_block();
            }
            Event::Start(Tag::List(first)) => {
                self.flush_block();
                self.stack.push(match first {
                    Some(start) => Frame::OrderedList(start, Vec::new()),
                    None => Frame::BulletList(Vec::new()),
                });
            }
            Event::Start(Tag::Item) => {
                self.flush_block();
                self.stack.push(Frame::ListItem(Vec::new()));
            }
            Event::Start(Tag::BlockQuote(_)) => {
                self.flush_block();
                self.stack.push(Frame::BlockQuote(Vec::new()));
            }
            Event::End(TagEnd::List(_) | TagEnd::Item | TagEnd::BlockQuote(_)) => {
                self.flush_block();
                self.close_frame();
            }
            Event::Start(Tag::Strong) => self.bold += 1,
            Event::End(TagEnd::Strong) => self.bold = self.bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => self.italic += 1,
            Event::End(TagEnd::Emphasis) => self.italic = self.italic.saturating_sub(1),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.push_text(&text, false);
            }
            Event::Code(code) => self.push_text(&code, true),
            Event::SoftBreak => {
                if matches!(self.open, Some(Open::CodeBlock(_))) {
                    self.push_text("\n", false);
                } else {
                    self.push_text(" ", false);
                }
            }
            Event::HardBreak => self.push_text("\n", false),
            Event::Rule => {
                self.flush_block();
                self.top().push(Block::ThematicBreak);
            }
            _ => {}
        }
    }

    fn top(&mut self) -> &mut Vec<Block> {
        // The document frame is never popped.
        let last = self.stack.len() - 1;
        self.stack[last].children_mut()
    }

    fn open_block(&mut self, kind: Open) {
        self.flush_block();
        self.open = Some(kind);
    }

    fn push_text(&mut self, text: &str, code: bool) {
        if self.open.is_none() {
            self.open = Some(Open::Paragraph);
        }
        let marks = if matches!(self.open, Some(Open::CodeBlock(_))) {
            Marks::default()
        } else {
            Marks {
                bold: self.bold > 0,
                italic: self.italic > 0,
                code,
            }
        };
        self.runs.push(TextRun {
            text: text.to_string(),
            marks,
        });
    }

    fn flush_block(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        let mut content = normalize_runs(std::mem::take(&mut self.runs));
        let block = match open {
            Open::Paragraph => Block::Paragraph { content },
            Open::Heading(level) => Block::Heading { level, content },
            Open::CodeBlock(lang) => {
                if let Some(last) = content.last_mut()
                    && last.text.ends_with('\n')
                {
                    last.text.pop();
                }
                Block::CodeBlock {
                    lang,
                    content: normalize_runs(content),
                }
            }
        };
        self.top().push(block);
    }

    fn close_frame(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(block) = self.stack.pop().and_then(Frame::into_block) {
            self.top().push(block);
        }
    }

    fn finalize(mut self) -> Vec<Block> {
        self.flush_block();
        while self.stack.len() > 1 {
            self.close_frame();
        }
        match self.stack.pop() {
            Some(Frame::Document(blocks)) => blocks,
            _ => Vec::new(),
        }
    }
}
