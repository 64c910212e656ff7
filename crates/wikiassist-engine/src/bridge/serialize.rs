use std::ops::Range;

use crate::models::document::{Block, RichDocument, TextRun};

/// Render a document as CommonMark.
///
/// Output is normalized: `-` bullets, fenced code, ATX headings, one blank
/// line between blocks.
pub fn to_markdown(doc: &RichDocument) -> String {
    let mut out = render_blocks(doc.blocks(), "\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn render_blocks(blocks: &[Block], separator: &str) -> String {
    blocks
        .iter()
        .map(render_block)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Heading { level, content } => {
            format!(
                "{} {}",
                "#".repeat(usize::from(*level).clamp(1, 6)),
                render_inline(content, false)
            )
        }
        Block::Paragraph { content } => render_inline(content, true),
        Block::CodeBlock { lang, content } => {
            let code: String = content.iter().map(|r| r.text.as_str()).collect();
            let fence = "`".repeat(longest_run(&code, '`').max(2) + 1);
            format!("{fence}{}\n{code}\n{fence}", lang.as_deref().unwrap_or(""))
        }
        Block::BulletList { items } => items
            .iter()
            .map(|item| prefix_lines(&render_item(item), "- ", "  "))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::OrderedList { start, items } => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let marker = format!("{}. ", start + i as u64);
                let indent = " ".repeat(marker.len());
                prefix_lines(&render_item(item), &marker, &indent)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::ListItem { .. } => render_item(block),
        Block::BlockQuote { children } => {
            let inner = render_blocks(children, "\n\n");
            inner
                .lines()
                .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {line}") })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Block::ThematicBreak => "---".to_string(),
    }
}

/// Item children: nested lists follow their text directly, other blocks get a blank line.
fn render_item(item: &Block) -> String {
    let Some(children) = item.children() else {
        return render_block(item);
    };
    let mut out = String::new();
    for child in children {
        let rendered = render_block(child);
        if !out.is_empty() {
            let nested_list = matches!(child, Block::BulletList { .. } | Block::OrderedList { .. });
            out.push_str(if nested_list { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
    }
    out
}

fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    let mut out = String::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(rest);
            }
        } else {
            out.push_str(first.trim_end());
            if !line.is_empty() {
                out.push(' ');
            }
        }
        out.push_str(line);
    }
    out
}

/// Render inline runs.
///
/// Newlines inside the text become hard breaks when `hard_breaks` is set and
/// the break has text on both sides; anywhere else they are written as `&#10;`.
fn render_inline(runs: &[TextRun], hard_breaks: bool) -> String {
    let text: Vec<char> = runs.iter().flat_map(|r| r.text.chars()).collect();
    let mut writer = InlineWriter {
        text: &text,
        hard_breaks,
        out: String::new(),
        guard_next: false,
    };

    let mut at = 0;
    for run in runs {
        let range = at..at + run.char_len();
        at = range.end;

        if run.marks.code {
            writer.code(&run.text);
            continue;
        }

        let mut delim = String::new();
        if run.marks.italic {
            delim.push('*');
        }
        if run.marks.bold {
            delim.push_str("**");
        }
        if delim.is_empty() {
            writer.plain(range);
            continue;
        }

        // Delimiters must hug non-space text to be recognized.
        let lead = text[range.clone()].iter().take_while(|c| c.is_whitespace()).count();
        if lead == range.len() {
            writer.plain(range);
            continue;
        }
        let trail = text[range.clone()].iter().rev().take_while(|c| c.is_whitespace()).count();
        let core = range.start + lead..range.end - trail;
        let closing: String = delim.chars().rev().collect();

        writer.plain(range.start..core.start);
        writer.open(&delim, core.start);
        writer.plain(core.clone());
        writer.close(&closing, core.end - 1);
        writer.plain(core.end..range.end);
    }
    writer.out
}

/// Writes one text block's inline content, indexed by character.
struct InlineWriter<'a> {
    text: &'a [char],
    hard_breaks: bool,
    out: String,
    /// A closing delimiter was just written after punctuation, so a word
    /// character directly after it would stop it from closing.
    guard_next: bool,
}

impl InlineWriter<'_> {
    fn plain(&mut self, range: Range<usize>) {
        for g in range {
            let c = self.text[g];
            if std::mem::take(&mut self.guard_next) && is_word(c) {
                push_reference(&mut self.out, c);
                continue;
            }
            if c == '\n' {
                if self.hard_breaks && self.interior_break(g) {
                    self.out.push_str("\\\n");
                } else {
                    self.out.push_str("&#10;");
                }
                continue;
            }
            if self.needs_escape(g) {
                self.out.push('\\');
            }
            self.out.push(c);
        }
    }

    /// An opening delimiter before punctuation only opens when it follows
    /// whitespace or punctuation; a word character before it is written as
    /// a character reference instead.
    fn open(&mut self, delim: &str, core_start: usize) {
        self.guard_next = false;
        if !self.text[core_start].is_alphanumeric()
            && let Some(prev) = self.out.chars().next_back()
            && is_word(prev)
        {
            self.out.pop();
            push_reference(&mut self.out, prev);
        }
        self.out.push_str(delim);
    }

    fn close(&mut self, delim: &str, core_last: usize) {
        self.out.push_str(delim);
        self.guard_next = !self.text[core_last].is_alphanumeric();
    }

    fn code(&mut self, code: &str) {
        self.guard_next = false;
        let ticks = "`".repeat(longest_run(code, '`') + 1);
        let pad = if code.starts_with('`') || code.ends_with('`') { " " } else { "" };
        self.out.push_str(&format!("{ticks}{pad}{code}{pad}{ticks}"));
    }

    fn interior_break(&self, g: usize) -> bool {
        g > 0
            && self.text[g - 1] != '\n'
            && self.text.get(g + 1).is_some_and(|next| !next.is_whitespace())
    }

    /// Whether only spaces separate `g` from the start of its line.
    fn line_start(&self, g: usize) -> bool {
        self.text[..g]
            .iter()
            .rev()
            .find(|&&c| c != ' ' && c != '\t')
            .is_none_or(|&c| c == '\n')
    }

    fn needs_escape(&self, g: usize) -> bool {
        match self.text[g] {
            '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '&' => true,
            '#' | '>' | '-' | '+' | '=' | '~' => self.line_start(g),
            // "12." or "3)" opening a line would start an ordered list
            '.' | ')' => {
                let digits = self.text[..g]
                    .iter()
                    .rev()
                    .take_while(|c| c.is_ascii_digit())
                    .count();
                digits > 0 && self.line_start(g - digits)
            }
            _ => false,
        }
    }
}

/// Neither whitespace nor punctuation, in the sense of emphasis flanking.
fn is_word(c: char) -> bool {
    !c.is_whitespace() && !c.is_ascii_punctuation()
}

fn push_reference(out: &mut String, c: char) {
    out.push_str(&format!("&#{};", u32::from(c)));
}

fn longest_run(text: &str, needle: char) -> usize {
    let mut best = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == needle {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_blocks_with_blank_lines() {
        let doc = RichDocument::new(vec![
            Block::heading(2, "Title"),
            Block::paragraph_runs(vec![TextRun::plain("Some "), TextRun::bold("bold "), TextRun::plain("text")]),
            Block::bullet_list(vec![Block::item("one"), Block::item("two")]),
        ]);
        insta::assert_snapshot!(to_markdown(&doc).trim_end(), @r"
        ## Title

        Some **bold** text

        - one
        - two
        ");
    }

    #[test]
    fn nested_and_ordered_lists_indent_under_their_marker() {
        let doc = RichDocument::new(vec![Block::OrderedList {
            start: 9,
            items: vec![
                Block::ListItem {
                    children: vec![
                        Block::paragraph("nine"),
                        Block::bullet_list(vec![Block::item("inner")]),
                    ],
                },
                Block::item("ten"),
            ],
        }]);
        assert_eq!(to_markdown(&doc), "9. nine\n   - inner\n10. ten\n");
    }

    #[test]
    fn quotes_and_code() {
        let doc = RichDocument::new(vec![
            Block::BlockQuote {
                children: vec![Block::paragraph("a"), Block::paragraph("b")],
            },
            Block::CodeBlock {
                lang: None,
                content: vec![TextRun::plain("x = 1")],
            },
            Block::ThematicBreak,
        ]);
        assert_eq!(to_markdown(&doc), "> a\n>\n> b\n\n```\nx = 1\n```\n\n---\n");
    }

    #[test]
    fn escapes_markdown_syntax_in_plain_text() {
        let doc = RichDocument::new(vec![
            Block::paragraph("# not a heading"),
            Block::paragraph("2. not a list, 2 * 3"),
        ]);
        assert_eq!(
            to_markdown(&doc),
            "\\# not a heading\n\n2\\. not a list, 2 \\* 3\n"
        );
    }

    #[test]
    fn newlines_become_hard_breaks_with_each_line_escaped() {
        let doc = RichDocument::new(vec![Block::paragraph("intro\n# not heading\n- nor item\n3. nor this")]);
        assert_eq!(
            to_markdown(&doc),
            "intro\\\n\\# not heading\\\n\\- nor item\\\n3\\. nor this\n"
        );
    }

    #[test]
    fn newlines_without_text_on_both_sides_are_references() {
        let doc = RichDocument::new(vec![
            Block::paragraph("end\n"),
            Block::paragraph("a\n\nb"),
            Block::heading(2, "one\ntwo"),
        ]);
        assert_eq!(
            to_markdown(&doc),
            "end&#10;\n\na&#10;&#10;b\n\n## one&#10;two\n"
        );
    }

    #[test]
    fn emphasis_around_punctuation_keeps_its_delimiters_flanking() {
        let doc = RichDocument::new(vec![
            Block::paragraph_runs(vec![
                TextRun::plain("see"),
                TextRun::bold("(note)"),
                TextRun::plain("x"),
            ]),
            Block::paragraph_runs(vec![
                TextRun::plain("snake"),
                TextRun::italic("_"),
                TextRun::plain("case"),
            ]),
            Block::paragraph_runs(vec![
                TextRun::plain("a "),
                TextRun::bold("(b)"),
                TextRun::plain(" c"),
            ]),
        ]);
        assert_eq!(
            to_markdown(&doc),
            "se&#101;**(note)**&#120;\n\nsnak&#101;*\\_*&#99;ase\n\na **(b)** c\n"
        );
    }

    #[test]
    fn empty_document_renders_empty() {
        assert_eq!(to_markdown(&RichDocument::default()), "");
    }
}
