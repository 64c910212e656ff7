//! HTML rendering of the structured view with the highlight overlay applied.

use std::fmt::Write as _;

use crate::editing::highlight::Marker;
use crate::editing::host::DocPos;
use crate::models::document::{Block, RichDocument, TextRun};

/// Render `doc` as HTML, wrapping marked text in `<mark>` elements.
///
/// A marker spanning several runs yields one `<mark>` per run piece, all
/// carrying the same `data-feedback-id`.
pub fn render(doc: &RichDocument, markers: &[Marker]) -> String {
    let mut out = String::new();
    render_blocks(&mut out, doc.blocks(), DocPos(0), markers);
    out
}

fn render_blocks(out: &mut String, blocks: &[Block], mut pos: DocPos, markers: &[Marker]) {
    for block in blocks {
        render_block(out, block, pos, markers);
        pos = pos.advance(block.size());
    }
}

fn render_block(out: &mut String, block: &Block, pos: DocPos, markers: &[Marker]) {
    let inner = pos.advance(1);
    match block {
        Block::Heading { level, content } => {
            let level = (*level).clamp(1, 6);
            let _ = write!(out, "<h{level}>");
            render_runs(out, content, inner, markers);
            let _ = write!(out, "</h{level}>");
        }
        Block::Paragraph { content } => {
            out.push_str("<p>");
            render_runs(out, content, inner, markers);
            out.push_str("</p>");
        }
        Block::CodeBlock { lang, content } => {
            match lang {
                Some(lang) => {
                    let _ = write!(
                        out,
                        "<pre><code class=\"language-{}\">",
                        html_escape::encode_double_quoted_attribute(lang)
                    );
                }
                None => out.push_str("<pre><code>"),
            }
            render_runs(out, content, inner, markers);
            out.push_str("</code></pre>");
        }
        Block::BulletList { items } => {
            out.push_str("<ul>");
            render_blocks(out, items, inner, markers);
            out.push_str("</ul>");
        }
        Block::OrderedList { start, items } => {
            if *start == 1 {
                out.push_str("<ol>");
            } else {
                let _ = write!(out, "<ol start=\"{start}\">");
            }
            render_blocks(out, items, inner, markers);
            out.push_str("</ol>");
        }
        Block::ListItem { children } => {
            out.push_str("<li>");
            render_blocks(out, children, inner, markers);
            out.push_str("</li>");
        }
        Block::BlockQuote { children } => {
            out.push_str("<blockquote>");
            render_blocks(out, children, inner, markers);
            out.push_str("</blockquote>");
        }
        Block::ThematicBreak => out.push_str("<hr>"),
    }
}

fn render_runs(out: &mut String, runs: &[TextRun], mut pos: DocPos, markers: &[Marker]) {
    for run in runs {
        let len = run.char_len();
        let end = pos.advance(len);

        // Cut points inside this run where a marker starts or ends.
        let mut cuts: Vec<usize> = vec![0, len];
        for m in markers {
            for p in [m.range.start, m.range.end] {
                if pos < p && p < end {
                    cuts.push(p.0 - pos.0);
                }
            }
        }
        cuts.sort_unstable();
        cuts.dedup();

        for piece in cuts.windows(2) {
            let (from, to) = (piece[0], piece[1]);
            let text = char_slice(&run.text, from, to);
            let at = pos.advance(from);
            match markers.iter().find(|m| m.contains(at)) {
                Some(marker) => {
                    let _ = write!(
                        out,
                        "<mark class=\"{}\" data-feedback-id=\"{}\">",
                        marker.css_class(),
                        marker.feedback_id
                    );
                    render_marked_text(out, run, text);
                    out.push_str("</mark>");
                }
                None => render_marked_text(out, run, text),
            }
        }
        pos = end;
    }
}

fn render_marked_text(out: &mut String, run: &TextRun, text: &str) {
    let escaped = html_escape::encode_text(text);
    let mut open = Vec::new();
    if run.marks.bold {
        open.push("strong");
    }
    if run.marks.italic {
        open.push("em");
    }
    if run.marks.code {
        open.push("code");
    }
    for tag in &open {
        let _ = write!(out, "<{tag}>");
    }
    out.push_str(&escaped);
    for tag in open.iter().rev() {
        let _ = write!(out, "</{tag}>");
    }
}

fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let byte = |chars: usize| s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i);
    &s[byte(from)..byte(to)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::EditingMode;
    use crate::editing::highlight::HighlightLayer;
    use crate::editing::offset_index::OffsetIndex;
    use crate::models::feedback::{FeedbackId, record};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_structure_without_markers() {
        let doc = RichDocument::new(vec![
            Block::heading(2, "A & B"),
            Block::paragraph_runs(vec![TextRun::plain("x "), TextRun::bold("<y>")]),
            Block::OrderedList {
                start: 3,
                items: vec![Block::item("z")],
            },
            Block::ThematicBreak,
        ]);
        assert_eq!(
            render(&doc, &[]),
            "<h2>A &amp; B</h2><p>x <strong>&lt;y&gt;</strong></p><ol start=\"3\"><li><p>z</p></li></ol><hr>"
        );
    }

    #[test]
    fn markers_are_split_at_run_boundaries() {
        let doc = RichDocument::new(vec![Block::paragraph_runs(vec![
            TextRun::plain("It is "),
            TextRun::bold("very"),
            TextRun::plain(" good."),
        ])]);
        let rec = record("is very good", "x", 3..15);
        let mut layer = HighlightLayer::new();
        layer.refresh(
            &OffsetIndex::build(&doc),
            std::slice::from_ref(&rec),
            None,
            EditingMode::Structured,
        );
        let id = rec.id;
        assert_eq!(
            render(&doc, layer.markers()),
            format!(
                "<p>It <mark class=\"highlight-high\" data-feedback-id=\"{id}\">is </mark>\
                 <mark class=\"highlight-high\" data-feedback-id=\"{id}\"><strong>very</strong></mark>\
                 <mark class=\"highlight-high\" data-feedback-id=\"{id}\"> good</mark>.</p>"
            )
        );
    }

    #[test]
    fn unknown_markers_outside_content_are_ignored() {
        let doc = RichDocument::new(vec![Block::paragraph("abc")]);
        let stray = Marker {
            feedback_id: FeedbackId::new(),
            range: DocPos(40)..DocPos(50),
            flat: 40..50,
            severity: Default::default(),
            selected: false,
        };
        assert_eq!(render(&doc, &[stray]), "<p>abc</p>");
    }
}
