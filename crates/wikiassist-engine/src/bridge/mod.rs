//! Conversion between the structured document and flattened markdown.
//!
//! The structured document stays the system of record. Flattened text is
//! produced from it when the raw editor opens, and every edit to that text is
//! parsed straight back. Round trips preserve text, emphasis, headings and
//! lists; whitespace and equivalent markup forms are normalized.

mod parse;
mod serialize;

pub use parse::from_markdown;
pub use serialize::to_markdown;

use crate::models::document::RichDocument;

pub fn to_flattened(doc: &RichDocument) -> String {
    to_markdown(doc)
}

pub fn from_flattened(markup: &str) -> RichDocument {
    from_markdown(markup)
}
