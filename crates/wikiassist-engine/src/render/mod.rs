//! Output formats for the structured view.

pub mod html;
