pub mod bridge;
pub mod editing;
pub mod io;
pub mod models;
pub mod render;


// Re-export key types for easier usage
pub use bridge::{from_markdown, to_markdown};
pub use editing::*;
pub use io::*;
pub use models::*;
