use relative_path::{RelativePath, RelativePathBuf};

/// A markdown draft under the drafts root, with the names shown for it
#[derive(Debug, Clone, PartialEq)]
pub struct DraftFile {
    relative_path: RelativePathBuf,
    display_name: String,
}

impl DraftFile {
    pub fn new(relative_path: RelativePathBuf) -> Self {
        let display_name = Self::extract_display_name(&relative_path);
        Self {
            relative_path,
            display_name,
        }
    }

    pub fn from_relative_str(path: &str) -> Self {
        Self::new(RelativePathBuf::from(path))
    }

    pub fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    /// File name without the .md extension
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Article title sent with a review request: the display name with
    /// underscores read as spaces, the way wiki page names are written
    pub fn review_title(&self) -> String {
        self.display_name.replace('_', " ")
    }

    /// Where a saved review response for this draft lives: `name.review.json`
    /// next to the draft
    pub fn review_path(&self) -> RelativePathBuf {
        self.relative_path
            .with_file_name(format!("{}.review.json", self.display_name))
    }

    fn extract_display_name(path: &RelativePath) -> String {
        path.file_name()
            .map(|name| name.strip_suffix(".md").unwrap_or(name))
            .unwrap_or("Untitled")
            .to_string()
    }
}

impl From<RelativePathBuf> for DraftFile {
    fn from(path: RelativePathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for DraftFile {
    fn from(path: &str) -> Self {
        Self::from_relative_str(path)
    }
}
