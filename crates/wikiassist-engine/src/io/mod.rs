use crate::models::ReviewResponse;
use relative_path::RelativePath;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid drafts directory: {0}")]
    InvalidDraftsDir(String),
    #[error("Invalid review response in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a markdown draft and return its content
pub fn read_draft(relative_path: &RelativePath, drafts_root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(drafts_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Write content to a markdown draft
pub fn write_draft(
    relative_path: &RelativePath,
    drafts_root: &Path,
    content: &str,
) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(drafts_root);

    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(&absolute_path, content).map_err(IoError::Io)
}

/// Load a saved review-service response
pub fn read_review(path: &Path) -> Result<ReviewResponse, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    ReviewResponse::from_json(&json).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Scan for markdown drafts in the drafts directory
pub fn scan_drafts(drafts_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    validate_drafts_dir(drafts_root)?;

    let mut files = Vec::new();
    scan_directory_recursive(drafts_root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == "md"
        {
            files.push(path);
        }
    }

    Ok(())
}

pub fn validate_drafts_dir(path: &Path) -> Result<(), IoError> {
    if !path.is_dir() {
        return Err(IoError::InvalidDraftsDir(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(())
}
