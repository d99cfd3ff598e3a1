use std::path::{Component, Path};

use crate::SourceError;

/// Returns the name under which a local file is uploaded: its final path
/// component.
///
/// Rejects:
/// - Paths with no final component (`/`, empty paths)
/// - Paths ending in `..` or `.`
/// - File names that are not valid UTF-8
pub fn upload_file_name(path: &Path) -> Result<&str, SourceError> {
    let display = path.display();

    match path.components().next_back() {
        Some(Component::Normal(name)) => name.to_str().ok_or_else(|| {
            SourceError::InvalidPath(format!("file name is not valid UTF-8: {display}"))
        }),
        Some(Component::ParentDir | Component::CurDir) => Err(SourceError::InvalidPath(
            format!("path does not name a file: {display}"),
        )),
        _ => Err(SourceError::InvalidPath(format!(
            "path has no file name: {display}"
        ))),
    }
}
