use std::fs;
use std::path::Path;

use super::FileOpError;

/// Create a file with the specified content.
///
/// An existing file at `path` is overwritten without asking. Missing parent
/// directories are created first.
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - The file cannot be written to
pub fn create_file(path: &Path, content: &str) -> Result<(), FileOpError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| FileOpError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(path, content).map_err(|source| FileOpError::Write {
        path: path.to_path_buf(),
        source,
    })
}
