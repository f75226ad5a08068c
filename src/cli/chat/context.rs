use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

const INDENT: &str = "    ";

/// Knows the directory the session works in and can describe it to the model.
pub struct ContextManager {
    pub current_dir: PathBuf,
}

impl ContextManager {
    pub fn new() -> Self {
        let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_dir(current_dir)
    }

    pub fn with_dir(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
        }
    }

    /// Recursive listing of the working directory. Directories end with `/`
    /// and their children are indented one level deeper.
    pub fn folder_structure(&self) -> io::Result<String> {
        let mut out = String::new();
        scan_dir(&self.current_dir, "", &mut out)?;
        Ok(out)
    }
}

fn scan_dir(path: &Path, prefix: &str, out: &mut String) -> io::Result<()> {
    let mut entries = fs::read_dir(path)?
        .filter_map(|entry| entry.ok())
        .collect::<Vec<_>>();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        let full_path = entry.path();

        if full_path.is_dir() {
            out.push_str(&format!("{}{}/\n", prefix, name));
            let child_prefix = format!("{}{}", prefix, INDENT);
            if let Err(e) = scan_dir(&full_path, &child_prefix, out) {
                debug!("Skipping unreadable directory {}: {}", full_path.display(), e);
            }
        } else {
            out.push_str(&format!("{}{}\n", prefix, name));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_folder_structure_nests_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::create_dir_all(dir.path().join("a/inner")).unwrap();
        fs::write(dir.path().join("a/inner/deep.rs"), "").unwrap();
        fs::write(dir.path().join("a/file.md"), "").unwrap();

        let listing = ContextManager::with_dir(dir.path()).folder_structure().unwrap();

        assert_eq!(
            listing,
            "a/\n    file.md\n    inner/\n        deep.rs\nb.txt\n"
        );
    }

    #[test]
    fn test_empty_directory_yields_empty_listing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(ContextManager::with_dir(dir.path()).folder_structure().unwrap(), "");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(ContextManager::with_dir(missing).folder_structure().is_err());
    }
}
