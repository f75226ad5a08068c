pub mod fs_write;

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::parse::{FileOperationDirective, Operation, ParseError, ReplyParser};

#[derive(Debug, Error)]
pub enum FileOpError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write to file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("refusing to write outside the working directory: {}", .0.display())]
    OutsideWorkDir(PathBuf),
}

/// What executing a directive did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Created(PathBuf),
    /// The operation was understood but is not carried out.
    NotExecuted {
        operation: Operation,
        target: PathBuf,
    },
}

/// Carries out parsed directives relative to a working directory.
///
/// Only [`Operation::Create`] touches the filesystem. Targets are taken as
/// the model wrote them, so a path such as `../x` or `/etc/x` is honoured
/// unless `confine` is set.
pub struct FileExecutor {
    root: PathBuf,
    confine: bool,
}

impl FileExecutor {
    pub fn new(root: impl Into<PathBuf>, confine: bool) -> Self {
        Self {
            root: root.into(),
            confine,
        }
    }

    pub fn execute(&self, directive: &FileOperationDirective) -> Result<FileOutcome, FileOpError> {
        let target = resolve_target(&self.root, &directive.path, &directive.filename);

        match &directive.operation {
            Operation::Create => {
                if self.confine && !is_within(&self.root, &target) {
                    warn!("Blocked write outside {}: {}", self.root.display(), target.display());
                    return Err(FileOpError::OutsideWorkDir(target));
                }
                fs_write::create_file(&target, &directive.content)?;
                info!("Created {} ({} bytes)", target.display(), directive.content.len());
                Ok(FileOutcome::Created(target))
            }
            other => {
                info!("Operation {} on {} is recognised but not executed", other, target.display());
                Ok(FileOutcome::NotExecuted {
                    operation: other.clone(),
                    target,
                })
            }
        }
    }
}

/// Parses a model reply and executes the directive it contains.
pub fn apply_reply(
    parser: &dyn ReplyParser,
    executor: &FileExecutor,
    reply: &str,
) -> Result<FileOutcome, FileOpError> {
    let directive = parser.parse(reply)?;
    executor.execute(&directive)
}

/// Joins `path` and `filename` under `root`. A path of `""`, `"."` or `"/"`
/// means the file goes straight into `root`.
pub fn resolve_target(root: &Path, path: &str, filename: &str) -> PathBuf {
    match path.trim() {
        "" | "." | "/" => root.join(filename),
        dir => root.join(dir).join(filename),
    }
}

/// Lexical containment check; symlinks are not followed.
pub fn is_within(root: &Path, target: &Path) -> bool {
    normalize(target).starts_with(normalize(root))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::chat::parse::RegexReplyParser;
    use std::fs;
    use tempfile::TempDir;

    fn directive(
        operation: Operation,
        path: &str,
        filename: &str,
        content: &str,
    ) -> FileOperationDirective {
        FileOperationDirective {
            operation,
            filename: filename.to_string(),
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_apply_reply_creates_file() {
        let dir = TempDir::new().unwrap();
        let parser = RegexReplyParser::new().unwrap();
        let executor = FileExecutor::new(dir.path(), false);

        let outcome = apply_reply(&parser, &executor, "文件名: demo.c\n内容:\nint main(){}").unwrap();

        assert_eq!(outcome, FileOutcome::Created(dir.path().join("demo.c")));
        assert_eq!(fs::read_to_string(dir.path().join("demo.c")).unwrap(), "int main(){}");
    }

    #[test]
    fn test_apply_reply_without_content_marker_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let parser = RegexReplyParser::new().unwrap();
        let executor = FileExecutor::new(dir.path(), false);

        let err = apply_reply(&parser, &executor, "文件名: demo.c\nint main(){}").unwrap_err();

        assert!(matches!(err, FileOpError::Parse(ParseError::NoValidOutput)));
        assert_eq!(err.to_string(), "No valid file output detected.");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_apply_reply_delete_leaves_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "keep").unwrap();
        let parser = RegexReplyParser::new().unwrap();
        let executor = FileExecutor::new(dir.path(), false);

        let reply = "操作类型: 删除\n文件名: a.txt\n路径: .\n内容:\n删除这个文件";
        let outcome = apply_reply(&parser, &executor, reply).unwrap();

        assert!(matches!(outcome, FileOutcome::NotExecuted { operation: Operation::Delete, .. }));
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "keep");
    }

    #[test]
    fn test_resolve_target() {
        let root = Path::new("/work");
        assert_eq!(resolve_target(root, "", "a.txt"), PathBuf::from("/work/a.txt"));
        assert_eq!(resolve_target(root, ".", "a.txt"), PathBuf::from("/work/a.txt"));
        assert_eq!(resolve_target(root, "/", "a.txt"), PathBuf::from("/work/a.txt"));
        assert_eq!(resolve_target(root, "src/bin", "a.rs"), PathBuf::from("/work/src/bin/a.rs"));
        assert_eq!(resolve_target(root, "/tmp", "a.txt"), PathBuf::from("/tmp/a.txt"));
    }

    #[test]
    fn test_is_within() {
        let root = Path::new("/work");
        assert!(is_within(root, Path::new("/work/./src/a.rs")));
        assert!(!is_within(root, Path::new("/work/../etc/passwd")));
        assert!(!is_within(root, Path::new("/tmp/a.txt")));
    }

    #[test]
    fn test_create_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "old").unwrap();

        let executor = FileExecutor::new(dir.path(), false);
        let outcome = executor
            .execute(&directive(Operation::Create, ".", "notes.txt", "new"))
            .unwrap();

        assert_eq!(outcome, FileOutcome::Created(dir.path().join("notes.txt")));
        assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "new");
    }

    #[test]
    fn test_delete_is_recognised_but_not_executed() {
        let dir = TempDir::new().unwrap();
        let victim = dir.path().join("keep.txt");
        fs::write(&victim, "still here").unwrap();

        let executor = FileExecutor::new(dir.path(), false);
        let outcome = executor
            .execute(&directive(Operation::Delete, "", "keep.txt", "remove it"))
            .unwrap();

        assert_eq!(
            outcome,
            FileOutcome::NotExecuted {
                operation: Operation::Delete,
                target: victim.clone(),
            }
        );
        assert_eq!(fs::read_to_string(&victim).unwrap(), "still here");
    }

    #[test]
    fn test_escape_allowed_by_default() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("project");
        fs::create_dir(&root).unwrap();

        let executor = FileExecutor::new(&root, false);
        let outcome = executor
            .execute(&directive(Operation::Create, "..", "outside.txt", "x"))
            .unwrap();

        assert!(matches!(outcome, FileOutcome::Created(_)));
        assert!(dir.path().join("outside.txt").exists());
    }

    #[test]
    fn test_escape_blocked_when_confined() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("project");
        fs::create_dir(&root).unwrap();

        let executor = FileExecutor::new(&root, true);
        let result = executor.execute(&directive(Operation::Create, "..", "outside.txt", "x"));

        assert!(matches!(result, Err(FileOpError::OutsideWorkDir(_))));
        assert!(!dir.path().join("outside.txt").exists());
    }
}
