//! Turns free-form model replies into file-operation directives.
//!
//! Callers only see the [`ReplyParser`] trait, so the regex matching used
//! here can be replaced by a stricter structured-output contract without
//! touching the chat loop.

use std::fmt;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

const OPERATION_LABEL: &str = "操作类型";

const FULL_TEMPLATE: &str = r"操作类型[:：][ \t]*(.+?)[ \t]*\n+\s*文件名[:：][ \t]*(.+?)[ \t]*\n+\s*路径[:：][ \t]*(.*?)[ \t]*\n+\s*内容[:：]?[ \t]*\n([\s\S]+)";

const SHORT_TEMPLATE: &str = r"文件名[:：][ \t]*(.+?)[ \t]*\n+\s*内容[:：]?[ \t]*\n([\s\S]+)";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("No valid file output detected.")]
    NoValidOutput,
}

/// The operation named in a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
    Update,
    Read,
    /// A label outside the known set, kept verbatim.
    Unrecognized(String),
}

impl Operation {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "创建" => Operation::Create,
            "删除" => Operation::Delete,
            "随机更新" | "更新" => Operation::Update,
            "随机读取" | "读取" => Operation::Read,
            other => match other.to_lowercase().as_str() {
                "create" => Operation::Create,
                "delete" => Operation::Delete,
                "update" => Operation::Update,
                "read" => Operation::Read,
                _ => Operation::Unrecognized(other.to_string()),
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Delete => write!(f, "delete"),
            Operation::Update => write!(f, "update"),
            Operation::Read => write!(f, "read"),
            Operation::Unrecognized(label) => write!(f, "{}", label),
        }
    }
}

/// One file operation extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOperationDirective {
    pub operation: Operation,
    pub filename: String,
    /// Directory part; empty when the reply named none.
    pub path: String,
    pub content: String,
}

pub trait ReplyParser {
    fn parse(&self, reply: &str) -> Result<FileOperationDirective, ParseError>;
}

/// Matches the labelled template with a single multi-line pattern.
///
/// The four labelled fields must appear in order. A reply that carries only
/// `文件名` and `内容` is read as a create, but only when it does not mention
/// an operation at all, so a malformed delete never turns into a write.
pub struct RegexReplyParser {
    full: Regex,
    short: Regex,
}

impl RegexReplyParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            full: Regex::new(FULL_TEMPLATE)?,
            short: Regex::new(SHORT_TEMPLATE)?,
        })
    }
}

impl ReplyParser for RegexReplyParser {
    fn parse(&self, reply: &str) -> Result<FileOperationDirective, ParseError> {
        if let Some(caps) = self.full.captures(reply) {
            return Ok(FileOperationDirective {
                operation: Operation::from_label(&caps[1]),
                filename: caps[2].trim().to_string(),
                path: caps[3].trim().to_string(),
                content: caps[4].trim().to_string(),
            });
        }

        if reply.contains(OPERATION_LABEL) {
            debug!("Reply names an operation but does not match the full template");
            return Err(ParseError::NoValidOutput);
        }

        match self.short.captures(reply) {
            Some(caps) => Ok(FileOperationDirective {
                operation: Operation::Create,
                filename: caps[1].trim().to_string(),
                path: String::new(),
                content: caps[2].trim().to_string(),
            }),
            None => Err(ParseError::NoValidOutput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> RegexReplyParser {
        RegexReplyParser::new().unwrap()
    }

    #[test]
    fn test_short_template() {
        let directive = parser().parse("文件名: demo.c\n内容:\nint main(){}").unwrap();

        assert_eq!(directive.operation, Operation::Create);
        assert_eq!(directive.filename, "demo.c");
        assert_eq!(directive.path, "");
        assert_eq!(directive.content, "int main(){}");
    }

    #[test]
    fn test_full_template() {
        let reply = "操作类型: 创建\n文件名: hello.py\n路径: scripts\n内容:\nprint('hi')\nprint('bye')\n";
        let directive = parser().parse(reply).unwrap();

        assert_eq!(directive.operation, Operation::Create);
        assert_eq!(directive.filename, "hello.py");
        assert_eq!(directive.path, "scripts");
        assert_eq!(directive.content, "print('hi')\nprint('bye')");
    }

    #[test]
    fn test_full_width_colons_and_blank_lines() {
        let reply = "操作类型：删除\n\n文件名：old.log\n\n路径：.\n\n内容：\n不再需要";
        let directive = parser().parse(reply).unwrap();

        assert_eq!(directive.operation, Operation::Delete);
        assert_eq!(directive.filename, "old.log");
        assert_eq!(directive.path, ".");
    }

    #[test]
    fn test_empty_path_field() {
        let reply = "操作类型: 创建\n文件名: a.txt\n路径:\n内容:\nabc";
        let directive = parser().parse(reply).unwrap();

        assert_eq!(directive.path, "");
        assert_eq!(directive.content, "abc");
    }

    #[test]
    fn test_leading_chatter_is_tolerated() {
        let reply = "好的，下面是指令：\n操作类型: 随机读取\n文件名: a.txt\n路径: docs\n内容:\n读取前十行";
        let directive = parser().parse(reply).unwrap();

        assert_eq!(directive.operation, Operation::Read);
    }

    #[test]
    fn test_missing_content_marker() {
        let err = parser().parse("文件名: demo.c\nint main(){}").unwrap_err();

        assert_eq!(err, ParseError::NoValidOutput);
        assert_eq!(err.to_string(), "No valid file output detected.");
    }

    #[test]
    fn test_fields_out_of_order_do_not_match() {
        let reply = "文件名: a.txt\n操作类型: 创建\n路径: .\n内容:\nabc";
        assert_eq!(parser().parse(reply), Err(ParseError::NoValidOutput));
    }

    #[test]
    fn test_unknown_operation_is_kept_verbatim() {
        let reply = "操作类型: 重命名\n文件名: a.txt\n路径: .\n内容:\nb.txt";
        let directive = parser().parse(reply).unwrap();

        assert_eq!(directive.operation, Operation::Unrecognized("重命名".to_string()));
    }

    #[test]
    fn test_operation_labels() {
        assert_eq!(Operation::from_label("随机更新"), Operation::Update);
        assert_eq!(Operation::from_label(" Create "), Operation::Create);
        assert_eq!(Operation::from_label("DELETE"), Operation::Delete);
    }
}
