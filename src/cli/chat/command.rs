/// A slash command typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Clear,
    Models,
    /// `/model <name>`; `None` when no name was given.
    Model(Option<String>),
    /// `/file <request>`; `None` when no request was given.
    File(Option<String>),
    Unknown(String),
}

impl Command {
    /// Returns `None` for ordinary chat input. Command words are matched
    /// case-insensitively; arguments keep their case.
    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim();
        if !input.starts_with('/') {
            return None;
        }

        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        let command = match word.to_lowercase().as_str() {
            "/exit" | "/quit" if arg.is_none() => Command::Exit,
            "/help" if arg.is_none() => Command::Help,
            "/clear" if arg.is_none() => Command::Clear,
            "/models" if arg.is_none() => Command::Models,
            "/model" => Command::Model(arg),
            "/file" => Command::File(arg),
            _ => Command::Unknown(input.to_string()),
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_input_is_not_a_command() {
        assert_eq!(Command::parse("hello /there"), None);
        assert_eq!(Command::parse("  what is rust?"), None);
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        assert_eq!(Command::parse("/EXIT"), Some(Command::Exit));
        assert_eq!(Command::parse("/Quit"), Some(Command::Exit));
        assert_eq!(Command::parse(" /Help "), Some(Command::Help));
        assert_eq!(Command::parse("/CLEAR"), Some(Command::Clear));
        assert_eq!(Command::parse("/Models"), Some(Command::Models));
    }

    #[test]
    fn test_model_argument_keeps_case() {
        assert_eq!(
            Command::parse("/MODEL  Llama3:8B "),
            Some(Command::Model(Some("Llama3:8B".to_string())))
        );
        assert_eq!(Command::parse("/model"), Some(Command::Model(None)));
    }

    #[test]
    fn test_file_request() {
        assert_eq!(
            Command::parse("/file 创建 hello.txt 内容为 hi"),
            Some(Command::File(Some("创建 hello.txt 内容为 hi".to_string())))
        );
        assert_eq!(Command::parse("/file"), Some(Command::File(None)));
    }

    #[test]
    fn test_unknown_commands() {
        assert_eq!(
            Command::parse("/frobnicate"),
            Some(Command::Unknown("/frobnicate".to_string()))
        );
        assert_eq!(Command::parse("/help me"), Some(Command::Unknown("/help me".to_string())));
    }
}
