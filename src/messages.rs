use std::fmt::Display;
use std::str::FromStr;

/// Language used for every user-facing string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Zh,
    En,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "cn" | "chinese" => Ok(Locale::Zh),
            "en" | "en-us" | "english" => Ok(Locale::En),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

/// Keys for the message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    Banner,
    ConnectFailed,
    ConnectHint,
    NoModels,
    PullHint,
    Connected,
    ModelFallback,
    CurrentModel,
    ThinkingEnabled,
    AgentEnabled,
    HelpHint,
    ExitHint,
    UserPrompt,
    AssistantLabel,
    Farewell,
    Help,
    HistoryCleared,
    AvailableModels,
    ModelListFailed,
    SwitchedModel,
    ModelUnavailable,
    UnknownCommand,
    ReplyFailed,
    RequestError,
    IntentDetected,
    FileCreated,
    FileOpNotExecuted,
    NoValidOutput,
    FileOpFailed,
    SnapshotFailed,
    FileUsage,
}

/// Message-resource lookup for one locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn get(&self, key: Msg) -> &'static str {
        match self.locale {
            Locale::Zh => zh(key),
            Locale::En => en(key),
        }
    }

    /// Looks up `key` and substitutes each `{}` placeholder with the next argument.
    pub fn format(&self, key: Msg, args: &[&dyn Display]) -> String {
        fill(self.get(key), args)
    }
}

fn fill(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;

    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => out.push_str(&arg.to_string()),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

fn zh(key: Msg) -> &'static str {
    match key {
        Msg::Banner => "🤖 Ollama Chat - 命令行聊天程序",
        Msg::ConnectFailed => "❌ 无法连接到Ollama服务",
        Msg::ConnectHint => "请确保Ollama正在运行: ollama serve",
        Msg::NoModels => "⚠️  没有找到可用的模型",
        Msg::PullHint => "请使用 'ollama pull <model-name>' 下载模型",
        Msg::Connected => "✅ 已连接到Ollama，可用模型: {}",
        Msg::ModelFallback => "⚠️  指定模型 {} 不可用，使用第一个可用模型: {}",
        Msg::CurrentModel => "当前使用模型: {}",
        Msg::ThinkingEnabled => "🧠 已启用thinking模式",
        Msg::AgentEnabled => "🧭 已启用意图识别，文件相关请求将自动执行",
        Msg::HelpHint => "输入 /help 查看可用命令",
        Msg::ExitHint => "输入 /exit 或 /quit 退出程序",
        Msg::UserPrompt => "你: ",
        Msg::AssistantLabel => "助手: ",
        Msg::Farewell => "👋 再见！",
        Msg::Help => "
可用命令:
  /help          - 显示此帮助信息
  /clear         - 清除对话历史
  /models        - 显示可用模型
  /model <名称>  - 切换模型 (例如: /model llama2)
  /file <需求>   - 让模型生成文件操作指令并执行
  /exit          - 退出程序
  /quit          - 退出程序
",
        Msg::HistoryCleared => "对话历史已清除",
        Msg::AvailableModels => "可用模型: {}",
        Msg::ModelListFailed => "无法获取模型列表: {}",
        Msg::SwitchedModel => "已切换到模型: {}",
        Msg::ModelUnavailable => "模型 {} 不可用。可用模型: {}",
        Msg::UnknownCommand => "未知命令，输入 /help 查看可用命令",
        Msg::ReplyFailed => "❌ 获取回复失败，请检查Ollama服务状态",
        Msg::RequestError => "错误: {}",
        Msg::IntentDetected => "请求类型: {}",
        Msg::FileCreated => "✅ 文件已写入: {}",
        Msg::FileOpNotExecuted => "⚠️  已识别操作「{}」(目标: {})，该操作尚未实现，未做任何修改",
        Msg::NoValidOutput => "未检测到有效的文件操作输出",
        Msg::FileOpFailed => "❌ 文件操作失败: {}",
        Msg::SnapshotFailed => "无法读取目录结构: {}",
        Msg::FileUsage => "用法: /file <需求>",
    }
}

fn en(key: Msg) -> &'static str {
    match key {
        Msg::Banner => "🤖 Ollama Chat - command-line chat",
        Msg::ConnectFailed => "❌ Cannot reach the Ollama service",
        Msg::ConnectHint => "Make sure Ollama is running: ollama serve",
        Msg::NoModels => "⚠️  No models found",
        Msg::PullHint => "Download one with 'ollama pull <model-name>'",
        Msg::Connected => "✅ Connected to Ollama, available models: {}",
        Msg::ModelFallback => "⚠️  Model {} is not available, using the first available model: {}",
        Msg::CurrentModel => "Current model: {}",
        Msg::ThinkingEnabled => "🧠 Thinking mode enabled",
        Msg::AgentEnabled => "🧭 Intent routing enabled, file requests are executed automatically",
        Msg::HelpHint => "Type /help to list commands",
        Msg::ExitHint => "Type /exit or /quit to leave",
        Msg::UserPrompt => "You: ",
        Msg::AssistantLabel => "Assistant: ",
        Msg::Farewell => "👋 Goodbye!",
        Msg::Help => "
Available commands:
  /help            - Show this help
  /clear           - Clear the conversation history
  /models          - List available models
  /model <name>    - Switch model (e.g. /model llama2)
  /file <request>  - Ask the model for a file operation and run it
  /exit            - Quit
  /quit            - Quit
",
        Msg::HistoryCleared => "Conversation history cleared",
        Msg::AvailableModels => "Available models: {}",
        Msg::ModelListFailed => "Could not list models: {}",
        Msg::SwitchedModel => "Switched to model: {}",
        Msg::ModelUnavailable => "Model {} is not available. Available models: {}",
        Msg::UnknownCommand => "Unknown command, type /help to list commands",
        Msg::ReplyFailed => "❌ No reply received, check the Ollama service",
        Msg::RequestError => "Error: {}",
        Msg::IntentDetected => "Request type: {}",
        Msg::FileCreated => "✅ File written: {}",
        Msg::FileOpNotExecuted => "⚠️  Recognised operation '{}' (target: {}) is not implemented, nothing was changed",
        Msg::NoValidOutput => "No valid file output detected.",
        Msg::FileOpFailed => "❌ File operation failed: {}",
        Msg::SnapshotFailed => "Could not read the directory tree: {}",
        Msg::FileUsage => "Usage: /file <request>",
    }
}
