use rustyline::{Config, Editor, Result};

pub fn generate_prompt(custom_prompt: Option<&str>) -> String {
    custom_prompt.unwrap_or("> ").to_string()
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .build();
    Editor::with_config(config)
}

/// Asks the model to answer with a single `TYPE:<token>` line.
pub fn classification_prompt(user_input: &str) -> String {
    format!(
        "请判断以下用户需求属于哪种类型，只能返回如下格式：TYPE:<类型>。\
         类型包括：file（文件管理相关），code（代码相关），other（其他）。\n\
         用户需求: {}\n\
         不要输出任何解释或多余文本，只输出类型。",
        user_input
    )
}

/// Asks the model for one file operation in the fixed four-field template.
/// `folder_structure` is the listing produced by the context manager.
pub fn file_operation_prompt(folder_structure: &str, user_input: &str) -> String {
    format!(
        "你是一个文件管理助手。你可以执行以下操作：文件创建、删除、随机更新、随机读取。\
         当前项目的文件夹结构如下：\n{}\
         请根据以下用户需求，选择合适的操作并生成操作指令。\
         输出必须严格遵循如下格式：\n\
         操作类型: <创建|删除|随机更新|随机读取>\n\
         文件名: <文件名>\n\
         路径: <文件路径>\n\
         内容:\n\
         <文件内容或操作说明>\n\
         用户需求: {}\n\
         不要输出任何解释或多余文本，只输出指定格式的操作类型、文件名、路径和内容。",
        folder_structure, user_input
    )
}
