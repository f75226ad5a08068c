mod cli;
mod config;
mod messages;
mod ollama_client;

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;
use url::Url;

use crate::cli::chat::ChatContext;
use crate::config::{Config, Palette, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::messages::Locale;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model to chat with
    #[arg(short, long, env = "OLLAMA_CHAT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the Ollama service
    #[arg(short, long, env = "OLLAMA_CHAT_URL", default_value = DEFAULT_BASE_URL)]
    url: Url,

    /// Enable thinking mode (prints a notice only)
    #[arg(short, long)]
    thinking: bool,

    /// Disable streamed replies
    #[arg(long)]
    no_stream: bool,

    /// Classify each message and run file requests automatically
    #[arg(short, long)]
    agent: bool,

    /// Refuse file writes that resolve outside the working directory
    #[arg(long)]
    confine_writes: bool,

    /// Seconds to wait for the server before giving up on a request
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout: u64,

    /// Interface language (zh or en)
    #[arg(long, env = "OLLAMA_CHAT_LANG", default_value = "zh")]
    lang: Locale,

    /// Disable coloured output (also honoured via NO_COLOR)
    #[arg(long)]
    no_color: bool,

    /// Input to send to the chat, then exit
    #[arg(short, long)]
    input: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::new(self.url, self.model);
        config.request_timeout = Duration::from_secs(self.timeout);
        config.stream = !self.no_stream;
        config.thinking = self.thinking;
        config.agent = self.agent;
        config.confine_writes = self.confine_writes;
        config.locale = self.lang;
        if self.no_color || std::env::var_os("NO_COLOR").is_some() {
            config.palette = Palette::plain();
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Ollama Chat CLI");

    let input = cli.input.clone();
    let config = cli.into_config();

    let mut chat_context = ChatContext::new(Box::new(io::stdout()), input, true, config)?;
    chat_context.run().await
}
