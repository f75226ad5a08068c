pub mod command;
pub mod context;
pub mod conversation_state;
pub mod intent;
pub mod parse;
pub mod prompt;
pub mod session;
pub mod tools;

use std::future::Future;
use std::io::Write;
use std::process::ExitCode;

use command::Command;
use context::ContextManager;
use eyre::Result;
use futures::future::{self, BoxFuture};
use intent::Intent;
use parse::{RegexReplyParser, ReplyParser};
use prompt::generate_prompt;
use rustyline::error::ReadlineError;
use session::{Delivery, Session};
use tools::{FileExecutor, FileOpError, FileOutcome};
use tracing::{debug, info};

use crate::config::{Config, Tone};
use crate::messages::{Messages, Msg};
use crate::ollama_client::{ClientError, OllamaClient};

const RULE_WIDTH: usize = 50;

/// Whether the loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// How a single request to the model ended.
enum Reply {
    Answered(String),
    /// The failure has already been reported.
    Failed,
    /// Ctrl-C arrived before the reply was complete.
    Interrupted,
}

/// Resolves once the user presses Ctrl-C.
fn ctrl_c() -> BoxFuture<'static, ()> {
    Box::pin(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            debug!("Cannot listen for Ctrl-C: {}", e);
            future::pending::<()>().await;
        }
    })
}

/// Runs `work` unless `interrupt` fires first, in which case `work` is dropped.
async fn until_interrupted<F>(work: F, interrupt: BoxFuture<'static, ()>) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = interrupt => None,
    }
}

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    config: Config,
    messages: Messages,
    session: Session,
    context_manager: ContextManager,
    parser: Box<dyn ReplyParser>,
    interrupt: fn() -> BoxFuture<'static, ()>,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        config: Config,
    ) -> Result<Self> {
        let client =
            OllamaClient::new(&config.base_url, config.request_timeout, config.probe_timeout)?;
        let session = Session::new(client, config.model.clone());

        Ok(Self {
            output,
            input,
            interactive,
            messages: config.messages(),
            session,
            context_manager: ContextManager::new(),
            parser: Box::new(RegexReplyParser::new()?),
            interrupt: ctrl_c,
            config,
        })
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        self.print_welcome()?;

        if !self.session.client().check_connection().await {
            self.say(Tone::Error, self.messages.get(Msg::ConnectFailed))?;
            self.say(Tone::System, self.messages.get(Msg::ConnectHint))?;
            return Ok(ExitCode::FAILURE);
        }
        info!("Connected to {}", self.session.endpoint());

        self.resolve_model().await?;

        if self.config.thinking {
            self.say(Tone::System, self.messages.get(Msg::ThinkingEnabled))?;
        }
        if self.config.agent {
            self.say(Tone::System, self.messages.get(Msg::AgentEnabled))?;
        }

        // Handle non-interactive mode (single query)
        if let Some(input) = self.input.take() {
            self.handle_input(&input).await?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            writeln!(self.output)?;
            self.say(Tone::System, self.messages.get(Msg::HelpHint))?;
            self.say(Tone::System, self.messages.get(Msg::ExitHint))?;
            writeln!(self.output, "{}", "-".repeat(RULE_WIDTH))?;
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", self.messages.get(Msg::Banner))?;
        writeln!(self.output, "{}", "=".repeat(RULE_WIDTH))?;
        Ok(())
    }

    fn say(&mut self, tone: Tone, text: &str) -> Result<()> {
        writeln!(self.output, "{}", self.config.palette.paint(tone, text))?;
        Ok(())
    }

    /// Falls back to the first installed model when the requested one is missing.
    async fn resolve_model(&mut self) -> Result<()> {
        let models = match self.session.client().list_models().await {
            Ok(models) => models,
            Err(e) => {
                let text = self.messages.format(Msg::ModelListFailed, &[&e]);
                return self.say(Tone::Error, &text);
            }
        };

        if models.is_empty() {
            self.say(Tone::System, self.messages.get(Msg::NoModels))?;
            return self.say(Tone::System, self.messages.get(Msg::PullHint));
        }

        let text = self.messages.format(Msg::Connected, &[&models.join(", ")]);
        self.say(Tone::System, &text)?;

        if !models.iter().any(|m| m == self.session.model()) {
            let text = self
                .messages
                .format(Msg::ModelFallback, &[&self.session.model(), &models[0]]);
            self.say(Tone::System, &text)?;
            self.session.set_model(models[0].clone());
        }

        let text = self.messages.format(Msg::CurrentModel, &[&self.session.model()]);
        self.say(Tone::System, &text)
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;
        let user_prompt = self
            .config
            .palette
            .paint(Tone::User, self.messages.get(Msg::UserPrompt));
        let prompt_text = generate_prompt(Some(&user_prompt));

        loop {
            writeln!(self.output)?;
            match rl.readline(&prompt_text) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if self.handle_line(&line).await? == Flow::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    writeln!(self.output)?;
                    self.say(Tone::System, self.messages.get(Msg::Farewell))?;
                    break;
                }
                Err(e) => {
                    let text = self.messages.format(Msg::RequestError, &[&e]);
                    self.say(Tone::Error, &text)?;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Like [`Self::handle_input`], but a failed turn is reported and the loop goes on.
    async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match self.handle_input(line).await {
            Ok(flow) => Ok(flow),
            Err(e) => {
                let text = self.messages.format(Msg::RequestError, &[&e]);
                self.say(Tone::Error, &text)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn handle_input(&mut self, input: &str) -> Result<Flow> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Flow::Continue);
        }

        match Command::parse(input) {
            Some(Command::Exit) => {
                self.say(Tone::System, self.messages.get(Msg::Farewell))?;
                return Ok(Flow::Quit);
            }
            Some(Command::Help) => {
                writeln!(self.output, "{}", self.messages.get(Msg::Help))?;
            }
            Some(Command::Clear) => {
                debug!("Dropping {} messages of history", self.session.history().len());
                self.session.clear_history();
                self.say(Tone::System, self.messages.get(Msg::HistoryCleared))?;
            }
            Some(Command::Models) => self.list_models().await?,
            Some(Command::Model(Some(name))) => self.switch_model(&name).await?,
            Some(Command::Model(None)) => {
                let text = self.messages.format(Msg::CurrentModel, &[&self.session.model()]);
                self.say(Tone::System, &text)?;
            }
            Some(Command::File(Some(request))) => return self.run_file_request(&request).await,
            Some(Command::File(None)) => {
                self.say(Tone::System, self.messages.get(Msg::FileUsage))?;
            }
            Some(Command::Unknown(command)) => {
                debug!("Unknown command: {}", command);
                self.say(Tone::Error, self.messages.get(Msg::UnknownCommand))?;
            }
            None => return self.process_chat_input(input).await,
        }

        Ok(Flow::Continue)
    }

    async fn list_models(&mut self) -> Result<()> {
        match self.session.client().list_models().await {
            Ok(models) => {
                let text = self.messages.format(Msg::AvailableModels, &[&models.join(", ")]);
                self.say(Tone::System, &text)
            }
            Err(e) => {
                let text = self.messages.format(Msg::ModelListFailed, &[&e]);
                self.say(Tone::Error, &text)
            }
        }
    }

    async fn switch_model(&mut self, name: &str) -> Result<()> {
        let models = match self.session.client().list_models().await {
            Ok(models) => models,
            Err(e) => {
                let text = self.messages.format(Msg::ModelListFailed, &[&e]);
                return self.say(Tone::Error, &text);
            }
        };

        if models.iter().any(|m| m == name) {
            self.session.set_model(name);
            let text = self.messages.format(Msg::SwitchedModel, &[&name]);
            self.say(Tone::System, &text)
        } else {
            let text = self
                .messages
                .format(Msg::ModelUnavailable, &[&name, &models.join(", ")]);
            self.say(Tone::Error, &text)
        }
    }

    async fn process_chat_input(&mut self, input: &str) -> Result<Flow> {
        if self.config.agent {
            let classified = until_interrupted(
                intent::classify(&mut self.session, input),
                (self.interrupt)(),
            )
            .await;

            match classified {
                Some(Ok(intent)) => {
                    let text = self.messages.format(Msg::IntentDetected, &[&intent]);
                    self.say(Tone::System, &text)?;
                    if intent == Intent::File {
                        return self.run_file_request(input).await;
                    }
                }
                Some(Err(e)) => {
                    self.report_request_error(&e)?;
                    return Ok(Flow::Continue);
                }
                None => return self.interrupted(),
            }
        }

        match self.exchange(input).await? {
            Reply::Interrupted => self.interrupted(),
            Reply::Answered(_) | Reply::Failed => Ok(Flow::Continue),
        }
    }

    /// Sends one turn and shows the reply.
    async fn exchange(&mut self, text: &str) -> Result<Reply> {
        let label = self
            .config
            .palette
            .paint(Tone::Assistant, self.messages.get(Msg::AssistantLabel));
        let interrupt = (self.interrupt)();

        let outcome = if self.config.stream {
            let delivery = Delivery::Streamed {
                sink: &mut *self.output,
                label: &label,
            };
            until_interrupted(self.session.send_message(text, delivery), interrupt).await
        } else {
            let outcome =
                until_interrupted(self.session.send_message(text, Delivery::Buffered), interrupt)
                    .await;
            if let Some(Ok(reply)) = &outcome {
                writeln!(self.output, "{}{}", label, reply)?;
            }
            outcome
        };

        match outcome {
            Some(Ok(reply)) => Ok(Reply::Answered(reply)),
            Some(Err(e)) => {
                self.report_request_error(&e)?;
                Ok(Reply::Failed)
            }
            None => Ok(Reply::Interrupted),
        }
    }

    /// An interrupted request leaves history as it was and ends the session.
    fn interrupted(&mut self) -> Result<Flow> {
        info!("Request interrupted");
        writeln!(self.output)?;
        self.say(Tone::System, self.messages.get(Msg::Farewell))?;
        Ok(Flow::Quit)
    }

    fn report_request_error(&mut self, error: &ClientError) -> Result<()> {
        let text = self.messages.format(Msg::RequestError, &[error]);
        self.say(Tone::Error, &text)?;
        self.say(Tone::Error, self.messages.get(Msg::ReplyFailed))
    }

    /// Snapshot the working directory, ask the model for a directive, then
    /// parse and execute it.
    async fn run_file_request(&mut self, request: &str) -> Result<Flow> {
        let listing = match self.context_manager.folder_structure() {
            Ok(listing) => listing,
            Err(e) => {
                let text = self.messages.format(Msg::SnapshotFailed, &[&e]);
                self.say(Tone::Error, &text)?;
                return Ok(Flow::Continue);
            }
        };

        let file_prompt = prompt::file_operation_prompt(&listing, request);
        let reply = match self.exchange(&file_prompt).await? {
            Reply::Answered(reply) => reply,
            Reply::Failed => return Ok(Flow::Continue),
            Reply::Interrupted => return self.interrupted(),
        };

        let executor =
            FileExecutor::new(&self.context_manager.current_dir, self.config.confine_writes);
        match tools::apply_reply(self.parser.as_ref(), &executor, &reply) {
            Ok(FileOutcome::Created(path)) => {
                let text = self.messages.format(Msg::FileCreated, &[&path.display()]);
                self.say(Tone::System, &text)?;
            }
            Ok(FileOutcome::NotExecuted { operation, target }) => {
                let text = self
                    .messages
                    .format(Msg::FileOpNotExecuted, &[&operation, &target.display()]);
                self.say(Tone::System, &text)?;
            }
            Err(FileOpError::Parse(_)) => {
                self.say(Tone::Error, self.messages.get(Msg::NoValidOutput))?;
            }
            Err(e) => {
                let text = self.messages.format(Msg::FileOpFailed, &[&e]);
                self.say(Tone::Error, &text)?;
            }
        }

        Ok(Flow::Continue)
    }
}
