use std::io::Write;

use tracing::debug;
use url::Url;

use super::conversation_state::ConversationState;
use crate::ollama_client::{ChatMessage, ClientError, OllamaClient};

/// How a reply is delivered back to the caller.
pub enum Delivery<'a> {
    /// Wait for the whole reply.
    Buffered,
    /// Echo deltas to `sink` as they arrive, after writing `label` once the
    /// server has accepted the request.
    Streamed {
        sink: &'a mut dyn Write,
        label: &'a str,
    },
}

/// The endpoint, active model and history of one interactive run.
pub struct Session {
    client: OllamaClient,
    model: String,
    history: ConversationState,
}

impl Session {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            history: ConversationState::new(),
        }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    pub fn endpoint(&self) -> &Url {
        self.client.endpoint()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn history(&self) -> &ConversationState {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Sends `message` after the full history. On success the user turn and
    /// the reply are appended to history; on failure history is untouched.
    pub async fn send_message(
        &mut self,
        message: &str,
        delivery: Delivery<'_>,
    ) -> Result<String, ClientError> {
        let turn = ChatMessage::user(message);
        let messages: Vec<&ChatMessage> = self
            .history
            .get_messages()
            .iter()
            .chain(std::iter::once(&turn))
            .collect();

        let reply = match delivery {
            Delivery::Buffered => self.client.chat(&self.model, &messages).await?,
            Delivery::Streamed { sink, label } => {
                let stream = self.client.chat_stream(&self.model, &messages).await?;
                sink.write_all(label.as_bytes())?;
                sink.flush()?;
                let reply = stream.read_into(&mut *sink).await;
                writeln!(sink)?;
                reply?
            }
        };

        debug!(
            "Received reply of {} bytes from {} ({} turns of history)",
            reply.len(),
            self.model,
            self.history.len()
        );
        self.history.record_exchange(message, &reply);
        Ok(reply)
    }
}
