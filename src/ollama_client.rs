use std::io::Write;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("connection error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no data from the server within {0:?}")]
    Timeout(Duration),

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to write reply: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role/content pair, as sent on the wire and kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [&'a ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// A single decoded line of a streamed `/api/chat` body.
#[derive(Debug, Default, Deserialize)]
struct StreamFragment {
    #[serde(default)]
    message: Option<FragmentMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Default, Deserialize)]
struct FragmentMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: FragmentMessage,
}

pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: Url,
    chat_url: Url,
    tags_url: Url,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaClient {
    pub fn new(
        base_url: &Url,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: base_url.clone(),
            chat_url: api_url(base_url, "api/chat")?,
            tags_url: api_url(base_url, "api/tags")?,
            request_timeout,
            probe_timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns true when `/api/tags` answers with a success status.
    pub async fn check_connection(&self) -> bool {
        match self
            .client
            .get(self.tags_url.clone())
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Connection probe to {} failed: {}", self.tags_url, e);
                false
            }
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let response = self
            .client
            .get(self.tags_url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Single-shot chat request; returns the assistant's reply text.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[&ChatMessage],
    ) -> Result<String, ClientError> {
        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };
        debug!("Sending chat request with {} messages to {}", messages.len(), self.chat_url);

        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            error!("Chat request failed with status {}", response.status());
            return Err(ClientError::Status(response.status()));
        }

        let body = response.text().await?;
        let reply: ChatResponse = serde_json::from_str(&body)?;
        Ok(reply.message.content.unwrap_or_default())
    }

    /// Opens a streaming chat request. The status code is checked before
    /// any of the body is read.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[&ChatMessage],
    ) -> Result<ChatStream, ClientError> {
        let request = ChatRequest {
            model,
            messages,
            stream: true,
        };
        debug!("Opening chat stream with {} messages to {}", messages.len(), self.chat_url);

        let send = self.client.post(self.chat_url.clone()).json(&request).send();
        let response = tokio::time::timeout(self.request_timeout, send)
            .await
            .map_err(|_| ClientError::Timeout(self.request_timeout))??;

        if !response.status().is_success() {
            error!("Chat stream failed with status {}", response.status());
            return Err(ClientError::Status(response.status()));
        }

        Ok(ChatStream {
            response,
            read_timeout: self.request_timeout,
        })
    }
}

/// An accepted streaming response whose body has not been consumed yet.
pub struct ChatStream {
    response: reqwest::Response,
    read_timeout: Duration,
}

impl ChatStream {
    /// Reads the body to completion, echoing every content delta to `sink`.
    pub async fn read_into(self, sink: &mut dyn Write) -> Result<String, ClientError> {
        let body = Box::pin(self.response.bytes_stream());
        read_chat_stream(body, sink, Some(self.read_timeout)).await
    }
}

/// Accumulates the content deltas of a newline-delimited JSON chat stream.
///
/// Bytes are buffered until a full line is available, so an object split
/// across two chunks is decoded once both halves arrive. Lines that do not
/// decode are skipped. Reading stops at the first fragment with `done: true`
/// even if the body has more data.
pub async fn read_chat_stream<S, B>(
    mut stream: S,
    sink: &mut dyn Write,
    read_timeout: Option<Duration>,
) -> Result<String, ClientError>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut full_response = String::new();
    let mut buf: Vec<u8> = Vec::new();

    loop {
        let next = match read_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| ClientError::Timeout(limit))?,
            None => stream.next().await,
        };

        let Some(chunk) = next else {
            break;
        };
        buf.extend_from_slice(chunk?.as_ref());

        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            if consume_line(&line, &mut full_response, sink)? {
                return Ok(full_response);
            }
        }
    }

    // The last line of the body may not be newline-terminated.
    if !buf.is_empty() && consume_line(&buf, &mut full_response, sink)? {
        return Ok(full_response);
    }

    warn!("Chat stream ended without a completion fragment");
    Ok(full_response)
}

/// Handles one physical line. Returns true once the completion flag is seen.
fn consume_line(line: &[u8], acc: &mut String, sink: &mut dyn Write) -> Result<bool, ClientError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(false);
    }

    let fragment: StreamFragment = match serde_json::from_str(line) {
        Ok(fragment) => fragment,
        Err(e) => {
            debug!("Skipping undecodable stream line: {}", e);
            return Ok(false);
        }
    };

    if let Some(content) = fragment.message.and_then(|m| m.content) {
        if !content.is_empty() {
            sink.write_all(content.as_bytes())?;
            sink.flush()?;
            acc.push_str(&content);
        }
    }

    Ok(fragment.done)
}

fn api_url(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{}/{}", base.as_str().trim_end_matches('/'), path))
}
