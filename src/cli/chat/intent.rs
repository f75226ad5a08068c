use std::fmt;

use regex::Regex;
use tracing::{debug, warn};

use super::prompt::classification_prompt;
use super::session::{Delivery, Session};
use crate::ollama_client::ClientError;

/// Category of a user request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    File,
    Code,
    Other,
}

impl Intent {
    /// Maps a `TYPE:` token to an intent. Anything unknown is `Other`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "file" => Intent::File,
            "code" => Intent::Code,
            "other" => Intent::Other,
            unknown => {
                debug!("Unknown intent token {:?}, treating as other", unknown);
                Intent::Other
            }
        }
    }

    /// Extracts the token following the first `TYPE:` marker in `reply`.
    pub fn from_reply(reply: &str) -> Self {
        let Ok(re) = Regex::new(r"TYPE:\s*(\w+)") else {
            return Intent::Other;
        };
        match re.captures(reply).and_then(|caps| caps.get(1)) {
            Some(token) => Intent::from_token(token.as_str()),
            None => {
                debug!("No TYPE marker in classification reply");
                Intent::Other
            }
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::File => write!(f, "file"),
            Intent::Code => write!(f, "code"),
            Intent::Other => write!(f, "other"),
        }
    }
}

/// Asks the model to classify `user_input`. The exchange goes through the
/// non-streaming path and is recorded in history like any other.
pub async fn classify(session: &mut Session, user_input: &str) -> Result<Intent, ClientError> {
    let prompt = classification_prompt(user_input);
    match session.send_message(&prompt, Delivery::Buffered).await {
        Ok(reply) => Ok(Intent::from_reply(&reply)),
        Err(e) => {
            warn!("Intent classification failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::ollama_client::OllamaClient;

    #[test]
    fn test_from_reply() {
        assert_eq!(Intent::from_reply("TYPE:file"), Intent::File);
        assert_eq!(Intent::from_reply("<think>hmm</think>\nTYPE: CODE"), Intent::Code);
        assert_eq!(Intent::from_reply("TYPE:other"), Intent::Other);
        assert_eq!(Intent::from_reply("TYPE:weather"), Intent::Other);
        assert_eq!(Intent::from_reply("I think this is a file request"), Intent::Other);
    }

    #[tokio::test]
    async fn test_classify_records_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "TYPE:file"},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let client =
            OllamaClient::new(&base, Duration::from_secs(5), Duration::from_secs(1)).unwrap();
        let mut session = Session::new(client, "llama2");

        let intent = classify(&mut session, "create a.txt").await.unwrap();

        assert_eq!(intent, Intent::File);
        assert_eq!(session.history().len(), 2);
        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn test_classify_surfaces_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let client =
            OllamaClient::new(&base, Duration::from_secs(5), Duration::from_secs(1)).unwrap();
        let mut session = Session::new(client, "llama2");

        assert!(classify(&mut session, "hello").await.is_err());
        assert!(session.history().is_empty());
    }
}
