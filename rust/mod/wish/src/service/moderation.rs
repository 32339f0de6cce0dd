//! Content moderation collaborator.
//!
//! Wishes and comments are screened before they are stored. The real
//! screening is delegated to an external chat-completion model; the
//! service only sees a yes/no verdict.

use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::service::WishError;

/// Decides whether user-supplied text violates the wall's content rules.
pub trait ContentModerator: Send + Sync + 'static {
    /// Returns `Ok(true)` if `content` is violating.
    fn check(&self, content: &str) -> Result<bool, WishError>;
}

/// Accepts everything. Used when moderation is disabled and in tests.
pub struct AllowAllModerator;

impl ContentModerator for AllowAllModerator {
    fn check(&self, _content: &str) -> Result<bool, WishError> {
        Ok(false)
    }
}

/// Offline screening against a fixed list of words (case-insensitive).
pub struct DenyListModerator {
    words: Vec<String>,
}

impl DenyListModerator {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }
}

impl ContentModerator for DenyListModerator {
    fn check(&self, content: &str) -> Result<bool, WishError> {
        let lower = content.to_lowercase();
        Ok(self.words.iter().any(|w| lower.contains(w.as_str())))
    }
}

const SYSTEM_PROMPT: &str = "You are a content moderator for a public wish wall. \
Reply with exactly one word: UNSAFE if the user's text contains abuse, harassment, \
sexual content, violence, illegal content, spam or personal data; otherwise SAFE.";

/// Settings for [`HttpModerator`].
#[derive(Debug, Clone)]
pub struct HttpModeratorConfig {
    /// Full URL of an OpenAI-compatible `/chat/completions` endpoint.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// Moderation through an OpenAI-compatible chat completion API.
///
/// Uses the blocking client: callers run on a blocking worker thread,
/// never on the async executor.
pub struct HttpModerator {
    config: HttpModeratorConfig,
    client: OnceLock<reqwest::blocking::Client>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

impl HttpModerator {
    pub fn new(config: HttpModeratorConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
        }
    }

    // Built on first use so construction never happens inside the runtime.
    fn client(&self) -> Result<&reqwest::blocking::Client, WishError> {
        if let Some(c) = self.client.get() {
            return Ok(c);
        }
        let built = reqwest::blocking::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| WishError::Upstream(format!("moderation client: {e}")))?;
        Ok(self.client.get_or_init(|| built))
    }
}

impl ContentModerator for HttpModerator {
    fn check(&self, content: &str) -> Result<bool, WishError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
            temperature: 0.0,
        };

        let resp = self
            .client()?
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                warn!(error = %e, "moderation request failed");
                WishError::Upstream(format!("moderation request: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "moderation endpoint returned an error");
            return Err(WishError::Upstream(format!("moderation status {status}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| WishError::Upstream(format!("moderation response: {e}")))?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| WishError::Upstream("moderation response has no choices".into()))?;

        let violating = parse_verdict(&reply)?;
        debug!(violating, "moderation verdict");
        Ok(violating)
    }
}

/// Interpret the model's one-word answer.
fn parse_verdict(reply: &str) -> Result<bool, WishError> {
    let verdict = reply.trim().trim_matches(|c: char| !c.is_alphanumeric()).to_uppercase();
    if verdict.starts_with("UNSAFE") {
        Ok(true)
    } else if verdict.starts_with("SAFE") {
        Ok(false)
    } else {
        Err(WishError::Upstream(format!("unexpected moderation verdict: {reply}")))
    }
}
