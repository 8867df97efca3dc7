//! Routing classifier boundary
//!
//! Turns a free-text utterance into raw routing text that
//! [`crate::routing::parse_routing`] can always digest. Backends are
//! swappable behind [`Classifier`]; the stock implementation talks to an
//! OpenAI-compatible chat-completions endpoint (Groq by default).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{Error, Result};

/// System prompt instructing the model to emit `[module, query]` pairs
///
/// The format contract matters more than the wording: a single-line list
/// of two-element single-quoted string lists, one entry per actionable
/// module, filler stripped from queries.
const ROUTING_PROMPT: &str = r"You are the intelligent routing brain of ORION, a voice assistant.

Your job:
1. Understand the user's full intent.
2. Break it into separate actionable commands for the correct MODULES.
3. Remove filler and politeness words (please, can you, orion, hmm, kindly).
4. Simplify overly formal phrasing to short, clean queries.
5. Route each cleaned query to its module. Use CHATBOT at most once.

FORMAT (strict): a single-line list of two-element lists of single-quoted
strings, for example:
[['WEATHER', 'Weather in Karachi'], ['CHATBOT', 'What is the weather in Karachi?']]

Never use JSON, never add commentary, never break the syntax.

MODULES:
- WEATHER - weather queries (uses IP-based location)
- LOCATION - location questions (e.g. 'Where am I?')
- TIME - time and date questions
- SEARCH - real-time info, people, events, facts
- SYSTEM_COMMANDS - app/file/system-level commands
- CUSTOM_SKILL_MUSIC - music playback and control
- CUSTOM_SKILL_HOME - smart home (lights, AC, fan)
- CUSTOM_SKILL_STUDY - notes, Notion, Anki, study tasks
- Exit - the user wants to leave (exit, quit, close orion)
- CHATBOT - general chat, greetings, identity, emotions, unknowns

Filler-only or casual input routes only to CHATBOT. 'exit' or 'quit' adds
an ['Exit', 'Exit'] entry after the other commands.

Now respond in that exact format for this user input:
{user_input}";

/// Converts an utterance into raw routing text
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one utterance
    ///
    /// The returned text is untrusted: callers must run it through the
    /// routing parser and must expect malformed output.
    async fn classify(&self, utterance: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Classifier backed by an OpenAI-compatible chat-completions API
pub struct ChatCompletionsClassifier {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
}

impl ChatCompletionsClassifier {
    /// Create a classifier
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "API key required for the routing classifier".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            temperature,
        })
    }
}

#[async_trait]
impl Classifier for ChatCompletionsClassifier {
    async fn classify(&self, utterance: &str) -> Result<String> {
        let prompt = ROUTING_PROMPT.replace("{user_input}", utterance);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "system", "content": prompt}],
            "temperature": self.temperature,
            "top_p": 1,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Classifier(format!(
                "classifier API error {status}: {body}"
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let raw = completion
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| Error::Classifier("empty completion".to_string()))?;

        tracing::debug!(raw = %raw, "classifier responded");
        Ok(raw)
    }
}
