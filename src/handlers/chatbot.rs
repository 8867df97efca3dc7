//! CHATBOT: conversational reply engine
//!
//! Chat-completions call with a rolling JSON history file so the
//! assistant remembers earlier turns. The dispatcher injects buffered
//! pass-1 results into the query before this handler ever sees it.

use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::dispatch::Handler;
use crate::{Error, Result};

/// System prompt for the conversational model
const CHAT_PROMPT: &str = "You are ORION, a concise and friendly voice assistant. \
Answers are spoken aloud, so keep them short, natural, and free of markup. \
When the user message includes results already gathered by other modules, \
weave them into the answer instead of repeating them verbatim.";

/// Cap on stored history entries; oldest turns are dropped beyond this
const MAX_HISTORY_ENTRIES: usize = 200;

/// One stored chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatTurn {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatTurnOut,
}

#[derive(Deserialize)]
struct ChatTurnOut {
    content: String,
}

/// Conversational handler
pub struct ChatHandler {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
    history_path: PathBuf,
}

impl ChatHandler {
    /// Create the chat handler
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        temperature: f32,
        history_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "API key required for the chat handler".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            temperature,
            history_path: history_path.into(),
        })
    }

    /// Load stored history; corruption degrades to an empty history
    fn load_history(&self) -> Vec<ChatTurn> {
        match std::fs::read_to_string(&self.history_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %self.history_path.display(),
                    error = %e,
                    "chat history unreadable, starting fresh"
                );
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    /// Append a user/assistant exchange and persist
    fn log_exchange(&self, query: &str, reply: &str) {
        let mut history = self.load_history();
        history.push(ChatTurn {
            role: "user".to_string(),
            content: query.to_string(),
        });
        history.push(ChatTurn {
            role: "assistant".to_string(),
            content: reply.to_string(),
        });

        if history.len() > MAX_HISTORY_ENTRIES {
            let excess = history.len() - MAX_HISTORY_ENTRIES;
            history.drain(..excess);
        }

        let result = serde_json::to_string_pretty(&history)
            .map_err(Error::from)
            .and_then(|json| {
                if let Some(dir) = self.history_path.parent() {
                    std::fs::create_dir_all(dir)?;
                }
                std::fs::write(&self.history_path, json).map_err(Error::from)
            });
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist chat history");
        }
    }
}

#[async_trait]
impl Handler for ChatHandler {
    async fn handle(&self, query: &str) -> Result<String> {
        let mut messages = vec![ChatTurn {
            role: "system".to_string(),
            content: CHAT_PROMPT.to_string(),
        }];
        messages.extend(self.load_history());
        messages.push(ChatTurn {
            role: "user".to_string(),
            content: query.to_string(),
        });

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
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
            return Err(Error::Handler(format!("chat API error {status}: {body}")));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let reply = completion
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| Error::Handler("empty chat completion".to_string()))?;

        self.log_exchange(query, &reply);
        Ok(reply)
    }
}
