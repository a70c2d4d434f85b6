//! Answer generation over an OpenAI-compatible `/chat/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompt::{SYSTEM_PROMPT, build_prompt};
use super::{AnswerGenerator, Citation};
use crate::adapters::http;
use crate::config::AnswerConfig;
use crate::error::{RagError, Result};

#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    http: Client,
}

impl ChatClient {
    pub fn new(config: &AnswerConfig, timeout: Duration) -> Result<Self> {
        let http = http::build_client(timeout).map_err(RagError::Config)?;
        Ok(Self {
            base_url: config.url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AnswerGenerator for ChatClient {
    async fn generate(&self, query: &str, citations: &[Citation]) -> Result<String> {
        let prompt = build_prompt(query, citations);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let url = http::endpoint(&self.base_url, "chat/completions");
        let request = http::bearer(self.http.post(&url).json(&body), self.api_key.as_deref());
        let response: ChatResponse = http::send_json(request)
            .await
            .map_err(RagError::AnswerUnavailable)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| RagError::AnswerUnavailable("empty completion".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
