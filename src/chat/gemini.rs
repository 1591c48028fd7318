use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;

use crate::board::models::Role;

use super::relay::{ChatTurn, CompletionClient};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Model used when the configuration names none.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// ── Wire types ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn turn(turn: &ChatTurn) -> Self {
        let role = match turn.role {
            Role::Model => "model",
            _ => "user",
        };
        Self {
            role: Some(role),
            parts: vec![Part {
                text: turn.text.clone(),
            }],
        }
    }

    fn instruction(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

// ── Client ────────────────────────────────────────────────────────────

/// [`CompletionClient`] over the Gemini generative-language API, using the
/// `streamGenerateContent` endpoint with SSE framing.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:streamGenerateContent?alt=sse",
            GEMINI_API_BASE, self.model
        )
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn stream_reply(
        &self,
        turns: &[ChatTurn],
        system_instruction: &str,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> anyhow::Result<()> {
        let body = GenerateRequest {
            contents: turns.iter().map(Content::turn).collect(),
            system_instruction: Content::instruction(system_instruction),
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach the Gemini API")?
            .error_for_status()
            .context("Gemini API rejected the request")?;

        // SSE frames arrive as `data: {json}` lines; a network chunk can
        // split a line, so carry the tail over between chunks.
        let mut stream = resp.bytes_stream();
        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.context("Gemini stream interrupted")?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);
                if let Some(text) = parse_sse_line(&line) {
                    on_chunk(&text);
                }
            }
        }
        if let Some(text) = parse_sse_line(buffer.trim_end()) {
            on_chunk(&text);
        }
        Ok(())
    }
}

/// Extract the text delta from one SSE line, if it carries one.
///
/// Non-data lines (blanks, comments, the `[DONE]` sentinel) and frames
/// without candidate text yield `None`.
fn parse_sse_line(line: &str) -> Option<String> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    let value: Value = serde_json::from_str(payload).ok()?;
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() { None } else { Some(text) }
}
