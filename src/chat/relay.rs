use std::sync::Arc;

use async_trait::async_trait;

use crate::board::models::{Message, Role};
use crate::errors::ChatError;

/// One conversational turn as the completion service sees it: user or
/// model only, never system/meta.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// The external streaming completion service.
///
/// `on_chunk` is called once per incremental text fragment, in order. A
/// transport failure surfaces as an error after whatever chunks already
/// arrived; the stream is never retried or resumed.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn stream_reply(
        &self,
        turns: &[ChatTurn],
        system_instruction: &str,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> anyhow::Result<()>;
}

/// Forwards a spark's transcript plus a new message to the completion
/// service and relays text deltas back to the caller.
pub struct Relay {
    client: Arc<dyn CompletionClient>,
}

impl Relay {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Send one user message against the prior transcript.
    ///
    /// Blank input is refused locally without touching the service. The
    /// prior transcript is filtered to user/model turns (empty model
    /// placeholders dropped), the new message appended as the final user
    /// turn, and each streamed fragment handed to `on_chunk` before being
    /// folded into the returned full text. Any transport failure maps to
    /// [`ChatError::Unavailable`]; delivered chunks stay delivered.
    pub async fn send(
        &self,
        history: &[Message],
        new_message: &str,
        persona_instruction: &str,
        mut on_chunk: impl FnMut(&str) + Send,
    ) -> Result<String, ChatError> {
        let text = new_message.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut turns = conversational_turns(history);
        turns.push(ChatTurn {
            role: Role::User,
            text: text.to_string(),
        });

        let mut full = String::new();
        let mut forward = |chunk: &str| {
            full.push_str(chunk);
            on_chunk(chunk);
        };
        self.client
            .stream_reply(&turns, persona_instruction, &mut forward)
            .await
            .map_err(ChatError::Unavailable)?;
        Ok(full)
    }
}

/// Prior turns the service is allowed to see.
fn conversational_turns(history: &[Message]) -> Vec<ChatTurn> {
    history
        .iter()
        .filter(|m| m.role.is_conversational() && !m.content.is_empty())
        .map(|m| ChatTurn {
            role: m.role.clone(),
            text: m.content.clone(),
        })
        .collect()
}
