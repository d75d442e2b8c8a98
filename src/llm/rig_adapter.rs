//! Bridges rig-core's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel, Message};
use rust_decimal::Decimal;

use crate::error::LlmError;

use super::costs;
use super::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role,
};

/// Default output budget when the caller does not set one. Anthropic rejects
/// requests without `max_tokens`.
const DEFAULT_MAX_TOKENS: u64 = 2048;

/// Adapter owning a rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

/// Split our flat message list into rig's (preamble, history, prompt) shape.
///
/// System messages are joined into the preamble; the last user message is the
/// prompt and earlier user messages become history.
fn split_messages(messages: Vec<ChatMessage>) -> (Option<String>, Vec<ChatMessage>, Option<ChatMessage>) {
    let mut system = Vec::new();
    let mut rest = Vec::new();
    for message in messages {
        match message.role {
            Role::System => system.push(message.content),
            Role::User => rest.push(message),
        }
    }

    let prompt = match rest.last() {
        Some(last) if last.role == Role::User => rest.pop(),
        _ => None,
    };
    let preamble = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (preamble, rest, prompt)
}

/// rig reports usage as u64; saturate rather than wrap.
fn token_count(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn to_rig_message(message: ChatMessage) -> Message {
    Message::user(message.content)
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        costs::model_cost(&self.model_name)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (preamble, history, prompt) = split_messages(request.messages);
        let prompt = prompt.ok_or_else(|| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: "request has no trailing user message".to_string(),
        })?;

        let mut builder = self
            .model
            .completion_request(Message::user(prompt.content))
            .messages(history.into_iter().map(to_rig_message).collect())
            .max_tokens(request.max_tokens.map(u64::from).unwrap_or(DEFAULT_MAX_TOKENS));
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: e.to_string(),
        })?;

        let content = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.model_name.clone(),
                reason: "response contained no text".to_string(),
            });
        }

        Ok(CompletionResponse {
            content,
            input_tokens: token_count(response.usage.input_tokens),
            output_tokens: token_count(response.usage.output_tokens),
        })
    }
}
