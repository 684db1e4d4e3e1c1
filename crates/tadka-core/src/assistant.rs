//! Cooking assistant chat endpoint.

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ASSISTANT_CHAT_PATH: &str = "/api/assistant/chat/";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Clone)]
pub struct AssistantClient {
    gateway: Gateway,
}

impl AssistantClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Ask the assistant and return its reply text.
    ///
    /// A 2xx without `"status": "success"` and a non-empty `response` counts
    /// as malformed.
    pub async fn ask(&self, query: &str) -> GatewayResult<String> {
        let query = query.trim();
        let reply: ChatResponse = self
            .gateway
            .post(ASSISTANT_CHAT_PATH, &ChatRequest { query })
            .await?;
        debug!(status = ?reply.status, "Assistant replied");
        match reply {
            ChatResponse {
                status: Some(status),
                response: Some(text),
                ..
            } if status == "success" && !text.trim().is_empty() => Ok(text),
            ChatResponse { message, .. } => Err(GatewayError::MalformedResponse(
                message.unwrap_or_else(|| "assistant returned no reply".to_string()),
            )),
        }
    }
}
