use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use persona_llm::{ChatRequest, Message};

use crate::{
    error::{ApiError, ApiResult},
    extract::ClientIp,
    persona::Persona,
    state::AppState,
};

/// Chat request body as documented; handlers read it leniently
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageRequest {
    pub message: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    pub reply: String,
}

/// Validated chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInput {
    pub message: String,
    pub session_id: String,
}

impl ChatInput {
    /// `message` is checked before `sessionId`; both must be non-empty strings
    pub fn from_body(body: &Value) -> ApiResult<Self> {
        let message = non_empty_str(body, "message")
            .ok_or_else(|| ApiError::BadRequest("Message is required".to_string()))?;
        let session_id = session_hint(body)
            .ok_or_else(|| ApiError::BadRequest("sessionId is required".to_string()))?;

        Ok(Self {
            message: message.to_string(),
            session_id: session_id.to_string(),
        })
    }
}

/// Session id as sent, before validation; used to key the session limiter
pub fn session_hint(body: &Value) -> Option<&str> {
    non_empty_str(body, "sessionId")
}

fn non_empty_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Chat with persona A
#[utoipa::path(
    post,
    path = "/persona-a-chat",
    request_body = ChatMessageRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatReply),
        (status = 400, description = "Missing message or sessionId", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ErrorBody),
        (status = 500, description = "Completion failed", body = crate::error::ErrorBody)
    ),
    tag = "chat"
)]
pub async fn persona_a_chat(
    State(state): State<Arc<AppState>>,
    client_ip: ClientIp,
    payload: Option<Json<Value>>,
) -> ApiResult<Json<ChatReply>> {
    let persona = Arc::clone(&state.personas.a);
    handle_chat(state, persona, client_ip, payload).await
}

/// Chat with persona B
#[utoipa::path(
    post,
    path = "/persona-b-chat",
    request_body = ChatMessageRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatReply),
        (status = 400, description = "Missing message or sessionId", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ErrorBody),
        (status = 500, description = "Completion failed", body = crate::error::ErrorBody)
    ),
    tag = "chat"
)]
pub async fn persona_b_chat(
    State(state): State<Arc<AppState>>,
    client_ip: ClientIp,
    payload: Option<Json<Value>>,
) -> ApiResult<Json<ChatReply>> {
    let persona = Arc::clone(&state.personas.b);
    handle_chat(state, persona, client_ip, payload).await
}

/// Shared chat flow for both personas
///
/// History is written only after the completion succeeds, and then as one
/// user/assistant pair.
pub async fn handle_chat(
    state: Arc<AppState>,
    persona: Arc<Persona>,
    ClientIp(ip): ClientIp,
    payload: Option<Json<Value>>,
) -> ApiResult<Json<ChatReply>> {
    let body = payload.map(|Json(body)| body).unwrap_or(Value::Null);

    // 1. Admission, keyed on the raw session id
    state.rate_limiter.check(ip, session_hint(&body))?;

    // 2. Validate
    let input = ChatInput::from_body(&body)?;

    // 3. Build the prompt from the persona and prior turns
    let messages = state
        .context
        .build(&persona.system_prompt, &input.session_id, &input.message);
    let history_len = messages.len().saturating_sub(2);

    // 4. Complete, bounded by the completion deadline
    let request = ChatRequest::new(state.config.llm.model.clone(), messages)
        .with_options(state.chat_options());
    let deadline = state.completion_timeout();
    let response = tokio::time::timeout(deadline, state.llm_client.chat(request))
        .await
        .map_err(|_| {
            ApiError::Upstream(anyhow::anyhow!(
                "completion timed out after {}s",
                deadline.as_secs()
            ))
        })?
        .map_err(ApiError::Upstream)?;
    let finish_reason = response.finish_reason.unwrap_or_default();
    let total_tokens = response.usage.map(|u| u.total_tokens).unwrap_or_default();
    let reply = response.content.unwrap_or_default();

    // 5. Record the exchange
    state.history.append_exchange(
        &input.session_id,
        Message::human(input.message),
        Message::ai(reply.clone()),
    );

    tracing::info!(
        persona = %persona.name,
        session_id = %input.session_id,
        history_len,
        reply_len = reply.len(),
        total_tokens,
        finish_reason = %finish_reason,
        "Chat completed"
    );

    Ok(Json(ChatReply { reply }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bad_request_message(body: Value) -> String {
        match ChatInput::from_body(&body) {
            Err(ApiError::BadRequest(message)) => message,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_input() {
        let input = ChatInput::from_body(&json!({"message": "hi", "sessionId": "s1"})).unwrap();
        assert_eq!(input.message, "hi");
        assert_eq!(input.session_id, "s1");
    }

    #[test]
    fn test_message_checked_first() {
        assert_eq!(bad_request_message(json!({})), "Message is required");
        assert_eq!(bad_request_message(Value::Null), "Message is required");
        assert_eq!(bad_request_message(json!({"message": "hi"})), "sessionId is required");
    }

    #[test]
    fn test_empty_and_non_string_fields() {
        assert_eq!(
            bad_request_message(json!({"message": "", "sessionId": "s1"})),
            "Message is required"
        );
        assert_eq!(
            bad_request_message(json!({"message": 42, "sessionId": "s1"})),
            "Message is required"
        );
        assert_eq!(
            bad_request_message(json!({"message": "hi", "sessionId": ""})),
            "sessionId is required"
        );
        assert_eq!(
            bad_request_message(json!({"message": "hi", "sessionId": 7})),
            "sessionId is required"
        );
    }

    #[test]
    fn test_session_hint() {
        assert_eq!(session_hint(&json!({"sessionId": "s1"})), Some("s1"));
        assert_eq!(session_hint(&json!({"sessionId": ""})), None);
        assert_eq!(session_hint(&json!(["sessionId"])), None);
    }
}
