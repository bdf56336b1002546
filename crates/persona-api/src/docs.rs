use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::routes::{chat, health};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        chat::persona_a_chat,
        chat::persona_b_chat,
    ),
    components(schemas(
        chat::ChatMessageRequest,
        chat::ChatReply,
        health::HealthResponse,
        ErrorBody,
    )),
    tags(
        (name = "chat", description = "Persona conversations"),
        (name = "health", description = "Liveness"),
    ),
    info(title = "Persona Chat API")
)]
pub struct ApiDoc;
