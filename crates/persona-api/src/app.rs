use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    docs::ApiDoc,
    middleware::logging,
    routes::{chat, health},
    state::AppState,
};

/// Slack between the chat handler's own deadline and the router timeout,
/// so handlers answer with a JSON error before the layer cuts them off
const ROUTER_TIMEOUT_GRACE_SECS: u64 = 5;

pub fn build_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(
        state.config.server.request_timeout_secs + ROUTER_TIMEOUT_GRACE_SECS,
    );

    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Personas
        .route("/persona-a-chat", post(chat::persona_a_chat))
        .route("/persona-b-chat", post(chat::persona_b_chat));

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&state.config))
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout))
                .layer(middleware::from_fn(logging::log_request)),
        )
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}
