use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use persona_api::{
    app::build_router,
    config::Config,
    persona::Personas,
    state::AppState,
    sweeper::spawn_sweeper,
};
use persona_llm::{ChatClient, OpenAIClient, OpenAIConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration; a missing OPENAI_API_KEY stops startup here
    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Persona Chat API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Load persona prompts
    let personas = Personas::from_config(&config.personas)?;
    tracing::info!(
        persona_a = %personas.a.name,
        persona_b = %personas.b.name,
        "Persona prompts loaded"
    );

    // Initialize LLM client
    tracing::info!("Initializing LLM client (model {})", config.llm.model);
    let llm_config = OpenAIConfig {
        api_key: config.openai_api_key.clone(),
        base_url: config.llm.base_url.clone(),
        timeout_secs: config.llm.timeout_secs,
    };
    let llm_client: Arc<dyn ChatClient> = Arc::new(OpenAIClient::from_config(llm_config)?);

    // Create application state
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, personas, llm_client)?);

    // Background eviction of idle sessions and windows
    spawn_sweeper(Arc::clone(&state));

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
