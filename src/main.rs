use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imitation_game::{
    auth, llm, server, state::AppState, store::SharedStore, types::GameConfig,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imitation_game=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Imitation Game...");

    let config = GameConfig::from_env();
    let auth_config = Arc::new(auth::AuthConfig::from_env());

    // Initialize LLM providers
    let llm_config = llm::LlmConfig::from_env();
    let llm_manager = match llm_config.build_manager() {
        Ok(manager) => {
            tracing::info!("LLM providers initialized successfully");
            Some(manager)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize LLM providers: {}. AI replies will fall back to an error notice.",
                e
            );
            None
        }
    };

    let store = match &config.state_file {
        Some(path) => SharedStore::open(path).await,
        None => {
            tracing::info!("STATE_FILE is empty, keeping the session in memory only");
            SharedStore::in_memory()
        }
    };

    let port = config.port;
    let state = Arc::new(AppState::with_store(
        Arc::new(store),
        llm_manager,
        llm_config,
        config,
    ));

    // A prompt left unanswered by the last run gets its replies now
    state.resume_pending_cycle().await;

    let app = server::build_router(state, auth_config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
