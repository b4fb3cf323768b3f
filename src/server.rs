use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{api, auth, state::AppState, ws};

/// Assemble the HTTP surface: WebSocket, operator page, state API and static files
pub fn build_router(state: Arc<AppState>, auth_config: Arc<auth::AuthConfig>) -> Router {
    // Protected operator page and socket (with HTTP Basic Auth)
    let operator_routes = Router::new()
        .route("/operator.html", get(auth::serve_operator))
        .route("/ws/operator", get(ws::ws_operator_handler))
        .layer(middleware::from_fn_with_state(
            auth_config.clone(),
            auth::operator_auth_middleware,
        ));

    // Export/import expose the hidden identities, so they sit behind the same auth
    let api_routes = Router::new()
        .route("/api/state/export", get(api::export_state))
        .route("/api/state/import", post(api::import_state))
        .layer(middleware::from_fn_with_state(
            auth_config.clone(),
            auth::operator_auth_middleware,
        ));

    // Operator connections need credentials, guesser connections do not
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(
            auth_config,
            auth::operator_ws_auth_middleware,
        ));

    Router::new()
        .route("/health", get(api::health))
        .merge(ws_routes)
        .merge(operator_routes)
        .merge(api_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
