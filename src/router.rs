use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{api_key_gate, log_errors},
    routes,
};

async fn health() -> &'static str {
    "ok"
}

// 需要 API Key 的摘要路由
pub fn summarize_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/summarize/text", post(routes::summarize::summarize_text))
        .route("/summarize/url", post(routes::summarize::summarize_url))
        .layer(axum::middleware::from_fn_with_state(
            state.gate.clone(),
            api_key_gate,
        ))
}

// 创建主路由
pub fn create_router(state: AppState, api_base_uri: &str) -> Router {
    let router = Router::new()
        .route("/", get(health))
        .nest(api_base_uri, summarize_routes(&state))
        .layer(axum::middleware::from_fn(log_errors));

    router.with_state(state)
}
