use crate::state::SharedState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

pub const ROUTER_PATH: &str = "/health";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub revision: u64,
    pub subscribers: usize,
}

pub fn get_router() -> Router<SharedState> {
    Router::new().route(ROUTER_PATH, get(check_status))
}

async fn check_status(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        revision: state.store.revision(),
        subscribers: state.store.subscriber_count(),
    })
}
