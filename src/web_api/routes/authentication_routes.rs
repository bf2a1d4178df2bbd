use crate::{auth, state::SharedState};
use axum::{routing::post, Router};

pub const ROUTER_PATH: &str = "/api/auth";

pub fn get_router() -> Router<SharedState> {
    Router::new()
        .route(format!("{}/login", ROUTER_PATH).as_str(), post(auth::login))
        .route(format!("{}/logout", ROUTER_PATH).as_str(), post(auth::logout))
        .route(format!("{}/register", ROUTER_PATH).as_str(), post(auth::register))
}
