pub mod authentication_routes;
pub mod health_routes;
pub mod page_routes;

use crate::{auth::resolve_session, state::SharedState};
use axum::{middleware, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// The whole application: pages, auth, health, then static files.
pub fn map_routes(state: SharedState) -> Router {
    let static_files = ServeDir::new(&state.settings.static_dir).append_index_html_on_directories(true);

    Router::new()
        .merge(page_routes::get_router())
        .merge(authentication_routes::get_router())
        .merge(health_routes::get_router())
        .fallback_service(static_files)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
