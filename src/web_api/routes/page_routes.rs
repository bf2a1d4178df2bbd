use crate::{
    live,
    state::SharedState,
    views::{dashboard, home, task_page},
};
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn get_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(home::home))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/dashboard/live", get(live::dashboard_live))
        .route("/task/:id", get(task_page::task_page))
        .route("/task/:id/comments", post(task_page::post_comment))
        .route("/task/:id/comments/:comment_id", delete(task_page::delete_comment))
}
