use super::HeaderView;
use crate::auth::Session;
use crate::state::SharedState;
use crate::store::{Counts, Store};
use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub header: HeaderView,
    pub tasks: usize,
    pub comments: usize,
}

/// Collection counts, recomputed at most once per revalidation interval.
pub struct HomeStats {
    revalidate: Duration,
    cached: Mutex<Option<(Instant, Counts)>>,
}

impl HomeStats {
    pub fn new(revalidate: Duration) -> Self {
        HomeStats { revalidate, cached: Mutex::new(None) }
    }

    pub fn get(&self, store: &Store) -> Counts {
        self.get_at(store, Instant::now())
    }

    fn get_at(&self, store: &Store, now: Instant) -> Counts {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        match *cached {
            Some((at, counts)) if now.saturating_duration_since(at) < self.revalidate => counts,
            _ => {
                let counts = store.counts();
                tracing::debug!(tasks = counts.tasks, comments = counts.comments, "home counts revalidated");
                *cached = Some((now, counts));
                counts
            }
        }
    }
}

// GET /
pub async fn home(
    State(state): State<SharedState>,
    session: Option<Extension<Session>>,
) -> Json<HomeView> {
    let counts = state.home.get(&state.store);
    Json(HomeView {
        header: HeaderView::new(session.as_deref()),
        tasks: counts.tasks,
        comments: counts.comments,
    })
}
