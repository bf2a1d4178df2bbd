use crate::settings::Settings;
use crate::store::Store;
use crate::views::home::HomeStats;
use std::sync::Arc;

// ── Shared state ───────────────────────────────────────────────

pub struct AppState {
    pub store: Store,
    pub settings: Settings,
    pub home: HomeStats,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(store: Store, settings: Settings) -> SharedState {
        let home = HomeStats::new(settings.home_revalidate());
        Arc::new(AppState { store, settings, home })
    }
}
