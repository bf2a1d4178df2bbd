use next_tasks::{auth, map_routes, settings::Settings, state::AppState, store::Store};
use std::error::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    // ── Settings ───────────────────────────────────────────────
    let settings = Settings::load()?;

    // ── Boot the store ─────────────────────────────────────────
    let store = Store::open(&settings.database_path, settings.event_channel_capacity)?;

    if auth::ensure_default_user(&store, &settings.default_user)? {
        tracing::info!(email = %settings.default_user.email, "created default user");
    }

    let counts = store.counts();
    tracing::info!(
        tasks = counts.tasks,
        comments = counts.comments,
        revision = store.revision(),
        "store loaded"
    );

    // ── Shared state + router ──────────────────────────────────
    let addr = settings.bind_address();
    let state = AppState::new(store, settings);
    let app = map_routes(state);

    // ── Start ──────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server running");
    tracing::info!("  Dashboard WS: ws://{addr}/dashboard/live");
    tracing::info!("  Login:        POST http://{addr}/api/auth/login");

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter));

    // The filter sits on the fmt layer only; tokio-console reads runtime spans.
    #[cfg(feature = "profile-console")]
    let registry = registry.with(console_subscriber::spawn());

    registry.init();
}
