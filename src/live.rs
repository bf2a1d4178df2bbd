//! Live dashboard over WebSocket.
//!
//! JSON text frames, tagged by `type`:
//! - Client sends: `submit {body, public}`, `delete {id}`, `share {id}`
//! - Server sends: `view {..DashboardView}` after the initial snapshot, after
//!   each action and after each subscription snapshot; `error {message}` for
//!   frames it cannot decode.
//!
//! One socket hosts one `Dashboard` bound to one session. The subscription
//! is dropped with the socket.

use crate::auth::Session;
use crate::state::SharedState;
use crate::store::Store;
use crate::views::dashboard::{Dashboard, DashboardAction, DashboardView};
use crate::views::redirect_home;
use crate::world::{Event, Task};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
    Extension,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

// ── Subscription ───────────────────────────────────────────────

/// Standing query: all tasks owned by one user, newest first.
pub struct TaskFeed {
    owner: String,
    events: broadcast::Receiver<Event>,
}

impl TaskFeed {
    /// Subscribe, then read the initial snapshot. In this order, so an event
    /// landing between the two still triggers a fresh snapshot.
    pub fn open(store: &Store, owner: &str) -> (Self, Vec<Task>) {
        let events = store.subscribe();
        let snapshot = store.tasks_for_owner(owner);
        (TaskFeed { owner: owner.to_string(), events }, snapshot)
    }

    /// Wait for the next change to this owner's tasks and return the full
    /// list. `None` once the store's channel is gone.
    pub async fn next_snapshot(&mut self, store: &Store) -> Option<Vec<Task>> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.task_owner() == Some(self.owner.as_str()) => {
                    return Some(store.tasks_for_owner(&self.owner));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(owner = %self.owner, skipped, "subscription lagged, resending snapshot");
                    return Some(store.tasks_for_owner(&self.owner));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

// ── Frames ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    View(DashboardView),
    Error { message: String },
}

async fn send_frame<S>(tx: &mut S, frame: &Frame) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(frame) {
        Ok(json) => tx.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!(error = %e, "cannot encode frame");
            Ok(())
        }
    }
}

// ── WS upgrade handler ────────────────────────────────────────

// GET /dashboard/live
pub async fn dashboard_live(
    State(state): State<SharedState>,
    session: Option<Extension<Session>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(Extension(session)) = session else {
        return redirect_home();
    };
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| run_dashboard(socket, state, session)),
        Err(rejection) => rejection.into_response(),
    }
}

// ── Socket lifecycle ───────────────────────────────────────────

async fn run_dashboard(socket: WebSocket, state: SharedState, session: Session) {
    let (ws_tx, ws_rx) = socket.split();
    drive_dashboard(ws_tx, ws_rx, state, session).await;
}

/// The connection loop, over any frame sink and stream. Returns when the
/// client goes away or the store's channel closes.
async fn drive_dashboard<S, R>(mut ws_tx: S, mut ws_rx: R, state: SharedState, session: Session)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let email = session.email.clone();

    let (mut feed, snapshot) = TaskFeed::open(&state.store, &email);
    let mut dash = Dashboard::new(session, &state.settings);
    dash.replace_tasks(snapshot);
    tracing::info!(%email, "dashboard connected");

    if send_frame(&mut ws_tx, &Frame::View(dash.render())).await.is_err() {
        return; // client already gone
    }

    loop {
        tokio::select! {
            snapshot = feed.next_snapshot(&state.store) => match snapshot {
                Some(tasks) => dash.replace_tasks(tasks),
                None => break,
            },
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<DashboardAction>(&text) {
                    Ok(action) => dash.handle(&state.store, action),
                    Err(e) => {
                        tracing::debug!(%email, error = %e, "bad frame from client");
                        let frame = Frame::Error { message: e.to_string() };
                        if send_frame(&mut ws_tx, &frame).await.is_err() {
                            break;
                        }
                        continue;
                    }
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue, // ignore binary, ping, pong
            },
        }

        if send_frame(&mut ws_tx, &Frame::View(dash.render())).await.is_err() {
            break;
        }
    }

    tracing::info!(%email, "dashboard disconnected, subscription released");
}
