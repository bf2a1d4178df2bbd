//! Public task detail page with its comment thread.
//!
//! Unlike the dashboard there is no subscription here: the page works on the
//! snapshot taken at load time. A posted comment is appended locally once the
//! store accepts it; a deleted one is dropped locally.

use super::{redirect_home, HeaderView, Notice, Severity};
use crate::auth::Session;
use crate::error::AppError;
use crate::settings::Settings;
use crate::state::SharedState;
use crate::store::Store;
use crate::world::{is_blank, Command, Comment, Event, Task, WorldError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use uuid::Uuid;

const FALLBACK_DATE_FORMAT: &str = "%-m/%-d/%Y";

#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub id: Uuid,
    pub body: String,
    pub owner: String,
    pub public: bool,
    /// Creation date rendered with the configured date format.
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentItem {
    pub id: Uuid,
    pub task_id: Uuid,
    pub body: String,
    pub author: String,
    pub author_name: String,
    /// True when the viewer wrote it.
    pub can_delete: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub header: HeaderView,
    pub task: TaskDetail,
    pub comments: Vec<CommentItem>,
    pub form: CommentForm,
    pub can_comment: bool,
    pub notice: Option<Notice>,
}

pub struct TaskPage {
    session: Option<Session>,
    task: Task,
    comments: Vec<Comment>,
    form: CommentForm,
    notice: Option<Notice>,
    auto_hide_ms: u64,
    date_format: String,
}

impl TaskPage {
    /// Server-side step. `None` for a missing or private task: the caller
    /// redirects home.
    pub fn load(store: &Store, id: Uuid, session: Option<Session>, settings: &Settings) -> Option<Self> {
        let task = store.public_task(id)?;
        let comments = store.comments_for_task(id);
        Some(TaskPage {
            session,
            task,
            comments,
            form: CommentForm::default(),
            notice: None,
            auto_hide_ms: settings.notice_auto_hide_ms,
            date_format: settings.date_format.clone(),
        })
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn submit_comment(&mut self, store: &Store, body: String) -> Result<(), WorldError> {
        self.form.body = body;
        if is_blank(&self.form.body) {
            self.notify(Severity::Info, "Write something before posting");
            return Err(WorldError::EmptyComment);
        }
        let Some(session) = &self.session else {
            self.notify(Severity::Info, "Sign in to comment");
            return Err(WorldError::SignedOut);
        };

        let cmd = Command::CreateComment {
            task_id: self.task.id,
            body: self.form.body.clone(),
        };
        match store.execute(cmd, session) {
            Ok(Event::CommentCreated { comment, .. }) => {
                self.comments.push(comment);
                self.form = CommentForm::default();
                self.notify(Severity::Success, "Comment posted");
                Ok(())
            }
            Ok(other) => {
                tracing::error!(revision = other.revision(), "comment create answered with another event");
                Ok(())
            }
            Err(e) => {
                self.notify(Severity::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Delete one of this task's comments. Comments on other tasks are
    /// reported as not found and left alone.
    pub fn delete_comment(&mut self, store: &Store, comment_id: Uuid) -> Result<(), WorldError> {
        let Some(session) = &self.session else {
            return Err(WorldError::SignedOut);
        };
        if !self.comments.iter().any(|c| c.id == comment_id) {
            self.notify(Severity::Error, WorldError::CommentNotFound.to_string());
            return Err(WorldError::CommentNotFound);
        }

        match store.execute(Command::DeleteComment { comment_id }, session) {
            Ok(_) => {
                self.comments.retain(|c| c.id != comment_id);
                Ok(())
            }
            Err(e) => {
                self.notify(Severity::Error, e.to_string());
                Err(e)
            }
        }
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.notice = Some(Notice::new(severity, message, self.auto_hide_ms));
    }

    pub fn render(&mut self) -> TaskView {
        let viewer = self.session.as_ref().map(|s| s.email.as_str());
        TaskView {
            header: HeaderView::new(self.session.as_ref()),
            task: TaskDetail {
                id: self.task.id,
                body: self.task.body.clone(),
                owner: self.task.owner.clone(),
                public: self.task.public,
                created_at: format_date(self.task.created_at, &self.date_format),
            },
            comments: self
                .comments
                .iter()
                .map(|c| CommentItem {
                    id: c.id,
                    task_id: c.task_id,
                    body: c.body.clone(),
                    author: c.author.clone(),
                    author_name: c.author_name.clone(),
                    can_delete: viewer == Some(c.author.as_str()),
                })
                .collect(),
            form: self.form.clone(),
            can_comment: self.session.is_some(),
            notice: self.notice.take(),
        }
    }
}

/// Render a date with a strftime pattern, falling back to month/day/year
/// when the pattern is invalid.
fn format_date(at: DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(pattern)).is_err() {
        out.clear();
        let _ = write!(out, "{}", at.format(FALLBACK_DATE_FORMAT));
    }
    out
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn load_or_404(state: &SharedState, raw_id: &str, session: Option<Session>) -> Result<TaskPage, AppError> {
    parse_id(raw_id)
        .and_then(|id| TaskPage::load(&state.store, id, session, &state.settings))
        .ok_or(AppError::World(WorldError::TaskNotFound))
}

fn respond(page: &mut TaskPage, result: Result<(), WorldError>, ok: StatusCode) -> Response {
    let status = match result {
        Ok(()) => ok,
        Err(e) => AppError::World(e).status(),
    };
    (status, Json(page.render())).into_response()
}

// GET /task/:id
pub async fn task_page(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    session: Option<Extension<Session>>,
) -> Response {
    let session = session.map(|Extension(s)| s);
    match parse_id(&id).and_then(|id| TaskPage::load(&state.store, id, session, &state.settings)) {
        Some(mut page) => Json(page.render()).into_response(),
        None => redirect_home(),
    }
}

// POST /task/:id/comments
pub async fn post_comment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    session: Option<Extension<Session>>,
    Json(form): Json<CommentForm>,
) -> Result<Response, AppError> {
    let Some(Extension(session)) = session else {
        return Err(AppError::Unauthorized);
    };
    let mut page = load_or_404(&state, &id, Some(session))?;
    let result = page.submit_comment(&state.store, form.body);
    Ok(respond(&mut page, result, StatusCode::CREATED))
}

// DELETE /task/:id/comments/:comment_id
pub async fn delete_comment(
    State(state): State<SharedState>,
    Path((id, comment_id)): Path<(String, String)>,
    session: Option<Extension<Session>>,
) -> Result<Response, AppError> {
    let Some(Extension(session)) = session else {
        return Err(AppError::Unauthorized);
    };
    let comment_id = parse_id(&comment_id).ok_or(AppError::World(WorldError::CommentNotFound))?;
    let mut page = load_or_404(&state, &id, Some(session))?;
    let result = page.delete_comment(&state.store, comment_id);
    Ok(respond(&mut page, result, StatusCode::OK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::test_settings;
    use crate::store::test_support::{add_comment, add_task, session, temp_store};
    use chrono::TimeZone;

    fn alice() -> Session {
        session("alice@example.com", "Alice")
    }

    fn bob() -> Session {
        session("bob@example.com", "Bob")
    }

    #[test]
    fn private_or_missing_task_does_not_load() {
        let (store, dir) = temp_store();
        let settings = test_settings(dir.path());
        let private = add_task(&store, &alice(), "secret", false);

        assert!(TaskPage::load(&store, private.id, Some(alice()), &settings).is_none());
        assert!(TaskPage::load(&store, Uuid::new_v4(), None, &settings).is_none());
    }

    #[test]
    fn render_shows_task_and_marks_own_comments() {
        let (store, dir) = temp_store();
        let settings = test_settings(dir.path());
        let task = add_task(&store, &alice(), "Plan trip", true);
        add_comment(&store, &bob(), task.id, "Bring snacks");
        add_comment(&store, &alice(), task.id, "Noted");

        let mut page = TaskPage::load(&store, task.id, Some(bob()), &settings).unwrap();
        let view = page.render();
        assert_eq!(view.task.body, "Plan trip");
        assert!(view.can_comment);
        let own: Vec<bool> = view.comments.iter().map(|c| c.can_delete).collect();
        assert_eq!(own, [true, false]);
        assert_eq!(view.comments[0].author_name, "Bob");
    }

    #[test]
    fn visitor_cannot_comment() {
        let (store, dir) = temp_store();
        let settings = test_settings(dir.path());
        let task = add_task(&store, &alice(), "Open", true);

        let mut page = TaskPage::load(&store, task.id, None, &settings).unwrap();
        assert_eq!(page.submit_comment(&store, "hello".into()), Err(WorldError::SignedOut));
        assert_eq!(page.delete_comment(&store, Uuid::new_v4()), Err(WorldError::SignedOut));
        assert!(page.comments().is_empty());
        assert_eq!(store.counts().comments, 0);
        assert!(!page.render().can_comment);
    }

    #[test]
    fn empty_comment_never_reaches_the_store() {
        let (store, dir) = temp_store();
        let settings = test_settings(dir.path());
        let task = add_task(&store, &alice(), "Open", true);
        let rev = store.revision();

        let mut page = TaskPage::load(&store, task.id, Some(bob()), &settings).unwrap();
        let r = page.submit_comment(&store, "".into());
        assert_eq!(r, Err(WorldError::EmptyComment));
        assert_eq!(store.revision(), rev);
        assert_eq!(page.render().notice.unwrap().severity, Severity::Info);
    }

    #[test]
    fn posted_comment_is_appended_and_form_cleared() {
        let (store, dir) = temp_store();
        let settings = test_settings(dir.path());
        let task = add_task(&store, &alice(), "Open", true);
        add_comment(&store, &alice(), task.id, "first");

        let mut page = TaskPage::load(&store, task.id, Some(bob()), &settings).unwrap();
        page.submit_comment(&store, "second".into()).unwrap();

        let view = page.render();
        let bodies: Vec<&str> = view.comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);
        assert!(view.form.body.is_empty());
        assert_eq!(view.notice.unwrap().severity, Severity::Success);
    }

    #[test]
    fn delete_removes_exactly_that_comment() {
        let (store, dir) = temp_store();
        let settings = test_settings(dir.path());
        let task = add_task(&store, &alice(), "Open", true);
        let a = add_comment(&store, &bob(), task.id, "a");
        let b = add_comment(&store, &bob(), task.id, "b");
        let c = add_comment(&store, &bob(), task.id, "c");

        let mut page = TaskPage::load(&store, task.id, Some(bob()), &settings).unwrap();
        page.delete_comment(&store, b.id).unwrap();

        let ids: Vec<Uuid> = page.comments().iter().map(|c| c.id).collect();
        assert_eq!(ids, [a.id, c.id]);
        assert_eq!(store.counts().comments, 2);
    }

    #[test]
    fn deleting_someone_elses_comment_keeps_it() {
        let (store, dir) = temp_store();
        let settings = test_settings(dir.path());
        let task = add_task(&store, &alice(), "Open", true);
        let theirs = add_comment(&store, &bob(), task.id, "mine, says bob");

        let mut page = TaskPage::load(&store, task.id, Some(alice()), &settings).unwrap();
        let r = page.delete_comment(&store, theirs.id);
        assert_eq!(r, Err(WorldError::NotCommentAuthor));
        assert_eq!(page.comments().len(), 1);
        assert_eq!(page.render().notice.unwrap().severity, Severity::Error);
    }

    #[test]
    fn comment_on_another_task_is_not_found_here() {
        let (store, dir) = temp_store();
        let settings = test_settings(dir.path());
        let here = add_task(&store, &alice(), "Here", true);
        let elsewhere = add_task(&store, &alice(), "Elsewhere", true);
        let stray = add_comment(&store, &bob(), elsewhere.id, "on the other task");

        let mut page = TaskPage::load(&store, here.id, Some(bob()), &settings).unwrap();
        let r = page.delete_comment(&store, stray.id);

        assert_eq!(r, Err(WorldError::CommentNotFound));
        assert_eq!(store.comments_for_task(elsewhere.id), vec![stray]);
        assert_eq!(page.render().notice.unwrap().severity, Severity::Error);
    }

    #[test]
    fn date_uses_configured_format() {
        let at = Utc.with_ymd_and_hms(2026, 2, 7, 15, 30, 0).unwrap();
        assert_eq!(format_date(at, "%-m/%-d/%Y"), "2/7/2026");
        assert_eq!(format_date(at, "%Y-%m-%d"), "2026-02-07");
    }
}
