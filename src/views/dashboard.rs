//! The signed-in user's task list.
//!
//! `Dashboard` is the per-connection component: it owns the form state, the
//! last snapshot of the user's tasks and the pending notice. The task list
//! only ever changes through `replace_tasks`, fed by the live subscription;
//! creating or deleting a task just issues the store call.

use super::{redirect_home, HeaderView, Notice, Severity};
use crate::auth::Session;
use crate::settings::{share_url, Settings};
use crate::state::SharedState;
use crate::store::Store;
use crate::world::{is_blank, Command, Task};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The new-task form: text input plus the "make public" checkbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskForm {
    pub body: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskItem {
    pub id: Uuid,
    pub body: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    /// Detail page path, only for public tasks.
    pub link: Option<String>,
}

impl From<&Task> for TaskItem {
    fn from(task: &Task) -> Self {
        TaskItem {
            id: task.id,
            body: task.body.clone(),
            public: task.public,
            created_at: task.created_at,
            link: task.public.then(|| format!("/task/{}", task.id)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub header: HeaderView,
    pub email: String,
    pub form: TaskForm,
    pub tasks: Vec<TaskItem>,
    pub notice: Option<Notice>,
    /// Text the client should put on the clipboard.
    pub clipboard: Option<String>,
}

/// User actions arriving from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardAction {
    Submit {
        body: String,
        #[serde(default)]
        public: bool,
    },
    Delete {
        id: Uuid,
    },
    Share {
        id: Uuid,
    },
}

pub struct Dashboard {
    session: Session,
    public_url: String,
    auto_hide_ms: u64,
    form: TaskForm,
    tasks: Vec<Task>,
    notice: Option<Notice>,
    clipboard: Option<String>,
}

impl Dashboard {
    pub fn new(session: Session, settings: &Settings) -> Self {
        Dashboard {
            session,
            public_url: settings.public_url.clone(),
            auto_hide_ms: settings.notice_auto_hide_ms,
            form: TaskForm::default(),
            tasks: Vec::new(),
            notice: None,
            clipboard: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn form(&self) -> &TaskForm {
        &self.form
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// A new subscription snapshot. Replaces the list wholesale.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn handle(&mut self, store: &Store, action: DashboardAction) {
        match action {
            DashboardAction::Submit { body, public } => self.submit(store, TaskForm { body, public }),
            DashboardAction::Delete { id } => self.delete(store, id),
            DashboardAction::Share { id } => self.share(id),
        }
    }

    pub fn submit(&mut self, store: &Store, form: TaskForm) {
        self.form = form;
        if is_blank(&self.form.body) {
            self.notify(Severity::Info, "Fill in the task description");
            return;
        }

        let cmd = Command::CreateTask {
            body: self.form.body.clone(),
            public: self.form.public,
        };
        match store.execute(cmd, &self.session) {
            Ok(_) => {
                self.form = TaskForm::default();
                self.notify(Severity::Success, "Task added");
            }
            Err(e) => self.notify(Severity::Error, e.to_string()),
        }
    }

    pub fn delete(&mut self, store: &Store, id: Uuid) {
        match store.execute(Command::DeleteTask { task_id: id }, &self.session) {
            Ok(_) => self.notify(Severity::Success, "Task removed"),
            Err(e) => self.notify(Severity::Error, e.to_string()),
        }
    }

    pub fn share(&mut self, id: Uuid) {
        let shareable = self.tasks.iter().any(|t| t.id == id && t.public);
        if !shareable {
            self.notify(Severity::Error, "Only public tasks can be shared");
            return;
        }
        self.clipboard = Some(share_url(&self.public_url, id));
        self.notify(Severity::Success, "Link copied to clipboard");
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.notice = Some(Notice::new(severity, message, self.auto_hide_ms));
    }

    /// Current view. The notice and clipboard are handed out once.
    pub fn render(&mut self) -> DashboardView {
        DashboardView {
            header: HeaderView::new(Some(&self.session)),
            email: self.session.email.clone(),
            form: self.form.clone(),
            tasks: self.tasks.iter().map(TaskItem::from).collect(),
            notice: self.notice.take(),
            clipboard: self.clipboard.take(),
        }
    }
}

// GET /dashboard
pub async fn dashboard(
    State(state): State<SharedState>,
    session: Option<Extension<Session>>,
) -> Response {
    let Some(Extension(session)) = session else {
        return redirect_home();
    };

    let mut dash = Dashboard::new(session, &state.settings);
    dash.replace_tasks(state.store.tasks_for_owner(&dash.session().email));
    Json(dash.render()).into_response()
}
