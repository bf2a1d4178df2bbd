//! Page view models.
//!
//! Each page route does its server-side step (session gate, fetch, redirect)
//! and answers with a JSON view model. Components that outlive a single
//! request (the dashboard) keep their own state and re-render the same view.

pub mod dashboard;
pub mod home;
pub mod task_page;

use crate::auth::Session;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A transient, dismissible message. Rendered once, hidden after `auto_hide_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub auto_hide_ms: u64,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>, auto_hide_ms: u64) -> Self {
        let notice = Notice { severity, message: message.into(), auto_hide_ms };
        match severity {
            Severity::Error => tracing::warn!(text = %notice.message, "error notice"),
            Severity::Info | Severity::Success => tracing::debug!(text = %notice.message, "notice"),
        }
        notice
    }
}

/// What the header offers the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderAction {
    SignIn,
    SignOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderView {
    pub signed_in: bool,
    /// Display name shown on the sign-out button.
    pub user_name: Option<String>,
    pub dashboard_link: Option<&'static str>,
    pub action: HeaderAction,
}

impl HeaderView {
    pub fn new(session: Option<&Session>) -> Self {
        match session {
            Some(s) => HeaderView {
                signed_in: true,
                user_name: Some(s.name.clone()),
                dashboard_link: Some("/dashboard"),
                action: HeaderAction::SignOut,
            },
            None => HeaderView {
                signed_in: false,
                user_name: None,
                dashboard_link: None,
                action: HeaderAction::SignIn,
            },
        }
    }
}

/// Non-permanent redirect to the home page.
pub fn redirect_home() -> Response {
    Redirect::temporary("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};

    #[test]
    fn header_for_signed_in_user() {
        let session = Session { email: "a@example.com".into(), name: "Ann".into() };
        let view = HeaderView::new(Some(&session));
        assert!(view.signed_in);
        assert_eq!(view.user_name.as_deref(), Some("Ann"));
        assert_eq!(view.dashboard_link, Some("/dashboard"));
        assert_eq!(view.action, HeaderAction::SignOut);
    }

    #[test]
    fn header_for_visitor() {
        let view = HeaderView::new(None);
        assert!(!view.signed_in);
        assert_eq!(view.dashboard_link, None);
        assert_eq!(view.action, HeaderAction::SignIn);
    }

    #[test]
    fn redirect_home_is_temporary() {
        let r = redirect_home();
        assert_eq!(r.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(r.headers()[header::LOCATION], "/");
    }
}
