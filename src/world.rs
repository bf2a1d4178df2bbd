use crate::auth::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

// ── Entity types ──────────────────────────────────────────────

/// A task: a short piece of text owned by the user who wrote it.
///
/// Tasks are never edited. They are created, optionally shared when
/// `public`, and deleted by their owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub body: String,
    pub public: bool,
    /// Email of the owning user.
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// A comment left on a public task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub body: String,
    /// Email of the commenting user.
    pub author: String,
    /// Display name at the time of commenting.
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

// ── Commands (client → server) ────────────────────────────────

/// Something a signed-in user wants to happen.
/// `World::apply` validates it and returns the resulting `Event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    CreateTask { body: String, public: bool },
    DeleteTask { task_id: Uuid },
    CreateComment { task_id: Uuid, body: String },
    DeleteComment { comment_id: Uuid },
}

// ── Events (server → subscribers) ─────────────────────────────

/// What actually happened. Broadcast to every live subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TaskCreated {
        revision: u64,
        task: Task,
    },
    TaskDeleted {
        revision: u64,
        task_id: Uuid,
        owner: String,
        /// Comments removed along with the task.
        comment_ids: Vec<Uuid>,
    },
    CommentCreated {
        revision: u64,
        comment: Comment,
    },
    CommentDeleted {
        revision: u64,
        comment_id: Uuid,
        task_id: Uuid,
    },
}

impl Event {
    pub fn revision(&self) -> u64 {
        match self {
            Event::TaskCreated { revision, .. }
            | Event::TaskDeleted { revision, .. }
            | Event::CommentCreated { revision, .. }
            | Event::CommentDeleted { revision, .. } => *revision,
        }
    }

    /// Owner of the task list this event changes, if it changes one.
    pub fn task_owner(&self) -> Option<&str> {
        match self {
            Event::TaskCreated { task, .. } => Some(&task.owner),
            Event::TaskDeleted { owner, .. } => Some(owner),
            Event::CommentCreated { .. } | Event::CommentDeleted { .. } => None,
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("task description is empty")]
    EmptyTask,
    #[error("comment is empty")]
    EmptyComment,
    #[error("task not found")]
    TaskNotFound,
    #[error("task is not public")]
    TaskNotPublic,
    #[error("comment not found")]
    CommentNotFound,
    #[error("only the owner can delete this task")]
    NotTaskOwner,
    #[error("only the author can delete this comment")]
    NotCommentAuthor,
    #[error("sign in required")]
    SignedOut,
}

// ── The World ──────────────────────────────────────────────────

/// The authoritative document store. Lives in memory, loaded from redb on
/// boot. All mutations go through `apply`.
#[derive(Default)]
pub struct World {
    pub tasks: HashMap<Uuid, Task>,
    pub comments: HashMap<Uuid, Comment>,
    pub users: HashMap<Uuid, User>,
    pub revision: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command on behalf of `actor`. Returns the resulting Event.
    /// A rejected command leaves the world untouched.
    pub fn apply(&mut self, cmd: Command, actor: &Session) -> Result<Event, WorldError> {
        match cmd {
            Command::CreateTask { body, public } => {
                if is_blank(&body) {
                    return Err(WorldError::EmptyTask);
                }

                let task = Task {
                    id: Uuid::new_v4(),
                    body,
                    public,
                    owner: actor.email.clone(),
                    created_at: Utc::now(),
                };

                self.revision += 1;
                self.tasks.insert(task.id, task.clone());
                Ok(Event::TaskCreated { revision: self.revision, task })
            }

            Command::DeleteTask { task_id } => {
                let task = self.tasks.get(&task_id).ok_or(WorldError::TaskNotFound)?;
                if task.owner != actor.email {
                    return Err(WorldError::NotTaskOwner);
                }

                let owner = task.owner.clone();
                self.tasks.remove(&task_id);

                let comment_ids: Vec<Uuid> = self
                    .comments
                    .values()
                    .filter(|c| c.task_id == task_id)
                    .map(|c| c.id)
                    .collect();
                for id in &comment_ids {
                    self.comments.remove(id);
                }

                self.revision += 1;
                Ok(Event::TaskDeleted {
                    revision: self.revision,
                    task_id,
                    owner,
                    comment_ids,
                })
            }

            Command::CreateComment { task_id, body } => {
                if is_blank(&body) {
                    return Err(WorldError::EmptyComment);
                }
                let task = self.tasks.get(&task_id).ok_or(WorldError::TaskNotFound)?;
                if !task.public {
                    return Err(WorldError::TaskNotPublic);
                }

                let comment = Comment {
                    id: Uuid::new_v4(),
                    task_id,
                    body,
                    author: actor.email.clone(),
                    author_name: actor.name.clone(),
                    created_at: Utc::now(),
                };

                self.revision += 1;
                self.comments.insert(comment.id, comment.clone());
                Ok(Event::CommentCreated { revision: self.revision, comment })
            }

            Command::DeleteComment { comment_id } => {
                let comment = self
                    .comments
                    .get(&comment_id)
                    .ok_or(WorldError::CommentNotFound)?;
                if comment.author != actor.email {
                    return Err(WorldError::NotCommentAuthor);
                }

                let task_id = comment.task_id;
                self.comments.remove(&comment_id);

                self.revision += 1;
                Ok(Event::CommentDeleted {
                    revision: self.revision,
                    comment_id,
                    task_id,
                })
            }
        }
    }

    /// Tasks owned by `owner`, newest first.
    pub fn tasks_for_owner(&self, owner: &str) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().filter(|t| t.owner == owner).collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    /// A task reachable through its share link. Private tasks are
    /// indistinguishable from missing ones here.
    pub fn public_task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.get(&id).filter(|t| t.public)
    }

    /// Comments on a task in the order they were written.
    pub fn comments_for_task(&self, task_id: Uuid) -> Vec<&Comment> {
        let mut comments: Vec<&Comment> =
            self.comments.values().filter(|c| c.task_id == task_id).collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        comments
    }

    /// Look up a user by email (linear scan, the user table is small).
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email.eq_ignore_ascii_case(email))
    }
}

/// Empty or whitespace-only text counts as missing input.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn alice() -> Session {
        Session { email: "alice@example.com".into(), name: "Alice".into() }
    }

    fn bob() -> Session {
        Session { email: "bob@example.com".into(), name: "Bob".into() }
    }

    fn create_task(w: &mut World, who: &Session, public: bool) -> Uuid {
        let event = w
            .apply(Command::CreateTask { body: "Buy milk".into(), public }, who)
            .unwrap();
        match event {
            Event::TaskCreated { task, .. } => task.id,
            _ => panic!("expected TaskCreated"),
        }
    }

    fn create_comment(w: &mut World, who: &Session, task_id: Uuid, body: &str) -> Uuid {
        let event = w
            .apply(Command::CreateComment { task_id, body: body.into() }, who)
            .unwrap();
        match event {
            Event::CommentCreated { comment, .. } => comment.id,
            _ => panic!("expected CommentCreated"),
        }
    }

    #[test]
    fn create_task_records_owner() {
        let mut w = World::new();
        let id = create_task(&mut w, &alice(), true);

        let task = &w.tasks[&id];
        assert_eq!(task.owner, "alice@example.com");
        assert_eq!(task.body, "Buy milk");
        assert!(task.public);
        assert_eq!(w.revision, 1);
    }

    #[test]
    fn blank_task_rejected_without_side_effects() {
        let mut w = World::new();
        for body in ["", "   ", "\n\t"] {
            let r = w.apply(Command::CreateTask { body: body.into(), public: false }, &alice());
            assert_eq!(r.unwrap_err(), WorldError::EmptyTask);
        }
        assert!(w.tasks.is_empty());
        assert_eq!(w.revision, 0);
    }

    #[test]
    fn only_owner_deletes_task() {
        let mut w = World::new();
        let id = create_task(&mut w, &alice(), false);

        let r = w.apply(Command::DeleteTask { task_id: id }, &bob());
        assert_eq!(r.unwrap_err(), WorldError::NotTaskOwner);
        assert!(w.tasks.contains_key(&id));

        w.apply(Command::DeleteTask { task_id: id }, &alice()).unwrap();
        assert!(!w.tasks.contains_key(&id));
    }

    #[test]
    fn delete_nonexistent_task() {
        let mut w = World::new();
        let r = w.apply(Command::DeleteTask { task_id: Uuid::new_v4() }, &alice());
        assert_eq!(r.unwrap_err(), WorldError::TaskNotFound);
        assert_eq!(w.revision, 0);
    }

    #[test]
    fn deleting_task_takes_its_comments() {
        let mut w = World::new();
        let id = create_task(&mut w, &alice(), true);
        let other = create_task(&mut w, &alice(), true);
        let c1 = create_comment(&mut w, &bob(), id, "first");
        let c2 = create_comment(&mut w, &alice(), id, "second");
        let kept = create_comment(&mut w, &bob(), other, "elsewhere");

        let event = w.apply(Command::DeleteTask { task_id: id }, &alice()).unwrap();
        match event {
            Event::TaskDeleted { comment_ids, owner, .. } => {
                assert_eq!(owner, "alice@example.com");
                assert_eq!(comment_ids.len(), 2);
                assert!(comment_ids.contains(&c1));
                assert!(comment_ids.contains(&c2));
            }
            _ => panic!("expected TaskDeleted"),
        }
        assert_eq!(w.comments.len(), 1);
        assert!(w.comments.contains_key(&kept));
    }

    #[test]
    fn comments_only_on_public_tasks() {
        let mut w = World::new();
        let private = create_task(&mut w, &alice(), false);

        let r = w.apply(
            Command::CreateComment { task_id: private, body: "hi".into() },
            &bob(),
        );
        assert_eq!(r.unwrap_err(), WorldError::TaskNotPublic);

        let r = w.apply(
            Command::CreateComment { task_id: Uuid::new_v4(), body: "hi".into() },
            &bob(),
        );
        assert_eq!(r.unwrap_err(), WorldError::TaskNotFound);
        assert!(w.comments.is_empty());
    }

    #[test]
    fn blank_comment_rejected() {
        let mut w = World::new();
        let id = create_task(&mut w, &alice(), true);
        let rev = w.revision;

        let r = w.apply(Command::CreateComment { task_id: id, body: " ".into() }, &bob());
        assert_eq!(r.unwrap_err(), WorldError::EmptyComment);
        assert_eq!(w.revision, rev);
    }

    #[test]
    fn comment_carries_author_name() {
        let mut w = World::new();
        let id = create_task(&mut w, &alice(), true);
        let c = create_comment(&mut w, &bob(), id, "nice");

        let comment = &w.comments[&c];
        assert_eq!(comment.author, "bob@example.com");
        assert_eq!(comment.author_name, "Bob");
        assert_eq!(comment.task_id, id);
    }

    #[test]
    fn only_author_deletes_comment() {
        let mut w = World::new();
        let id = create_task(&mut w, &alice(), true);
        let c = create_comment(&mut w, &bob(), id, "mine");

        // Task owner is not the comment author.
        let r = w.apply(Command::DeleteComment { comment_id: c }, &alice());
        assert_eq!(r.unwrap_err(), WorldError::NotCommentAuthor);

        w.apply(Command::DeleteComment { comment_id: c }, &bob()).unwrap();
        assert!(w.comments.is_empty());

        let r = w.apply(Command::DeleteComment { comment_id: c }, &bob());
        assert_eq!(r.unwrap_err(), WorldError::CommentNotFound);
    }

    #[test]
    fn tasks_for_owner_filters_and_sorts_newest_first() {
        let mut w = World::new();
        for (day, owner) in [(1, "alice@example.com"), (3, "alice@example.com"), (2, "bob@example.com"), (2, "alice@example.com")] {
            let task = Task {
                id: Uuid::new_v4(),
                body: format!("day {day}"),
                public: false,
                owner: owner.into(),
                created_at: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
            };
            w.tasks.insert(task.id, task);
        }

        let bodies: Vec<&str> = w
            .tasks_for_owner("alice@example.com")
            .iter()
            .map(|t| t.body.as_str())
            .collect();
        assert_eq!(bodies, ["day 3", "day 2", "day 1"]);
        assert_eq!(w.tasks_for_owner("carol@example.com").len(), 0);
    }

    #[test]
    fn public_task_hides_private_ones() {
        let mut w = World::new();
        let public = create_task(&mut w, &alice(), true);
        let private = create_task(&mut w, &alice(), false);

        assert!(w.public_task(public).is_some());
        assert!(w.public_task(private).is_none());
        assert!(w.public_task(Uuid::new_v4()).is_none());
    }

    #[test]
    fn comments_for_task_in_written_order() {
        let mut w = World::new();
        let id = create_task(&mut w, &alice(), true);
        for (minute, body) in [(5, "later"), (1, "earliest"), (3, "middle")] {
            let comment = Comment {
                id: Uuid::new_v4(),
                task_id: id,
                body: body.into(),
                author: "bob@example.com".into(),
                author_name: "Bob".into(),
                created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap(),
            };
            w.comments.insert(comment.id, comment);
        }

        let bodies: Vec<&str> = w.comments_for_task(id).iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, ["earliest", "middle", "later"]);
    }

    #[test]
    fn event_task_owner_only_for_task_events() {
        let mut w = World::new();
        let id = create_task(&mut w, &alice(), true);
        let c = create_comment(&mut w, &bob(), id, "x");
        let e = w.apply(Command::DeleteComment { comment_id: c }, &bob()).unwrap();
        assert_eq!(e.task_owner(), None);
        assert_eq!(e.revision(), 3);

        let e = w.apply(Command::DeleteTask { task_id: id }, &alice()).unwrap();
        assert_eq!(e.task_owner(), Some("alice@example.com"));
    }

    #[test]
    fn user_lookup_ignores_email_case() {
        let mut w = World::new();
        let user = User {
            id: Uuid::new_v4(),
            email: "Alice@Example.com".into(),
            name: "Alice".into(),
            password_hash: String::new(),
        };
        w.users.insert(user.id, user);
        assert!(w.user_by_email("alice@example.com").is_some());
        assert!(w.user_by_email("bob@example.com").is_none());
    }
}
