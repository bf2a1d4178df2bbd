//! The document store: in-memory World, redb save file, event fan-out.
//!
//! Every mutation takes the write lock, applies the command, flushes the
//! event to disk and broadcasts it. All of it happens under the lock, so
//! subscribers see events in revision order.

use crate::auth::Session;
use crate::persist::{SaveFile, SaveFileError};
use crate::world::{Command, Comment, Event, Task, User, World, WorldError};
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Collection sizes shown on the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub tasks: usize,
    pub comments: usize,
}

pub struct Store {
    world: RwLock<World>,
    save_file: SaveFile,
    events: broadcast::Sender<Event>,
}

impl Store {
    /// Open the save file and load the world from it.
    pub fn open(path: impl AsRef<Path>, channel_capacity: usize) -> Result<Self, SaveFileError> {
        let save_file = SaveFile::open(path)?;
        let world = save_file.load_world()?;
        let (events, _) = broadcast::channel(channel_capacity.max(1));

        Ok(Store {
            world: RwLock::new(world),
            save_file,
            events,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, World> {
        self.world.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, World> {
        self.world.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a command, flush it to disk, broadcast the event.
    pub fn execute(&self, cmd: Command, actor: &Session) -> Result<Event, WorldError> {
        let mut world = self.write();
        let event = world.apply(cmd, actor)?;

        if let Err(e) = self.save_file.flush(&world, &event) {
            tracing::error!(revision = event.revision(), error = %e, "save file flush failed");
        }

        // No receivers is fine: nobody has a dashboard open.
        let _ = self.events.send(event.clone());
        Ok(event)
    }

    /// Start listening for events. Subscribe before reading a snapshot so
    /// nothing slips in between.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Open live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    pub fn tasks_for_owner(&self, owner: &str) -> Vec<Task> {
        self.read().tasks_for_owner(owner).into_iter().cloned().collect()
    }

    pub fn public_task(&self, id: Uuid) -> Option<Task> {
        self.read().public_task(id).cloned()
    }

    pub fn comments_for_task(&self, task_id: Uuid) -> Vec<Comment> {
        self.read().comments_for_task(task_id).into_iter().cloned().collect()
    }

    /// Full collection sizes.
    pub fn counts(&self) -> Counts {
        let world = self.read();
        Counts {
            tasks: world.tasks.len(),
            comments: world.comments.len(),
        }
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.read().users.get(&id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.read().user_by_email(email).cloned()
    }

    /// Persist a new account. Returns false if the email is already taken.
    pub fn insert_user(&self, user: User) -> Result<bool, SaveFileError> {
        let mut world = self.write();
        if world.user_by_email(&user.email).is_some() {
            return Ok(false);
        }
        self.save_file.save_user(&user)?;
        world.users.insert(user.id, user);
        Ok(true)
    }

    pub fn has_users(&self) -> bool {
        !self.read().users.is_empty()
    }
}
