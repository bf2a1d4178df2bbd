//! World ↔ redb persistence.
//!
//! redb is a save file: loaded on boot, flushed on every mutation.
//! Never queried at runtime; World is the runtime truth.

use crate::world::{Comment, Event, Task, User, World};
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
#[cfg(feature = "profile")]
use std::time::Instant;
use thiserror::Error;

const WORLD_TASKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("world_tasks");
const WORLD_COMMENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("world_comments");
const WORLD_USERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("world_users");
const WORLD_META: TableDefinition<&str, &[u8]> = TableDefinition::new("world_meta");

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct SaveFile {
    db: Arc<Database>,
}

impl SaveFile {
    /// Open (or create) the save file at the given path.
    /// Creates tables if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SaveFileError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(WORLD_TASKS)?;
            let _ = txn.open_table(WORLD_COMMENTS)?;
            let _ = txn.open_table(WORLD_USERS)?;
            let _ = txn.open_table(WORLD_META)?;
        }
        txn.commit()?;

        Ok(SaveFile { db: Arc::new(db) })
    }

    /// Load the entire World from disk. Called once at boot.
    pub fn load_world(&self) -> Result<World, SaveFileError> {
        let mut world = World::new();
        let txn = self.db.begin_read()?;

        for task in decode_all::<Task>(&txn.open_table(WORLD_TASKS)?)? {
            world.tasks.insert(task.id, task);
        }
        for comment in decode_all::<Comment>(&txn.open_table(WORLD_COMMENTS)?)? {
            world.comments.insert(comment.id, comment);
        }
        for user in decode_all::<User>(&txn.open_table(WORLD_USERS)?)? {
            world.users.insert(user.id, user);
        }

        let meta_table = txn.open_table(WORLD_META)?;
        if let Some(rev_data) = meta_table.get("revision")? {
            let bytes: [u8; 8] = rev_data
                .value()
                .try_into()
                .map_err(|_| SaveFileError::Decode("revision is not 8 bytes".into()))?;
            world.revision = u64::from_le_bytes(bytes);
        }

        Ok(world)
    }

    /// Flush a single event to disk. Called after every World::apply().
    /// Writes the affected entities + updated revision in one transaction.
    pub fn flush(&self, world: &World, event: &Event) -> Result<(), SaveFileError> {
        #[cfg(feature = "profile")]
        let total_start = Instant::now();
        let txn = self.db.begin_write()?;
        {
            let mut tasks = txn.open_table(WORLD_TASKS)?;
            let mut comments = txn.open_table(WORLD_COMMENTS)?;
            let mut meta = txn.open_table(WORLD_META)?;

            match event {
                Event::TaskCreated { task, .. } => {
                    tasks.insert(task.id.as_bytes().as_slice(), encode(task)?.as_slice())?;
                }

                Event::TaskDeleted { task_id, comment_ids, .. } => {
                    tasks.remove(task_id.as_bytes().as_slice())?;
                    for id in comment_ids {
                        comments.remove(id.as_bytes().as_slice())?;
                    }
                }

                Event::CommentCreated { comment, .. } => {
                    comments.insert(comment.id.as_bytes().as_slice(), encode(comment)?.as_slice())?;
                }

                Event::CommentDeleted { comment_id, .. } => {
                    comments.remove(comment_id.as_bytes().as_slice())?;
                }
            }

            meta.insert("revision", world.revision.to_le_bytes().as_slice())?;
        }
        #[cfg(feature = "profile")]
        let commit_start = Instant::now();
        txn.commit()?;
        #[cfg(feature = "profile")]
        tracing::debug!(
            commit_us = commit_start.elapsed().as_micros() as u64,
            total_us = total_start.elapsed().as_micros() as u64,
            "flush committed transaction"
        );
        Ok(())
    }

    /// Write a user to the save file (seeding / registration).
    pub fn save_user(&self, user: &User) -> Result<(), SaveFileError> {
        let txn = self.db.begin_write()?;
        {
            let mut users = txn.open_table(WORLD_USERS)?;
            users.insert(user.id.as_bytes().as_slice(), encode(user)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, SaveFileError> {
    postcard::to_allocvec(value).map_err(|e| SaveFileError::Encode(e.to_string()))
}

fn decode_all<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static [u8], &'static [u8]>,
) -> Result<Vec<T>, SaveFileError> {
    let mut out = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        let item = postcard::from_bytes(value.value())
            .map_err(|e| SaveFileError::Decode(e.to_string()))?;
        out.push(item);
    }
    Ok(out)
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SaveFileError {
    #[error("redb: {0}")]
    Redb(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("encode: {0}")]
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into SaveFileError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for SaveFileError {
            fn from(e: $t) -> Self { SaveFileError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

// ── Tests ──────────────────────────────────────────────────────
