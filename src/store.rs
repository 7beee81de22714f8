//! SQLite persistence for the social layer.
//!
//! Every engine (likes, subscriptions, comments, tweets, videos, dashboard)
//! adds its operations as an `impl SocialStore` block in its own module. The
//! store itself only knows how to create the schema and how to hand out
//! connections.
//!
//! Connections are short-lived: each call opens its own, so handlers running
//! on the blocking pool never share one. Anything that reads before it writes
//! goes through [`SocialStore::with_transaction`], which starts an
//! `IMMEDIATE` transaction. SQLite then holds the write lock from the first
//! read until commit, which is what makes toggles and ownership checks atomic
//! under concurrent requests.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::SocialResult;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SocialStore {
    db_path: PathBuf,
}

impl SocialStore {
    /// Opens (and if necessary creates) the SQLite DB and ensures the expected
    /// schema exists. WAL mode lets readers proceed while a writer holds the
    /// lock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }

        let mut conn = Connection::open(path)
            .with_context(|| format!("opening social DB {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL mode for social DB")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting social DB synchronous mode")?;
        ensure_tables(&mut conn)?;

        debug!(path = %path.display(), "social store ready");
        Ok(Self {
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> SocialResult<Connection> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("opening social DB {}", self.db_path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Runs read-only work on a dedicated connection.
    pub(crate) fn with_connection<F, T>(&self, f: F) -> SocialResult<T>
    where
        F: FnOnce(&Connection) -> SocialResult<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    /// Runs `f` inside an `IMMEDIATE` transaction. The transaction commits
    /// only when `f` returns `Ok`; any error rolls every write back.
    pub(crate) fn with_transaction<F, T>(&self, f: F) -> SocialResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> SocialResult<T>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Creates every table and index if missing. Wrapped in a transaction so a
/// failure leaves the DB untouched.
///
/// The UNIQUE indexes on `likes` and `subscriptions` back up the transactional
/// toggles: even a writer that bypasses the engines cannot create a second
/// edge for the same pair.
fn ensure_tables(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            email TEXT,
            avatar TEXT,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            video_file TEXT NOT NULL,
            thumbnail TEXT NOT NULL DEFAULT '',
            duration REAL NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            is_published INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS likes (
            id TEXT PRIMARY KEY,
            liked_by TEXT NOT NULL,
            target_kind TEXT NOT NULL CHECK (target_kind IN ('video', 'comment', 'tweet')),
            target_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            subscriber TEXT NOT NULL,
            channel TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            video TEXT NOT NULL,
            owner TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tweets (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            owner TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_edge
            ON likes(liked_by, target_kind, target_id);
        CREATE INDEX IF NOT EXISTS idx_likes_target ON likes(target_kind, target_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_subscriptions_edge
            ON subscriptions(subscriber, channel);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_channel ON subscriptions(channel);
        CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video);
        CREATE INDEX IF NOT EXISTS idx_tweets_owner ON tweets(owner);
        "#,
    )?;

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::{TempDir, tempdir};

    use rusqlite::params;

    use super::SocialStore;
    use crate::{ObjectId, content::ContentKind, users::UserProfile};

    /// Fresh store in a temp dir. Keep the `TempDir` alive for the duration of
    /// the test or the database disappears underneath the store.
    pub(crate) fn temp_store() -> (TempDir, SocialStore) {
        let temp = tempdir().unwrap();
        let store = SocialStore::open(temp.path().join("social.db")).unwrap();
        (temp, store)
    }

    pub(crate) fn seed_user(store: &SocialStore, username: &str) -> ObjectId {
        let id = ObjectId::new();
        store
            .upsert_user(&UserProfile {
                id,
                username: username.into(),
                email: Some(format!("{username}@example.test")),
                avatar: Some(format!("https://cdn.example.test/{username}.png")),
            })
            .unwrap();
        id
    }

    /// Number of likes stored against one item.
    pub(crate) fn count_likes(store: &SocialStore, kind: ContentKind, target_id: &str) -> i64 {
        let target_id: ObjectId = target_id.parse().unwrap();
        store
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM likes WHERE target_kind = ?1 AND target_id = ?2",
                    params![kind, target_id],
                    |row| row.get(0),
                )?)
            })
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_parent_directories_and_schema() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/dir/social.db");
        let store = SocialStore::open(&path).unwrap();
        assert!(path.exists());

        let tables: Vec<String> = store
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(names)
            })
            .unwrap();
        for table in ["comments", "likes", "subscriptions", "tweets", "users", "videos"] {
            assert!(tables.iter().any(|name| name == table), "missing {table}");
        }
    }

    #[test]
    fn reopening_an_existing_database_is_harmless() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("social.db");
        SocialStore::open(&path).unwrap();
        SocialStore::open(&path).unwrap();
    }

    #[test]
    fn failed_transactions_roll_back() {
        let temp = tempdir().unwrap();
        let store = SocialStore::open(temp.path().join("social.db")).unwrap();

        let result: SocialResult<()> = store.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO tweets (id, content, owner, created_at, updated_at)
                 VALUES ('a', 'x', 'o', 't', 't')",
                [],
            )?;
            Err(crate::SocialError::invalid("abort"))
        });
        assert!(result.is_err());

        let count: i64 = store
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM tweets", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
