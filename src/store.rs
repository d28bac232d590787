use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("post not found")]
    NotFound,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
}

impl Author {
    /// Display string used in API responses: `"<firstName> <lastName>"`.
    pub fn display(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One persisted blog post document.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: Author,
    pub created: String,
}

/// Fields the caller supplies on insert. The store assigns `id` and `created`.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author: Author,
}

/// Field-level overwrite for updates. `None` means "keep the stored value".
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<Author>,
}

/// Persistence contract for the posts collection. The service only ever
/// talks to the store through these five operations.
pub trait PostStore: Send + Sync {
    /// Persist a new document; the store assigns `id` and `created`.
    fn insert_one(&self, new: NewPost) -> Result<Post, StoreError>;

    /// All documents in insertion order.
    fn find_all(&self) -> Result<Vec<Post>, StoreError>;

    fn find_by_id(&self, id: &str) -> Result<Option<Post>, StoreError>;

    /// Overwrite the supplied fields of an existing document. `created`
    /// is never touched. Fails with `NotFound` if the id is absent.
    fn update_by_id(&self, id: &str, patch: PostPatch) -> Result<(), StoreError>;

    /// Remove a document. Deleting an absent id is not an error.
    fn delete_by_id(&self, id: &str) -> Result<(), StoreError>;
}

/// SQLite-backed document store. Cloneable so a test harness can keep a
/// handle for fixture seeding while the app owns another.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        let store = SqliteStore { conn: Arc::new(Mutex::new(conn)) };
        store.initialize();
        store
    }

    /// Recover from mutex poison instead of propagating it.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn initialize(&self) {
        let conn = self.conn();
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch("PRAGMA foreign_keys=ON;").ok();

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                author_first_name TEXT NOT NULL,
                author_last_name TEXT NOT NULL,
                created TEXT NOT NULL
            );
            ",
        )
        .expect("Failed to initialize database");
    }
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author: Author {
            first_name: row.get(3)?,
            last_name: row.get(4)?,
        },
        created: row.get(5)?,
    })
}

const POST_COLUMNS: &str = "id, title, content, author_first_name, author_last_name, created";

impl PostStore for SqliteStore {
    fn insert_one(&self, new: NewPost) -> Result<Post, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let created = chrono::Utc::now().to_rfc3339();

        let conn = self.conn();
        conn.execute(
            "INSERT INTO posts (id, title, content, author_first_name, author_last_name, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                id,
                new.title,
                new.content,
                new.author.first_name,
                new.author.last_name,
                created
            ],
        )?;

        Ok(Post {
            id,
            title: new.title,
            content: new.content,
            author: new.author,
            created,
        })
    }

    fn find_all(&self) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY rowid"
        ))?;
        let posts = stmt
            .query_map([], row_to_post)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(posts)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let conn = self.conn();
        match conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            [id],
            row_to_post,
        ) {
            Ok(post) => Ok(Some(post)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn update_by_id(&self, id: &str, patch: PostPatch) -> Result<(), StoreError> {
        let conn = self.conn();
        let current = match conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            [id],
            row_to_post,
        ) {
            Ok(post) => post,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let title = patch.title.unwrap_or(current.title);
        let content = patch.content.unwrap_or(current.content);
        let author = patch.author.unwrap_or(current.author);

        conn.execute(
            "UPDATE posts SET title = ?1, content = ?2, author_first_name = ?3, author_last_name = ?4
             WHERE id = ?5",
            rusqlite::params![title, content, author.first_name, author.last_name, id],
        )?;
        Ok(())
    }

    fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn();
        // Idempotent: zero affected rows is still success.
        conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
        Ok(())
    }
}
