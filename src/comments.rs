//! Comment threads attached to videos.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ObjectId, SocialStore,
    content::{ContentKind, Mutation, authorize_owner, purge_likes},
    error::{SocialError, SocialResult, require_content},
    pagination::{Page, PageRequest},
    users::UserSummary,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: ObjectId,
    pub content: String,
    pub video: ObjectId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a comment or tweet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentBody {
    #[serde(default)]
    pub content: String,
}

const COMMENT_COLUMNS: &str = r#"
    c.id, c.content, c.video, c.created_at, c.updated_at,
    c.owner AS owner_id, u.username AS owner_username, u.avatar AS owner_avatar
"#;

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get("id")?,
        content: row.get("content")?,
        video: row.get("video")?,
        owner: UserSummary::from_row(row, "owner")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn fetch_comment(conn: &Connection, id: ObjectId) -> SocialResult<Comment> {
    conn.query_row(
        &format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c LEFT JOIN users u ON u.id = c.owner
             WHERE c.id = ?1"
        ),
        params![id],
        row_to_comment,
    )
    .optional()?
    .ok_or_else(|| SocialError::not_found("Comment not found"))
}

impl SocialStore {
    /// One page of a video's comments, newest first. A page past the end is
    /// empty, not an error.
    pub fn list_comments(
        &self,
        video_id: &str,
        page: PageRequest,
    ) -> SocialResult<Page<Comment>> {
        let video = ObjectId::parse_labeled(video_id, "video")?;
        self.with_connection(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE video = ?1",
                params![video],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments c LEFT JOIN users u ON u.id = c.owner
                 WHERE c.video = ?1
                 ORDER BY c.created_at DESC, c.rowid DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let docs = stmt
                .query_map(
                    params![video, i64::from(page.limit), page.offset()],
                    row_to_comment,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            debug!(%video, page = page.page, returned = docs.len(), total, "listed comments");
            Ok(Page::new(docs, total as u64, page))
        })
    }

    /// Adds a comment. The video does not have to exist in the catalog.
    pub fn add_comment(
        &self,
        video_id: &str,
        author: ObjectId,
        content: &str,
    ) -> SocialResult<Comment> {
        let video = ObjectId::parse_labeled(video_id, "video")?;
        require_content(content, "Comment content is required")?;

        let id = ObjectId::new();
        let comment = self.with_transaction(|tx| {
            let now = Utc::now();
            tx.execute(
                r#"
                INSERT INTO comments (id, content, video, owner, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                "#,
                params![id, content, video, author, now],
            )?;
            fetch_comment(tx, id).map_err(|err| err.into_internal("Failed to add comment"))
        })?;

        info!(comment = %id, %video, %author, "comment added");
        Ok(comment)
    }

    /// Replaces the content of a comment owned by `requester`.
    pub fn update_comment(
        &self,
        comment_id: &str,
        requester: ObjectId,
        content: &str,
    ) -> SocialResult<Comment> {
        let id = ObjectId::parse_labeled(comment_id, "comment")?;
        require_content(content, "Updated comment content is required")?;

        let comment = self.with_transaction(|tx| {
            authorize_owner(tx, ContentKind::Comment, id, requester, Mutation::Update)?;
            tx.execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, content, Utc::now()],
            )?;
            fetch_comment(tx, id)
        })?;

        info!(comment = %id, %requester, "comment updated");
        Ok(comment)
    }

    /// Hard-deletes a comment owned by `requester` along with its likes.
    pub fn delete_comment(&self, comment_id: &str, requester: ObjectId) -> SocialResult<()> {
        let id = ObjectId::parse_labeled(comment_id, "comment")?;
        self.with_transaction(|tx| {
            authorize_owner(tx, ContentKind::Comment, id, requester, Mutation::Delete)?;
            let likes = purge_likes(tx, ContentKind::Comment, id)?;
            tx.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
            info!(comment = %id, %requester, likes, "comment deleted");
            Ok(())
        })
    }
}
