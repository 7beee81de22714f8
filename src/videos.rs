//! Video catalog.
//!
//! Video bytes and thumbnails live in an external file store; the catalog only
//! keeps their URLs next to the metadata the rest of the social layer needs
//! (owner, views, publish flag). Likes and the channel dashboard read from
//! here.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ObjectId, SocialStore,
    content::{ContentKind, Mutation, authorize_owner, purge_likes},
    error::{SocialError, SocialResult},
    pagination::{Page, PageRequest},
    users::UserSummary,
};

/// Published video as returned to clients, owner projected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: ObjectId,
    pub owner: UserSummary,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// URL of the already-uploaded media file.
    #[serde(default)]
    pub video_file: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Partial update. Absent or blank fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Views,
    Title,
    Duration,
}

impl SortField {
    fn parse(raw: &str) -> SocialResult<Self> {
        match raw {
            "createdAt" => Ok(Self::CreatedAt),
            "views" => Ok(Self::Views),
            "title" => Ok(Self::Title),
            "duration" => Ok(Self::Duration),
            other => Err(SocialError::invalid(format!("Unsupported sort field: {other}"))),
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "v.created_at",
            Self::Views => "v.views",
            Self::Title => "v.title",
            Self::Duration => "v.duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn parse(raw: &str) -> SocialResult<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(SocialError::invalid(format!("Unsupported sort type: {other}"))),
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query-string form of a catalog search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoQuery {
    pub page: PageRequest,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub owner: Option<ObjectId>,
}

impl VideoQuery {
    pub fn from_params(params: &VideoListParams) -> SocialResult<Self> {
        let owner = params
            .user_id
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| ObjectId::parse_labeled(raw, "user"))
            .transpose()?;
        let sort_by = params
            .sort_by
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(SortField::parse)
            .transpose()?
            .unwrap_or_default();
        let sort_order = params
            .sort_type
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(SortOrder::parse)
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            page: PageRequest::coerce(params.page.as_deref(), params.limit.as_deref()),
            search: params
                .query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_owned),
            sort_by,
            sort_order,
            owner,
        })
    }
}

const VIDEO_COLUMNS: &str = r#"
    v.id, v.title, v.description, v.video_file, v.thumbnail, v.duration,
    v.views, v.is_published, v.created_at, v.updated_at,
    v.owner AS owner_id, u.username AS owner_username, u.avatar AS owner_avatar
"#;

fn row_to_video(row: &Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get("id")?,
        owner: UserSummary::from_row(row, "owner")?,
        title: row.get("title")?,
        description: row.get("description")?,
        video_file: row.get("video_file")?,
        thumbnail: row.get("thumbnail")?,
        duration: row.get("duration")?,
        views: row.get("views")?,
        is_published: row.get("is_published")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Fetches one video with its owner projected, or `None` if absent.
pub(crate) fn fetch_video(conn: &Connection, id: ObjectId) -> SocialResult<Option<Video>> {
    let video = conn
        .query_row(
            &format!(
                "SELECT {VIDEO_COLUMNS} FROM videos v LEFT JOIN users u ON u.id = v.owner
                 WHERE v.id = ?1"
            ),
            params![id],
            row_to_video,
        )
        .optional()?;
    Ok(video)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl SocialStore {
    pub fn publish_video(&self, owner: ObjectId, new: &NewVideo) -> SocialResult<Video> {
        if new.title.trim().is_empty() || new.description.trim().is_empty() {
            return Err(SocialError::invalid("Title and description are required"));
        }
        if new.video_file.trim().is_empty() {
            return Err(SocialError::invalid("Video file is required"));
        }
        let duration = new.duration.unwrap_or(0.0);
        if !duration.is_finite() || duration < 0.0 {
            return Err(SocialError::invalid("Duration must be a non-negative number"));
        }

        let id = ObjectId::new();
        let now = Utc::now();
        let video = self.with_transaction(|tx| {
            tx.execute(
                r#"
                INSERT INTO videos (
                    id, owner, title, description, video_file, thumbnail,
                    duration, views, is_published, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 1, ?8, ?8)
                "#,
                params![
                    id,
                    owner,
                    new.title.trim(),
                    new.description.trim(),
                    new.video_file.trim(),
                    new.thumbnail.as_deref().unwrap_or("").trim(),
                    duration,
                    now,
                ],
            )?;
            fetch_video(tx, id)?.ok_or_else(|| {
                SocialError::Internal(anyhow::anyhow!("video {id} vanished after insert"))
            })
        })?;

        info!(video = %id, %owner, "video published");
        Ok(video)
    }

    /// Returns the video and counts the fetch as a view. The increment and the
    /// read share one transaction, so concurrent viewers never lose a count.
    pub fn get_video(&self, video_id: &str) -> SocialResult<Video> {
        let id = ObjectId::parse_labeled(video_id, "video")?;
        self.with_transaction(|tx| {
            let updated = tx.execute(
                "UPDATE videos SET views = views + 1 WHERE id = ?1",
                params![id],
            )?;
            if updated == 0 {
                return Err(SocialError::not_found("Video not found"));
            }
            fetch_video(tx, id)?.ok_or_else(|| SocialError::not_found("Video not found"))
        })
    }

    /// Searches published videos.
    pub fn list_videos(&self, query: &VideoQuery) -> SocialResult<Page<Video>> {
        let mut clauses = vec!["v.is_published = 1".to_owned()];
        let mut values: Vec<Value> = Vec::new();

        if let Some(search) = &query.search {
            let pattern = format!("%{}%", escape_like(search));
            values.push(Value::Text(pattern));
            let n = values.len();
            clauses.push(format!(
                "(v.title LIKE ?{n} ESCAPE '\\' OR v.description LIKE ?{n} ESCAPE '\\')"
            ));
        }
        if let Some(owner) = query.owner {
            values.push(Value::Text(owner.to_string()));
            clauses.push(format!("v.owner = ?{}", values.len()));
        }
        let filter = clauses.join(" AND ");

        self.with_connection(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM videos v WHERE {filter}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )?;

            let mut paged = values.clone();
            paged.push(Value::Integer(i64::from(query.page.limit)));
            let limit_idx = paged.len();
            paged.push(Value::Integer(query.page.offset()));
            let offset_idx = paged.len();

            let sql = format!(
                "SELECT {VIDEO_COLUMNS} FROM videos v LEFT JOIN users u ON u.id = v.owner
                 WHERE {filter}
                 ORDER BY {} {}, v.rowid {}
                 LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
                query.sort_by.column(),
                query.sort_order.keyword(),
                query.sort_order.keyword(),
            );
            let mut stmt = conn.prepare(&sql)?;
            let docs = stmt
                .query_map(params_from_iter(paged.iter()), row_to_video)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            debug!(returned = docs.len(), total, "listed videos");
            Ok(Page::new(docs, total as u64, query.page))
        })
    }

    pub fn update_video(
        &self,
        video_id: &str,
        requester: ObjectId,
        update: &VideoUpdate,
    ) -> SocialResult<Video> {
        let id = ObjectId::parse_labeled(video_id, "video")?;
        let video = self.with_transaction(|tx| {
            authorize_owner(tx, ContentKind::Video, id, requester, Mutation::Update)?;
            tx.execute(
                r#"
                UPDATE videos SET
                    title = COALESCE(?2, title),
                    description = COALESCE(?3, description),
                    thumbnail = COALESCE(?4, thumbnail),
                    updated_at = ?5
                WHERE id = ?1
                "#,
                params![
                    id,
                    non_blank(update.title.as_ref()),
                    non_blank(update.description.as_ref()),
                    non_blank(update.thumbnail.as_ref()),
                    Utc::now(),
                ],
            )?;
            fetch_video(tx, id)?.ok_or_else(|| SocialError::not_found("Video not found"))
        })?;

        info!(video = %id, %requester, "video updated");
        Ok(video)
    }

    /// Deletes a video together with its likes, its comments, and the likes on
    /// those comments.
    pub fn delete_video(&self, video_id: &str, requester: ObjectId) -> SocialResult<()> {
        let id = ObjectId::parse_labeled(video_id, "video")?;
        self.with_transaction(|tx| {
            authorize_owner(tx, ContentKind::Video, id, requester, Mutation::Delete)?;
            let video_likes = purge_likes(tx, ContentKind::Video, id)?;
            let comment_likes = tx.execute(
                r#"
                DELETE FROM likes
                WHERE target_kind = 'comment'
                  AND target_id IN (SELECT id FROM comments WHERE video = ?1)
                "#,
                params![id],
            )?;
            let comments = tx.execute("DELETE FROM comments WHERE video = ?1", params![id])?;
            tx.execute("DELETE FROM videos WHERE id = ?1", params![id])?;
            info!(
                video = %id,
                %requester,
                video_likes,
                comments,
                comment_likes,
                "video deleted"
            );
            Ok(())
        })
    }

    pub fn toggle_publish_status(
        &self,
        video_id: &str,
        requester: ObjectId,
    ) -> SocialResult<Video> {
        let id = ObjectId::parse_labeled(video_id, "video")?;
        let video = self.with_transaction(|tx| {
            authorize_owner(tx, ContentKind::Video, id, requester, Mutation::Update)?;
            tx.execute(
                "UPDATE videos SET is_published = NOT is_published, updated_at = ?2 WHERE id = ?1",
                params![id, Utc::now()],
            )?;
            fetch_video(tx, id)?.ok_or_else(|| SocialError::not_found("Video not found"))
        })?;

        info!(video = %id, published = video.is_published, "video publish status toggled");
        Ok(video)
    }
}
