//! Read-only channel dashboard built from the subscription, video and like
//! tables.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use tracing::debug;

use crate::{ObjectId, SocialStore, content::ContentKind, error::SocialResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_subscribers: i64,
    pub total_videos: i64,
    pub total_views: i64,
    pub total_likes: i64,
}

/// A video as the channel owner sees it on the dashboard; the owner is
/// implied and left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelVideo {
    pub id: ObjectId,
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

impl SocialStore {
    /// Totals for `owner`'s channel. Every figure is zero for a channel with
    /// no rows. The three queries share one read transaction so the numbers
    /// come from a single snapshot.
    pub fn get_channel_stats(&self, owner: ObjectId) -> SocialResult<ChannelStats> {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()?;
            let total_subscribers = tx.query_row(
                "SELECT COUNT(*) FROM subscriptions WHERE channel = ?1",
                params![owner],
                |row| row.get(0),
            )?;
            let (total_videos, total_views) = tx.query_row(
                "SELECT COUNT(*), COALESCE(SUM(views), 0) FROM videos WHERE owner = ?1",
                params![owner],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let total_likes = tx.query_row(
                r#"
                SELECT COUNT(*)
                FROM likes l
                JOIN videos v ON v.id = l.target_id
                WHERE l.target_kind = ?1 AND v.owner = ?2
                "#,
                params![ContentKind::Video, owner],
                |row| row.get(0),
            )?;
            tx.commit()?;

            let stats = ChannelStats {
                total_subscribers,
                total_videos,
                total_views,
                total_likes,
            };
            debug!(%owner, ?stats, "computed channel stats");
            Ok(stats)
        })
    }

    /// Every video `owner` has uploaded, published or not, newest first.
    pub fn get_channel_videos(&self, owner: ObjectId) -> SocialResult<Vec<ChannelVideo>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, title, description, video_file, thumbnail, duration,
                       views, is_published, created_at, updated_at
                FROM videos
                WHERE owner = ?1
                ORDER BY created_at DESC, rowid DESC
                "#,
            )?;
            let videos = stmt
                .query_map(params![owner], |row| {
                    Ok(ChannelVideo {
                        id: row.get("id")?,
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
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(videos)
        })
    }
}
