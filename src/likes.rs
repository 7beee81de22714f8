//! Like toggle engine.
//!
//! A like is an edge from a user to one content item. The item is a tagged
//! target (`ContentKind` + id) rather than three optional columns, and the
//! `(liked_by, target_kind, target_id)` triple is unique in storage.

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    ObjectId, SocialStore,
    content::ContentKind,
    error::SocialResult,
    videos::{Video, fetch_video},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeTarget {
    pub kind: ContentKind,
    pub target_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeEdge {
    pub id: ObjectId,
    pub liked_by: ObjectId,
    pub target: LikeTarget,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeState {
    Liked,
    Unliked,
}

/// Outcome of a toggle. `edge` is only present when the call created one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub state: LikeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<LikeEdge>,
}

/// A like on a video with the video resolved. `video` is `None` when the
/// liked id never existed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikedVideo {
    #[serde(flatten)]
    pub edge: LikeEdge,
    pub video: Option<Video>,
}

fn row_to_edge(row: &Row<'_>) -> rusqlite::Result<LikeEdge> {
    Ok(LikeEdge {
        id: row.get("id")?,
        liked_by: row.get("liked_by")?,
        target: LikeTarget {
            kind: row.get("target_kind")?,
            target_id: row.get("target_id")?,
        },
        created_at: row.get("created_at")?,
    })
}

impl SocialStore {
    /// Flips the like state of `(requester, kind, target_id)`.
    ///
    /// The delete is attempted first; only when it removed nothing is a new
    /// edge inserted. Both statements run under one `IMMEDIATE` transaction,
    /// so two concurrent toggles serialize instead of racing. The target is not
    /// required to exist.
    pub fn toggle_like(
        &self,
        requester: ObjectId,
        kind: ContentKind,
        target_id: &str,
    ) -> SocialResult<LikeToggle> {
        let target_id = ObjectId::parse_labeled(target_id, kind.as_str())?;
        let target = LikeTarget { kind, target_id };

        self.with_transaction(|tx| {
            let removed = tx.execute(
                "DELETE FROM likes WHERE liked_by = ?1 AND target_kind = ?2 AND target_id = ?3",
                params![requester, kind, target_id],
            )?;
            if removed > 0 {
                info!(user = %requester, %kind, target = %target_id, "unliked");
                return Ok(LikeToggle {
                    state: LikeState::Unliked,
                    edge: None,
                });
            }

            let edge = LikeEdge {
                id: ObjectId::new(),
                liked_by: requester,
                target,
                created_at: Utc::now(),
            };
            tx.execute(
                r#"
                INSERT INTO likes (id, liked_by, target_kind, target_id, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![edge.id, edge.liked_by, kind, target_id, edge.created_at],
            )?;
            info!(user = %requester, %kind, target = %target_id, "liked");
            Ok(LikeToggle {
                state: LikeState::Liked,
                edge: Some(edge),
            })
        })
    }

    /// Videos liked by `user`, newest like first. Empty when there are none.
    pub fn list_liked_videos(&self, user: ObjectId) -> SocialResult<Vec<LikedVideo>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, liked_by, target_kind, target_id, created_at
                FROM likes
                WHERE liked_by = ?1 AND target_kind = ?2
                ORDER BY created_at DESC, rowid DESC
                "#,
            )?;
            let edges = stmt
                .query_map(params![user, ContentKind::Video], row_to_edge)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut liked = Vec::with_capacity(edges.len());
            for edge in edges {
                let video = fetch_video(conn, edge.target.target_id)?;
                liked.push(LikedVideo { edge, video });
            }
            debug!(%user, count = liked.len(), "listed liked videos");
            Ok(liked)
        })
    }
}
