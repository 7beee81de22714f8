//! Owned content items: videos, comments and tweets.
//!
//! These are the three things a user can like, and the three things whose
//! mutation is gated on ownership. `ContentKind` maps each one to the table
//! that stores it.

use std::fmt;

use rusqlite::{
    Connection, OptionalExtension, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    ObjectId,
    error::{SocialError, SocialResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Comment,
    Tweet,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Comment => "comment",
            Self::Tweet => "tweet",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::Video => "videos",
            Self::Comment => "comments",
            Self::Tweet => "tweets",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Comment => "Comment",
            Self::Tweet => "Tweet",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for ContentKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ContentKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "video" => Ok(Self::Video),
            "comment" => Ok(Self::Comment),
            "tweet" => Ok(Self::Tweet),
            other => Err(FromSqlError::Other(
                format!("unknown content kind {other:?}").into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mutation {
    Update,
    Delete,
}

impl Mutation {
    fn verb(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Looks up the owner of `id` and fails unless it is `requester`.
///
/// Callers run this inside the same `IMMEDIATE` transaction as the mutation it
/// guards, so the owner cannot change between the check and the write.
pub(crate) fn authorize_owner(
    conn: &Connection,
    kind: ContentKind,
    id: ObjectId,
    requester: ObjectId,
    mutation: Mutation,
) -> SocialResult<()> {
    let owner: Option<ObjectId> = conn
        .query_row(
            &format!("SELECT owner FROM {} WHERE id = ?1", kind.table()),
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        None => Err(SocialError::not_found(format!("{} not found", kind.title()))),
        Some(owner) if owner != requester => {
            warn!(%kind, %id, %requester, action = mutation.verb(), "ownership check failed");
            Err(SocialError::denied(format!(
                "You don't have permission to {} this {}",
                mutation.verb(),
                kind
            )))
        }
        Some(_) => Ok(()),
    }
}

/// Deletes every like that points at the given item. Returns how many were
/// removed.
pub(crate) fn purge_likes(
    conn: &Connection,
    kind: ContentKind,
    id: ObjectId,
) -> SocialResult<usize> {
    let removed = conn.execute(
        "DELETE FROM likes WHERE target_kind = ?1 AND target_id = ?2",
        params![kind, id],
    )?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{seed_user, temp_store};

    #[test]
    fn every_kind_maps_to_a_table() {
        assert_eq!(ContentKind::Video.table(), "videos");
        assert_eq!(ContentKind::Comment.table(), "comments");
        assert_eq!(ContentKind::Tweet.table(), "tweets");
    }

    #[test]
    fn kinds_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&ContentKind::Comment).unwrap(),
            "\"comment\""
        );
    }

    #[test]
    fn authorize_owner_distinguishes_missing_and_foreign() {
        let (_temp, store) = temp_store();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let tweet = store.create_tweet(alice, "hello").unwrap();

        store
            .with_connection(|conn| {
                authorize_owner(conn, ContentKind::Tweet, tweet.id, alice, Mutation::Update)
            })
            .unwrap();

        let denied = store
            .with_connection(|conn| {
                authorize_owner(conn, ContentKind::Tweet, tweet.id, bob, Mutation::Delete)
            })
            .unwrap_err();
        assert!(matches!(
            denied,
            SocialError::PermissionDenied(message)
                if message == "You don't have permission to delete this tweet"
        ));

        let missing = store
            .with_connection(|conn| {
                authorize_owner(
                    conn,
                    ContentKind::Comment,
                    ObjectId::new(),
                    alice,
                    Mutation::Update,
                )
            })
            .unwrap_err();
        assert!(matches!(missing, SocialError::NotFound(message) if message == "Comment not found"));
    }
}
