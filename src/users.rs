//! Local copy of user profiles, used only to project owner and subscriber
//! fields. Identity itself lives in the upstream auth service, which pushes
//! profile changes through [`SocialStore::upsert_user`].

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    ObjectId, SocialStore,
    error::{SocialError, SocialResult, require_content},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ObjectId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// `{id, username, avatar}` projection embedded in comments, tweets, videos
/// and subscription listings. Users the directory has never heard of project
/// with just their id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserSummary {
    /// Reads a summary from a row that exposes `<prefix>_id`,
    /// `<prefix>_username` and `<prefix>_avatar` columns.
    pub(crate) fn from_row(row: &Row<'_>, prefix: &str) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(format!("{prefix}_id").as_str())?,
            username: row.get(format!("{prefix}_username").as_str())?,
            avatar: row.get(format!("{prefix}_avatar").as_str())?,
        })
    }
}

impl SocialStore {
    /// Inserts or refreshes a profile pushed by the identity service.
    pub fn upsert_user(&self, profile: &UserProfile) -> SocialResult<UserProfile> {
        require_content(&profile.username, "Username is required")?;

        self.with_transaction(|tx| {
            tx.execute(
                r#"
                INSERT INTO users (id, username, email, avatar, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    username = excluded.username,
                    email = excluded.email,
                    avatar = excluded.avatar,
                    updated_at = excluded.updated_at
                "#,
                params![
                    profile.id,
                    profile.username.trim(),
                    profile.email,
                    profile.avatar,
                    Utc::now(),
                ],
            )?;
            Ok(())
        })?;

        info!(user = %profile.id, "user profile synced");
        self.get_user(profile.id)
    }

    pub fn get_user(&self, id: ObjectId) -> SocialResult<UserProfile> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, username, email, avatar FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(UserProfile {
                        id: row.get("id")?,
                        username: row.get("username")?,
                        email: row.get("email")?,
                        avatar: row.get("avatar")?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| SocialError::not_found("User not found"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::temp_store;

    #[test]
    fn upsert_inserts_then_updates() {
        let (_temp, store) = temp_store();
        let id = ObjectId::new();
        let mut profile = UserProfile {
            id,
            username: "  alice ".into(),
            email: None,
            avatar: None,
        };
        let stored = store.upsert_user(&profile).unwrap();
        assert_eq!(stored.username, "alice");

        profile.username = "alice2".into();
        profile.avatar = Some("https://cdn.example.test/a.png".into());
        let stored = store.upsert_user(&profile).unwrap();
        assert_eq!(stored.username, "alice2");
        assert_eq!(stored.avatar.as_deref(), Some("https://cdn.example.test/a.png"));
    }

    #[test]
    fn blank_username_is_rejected() {
        let (_temp, store) = temp_store();
        let err = store
            .upsert_user(&UserProfile {
                id: ObjectId::new(),
                username: "   ".into(),
                email: None,
                avatar: None,
            })
            .unwrap_err();
        assert!(matches!(err, SocialError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_user_is_not_found() {
        let (_temp, store) = temp_store();
        assert!(matches!(
            store.get_user(ObjectId::new()),
            Err(SocialError::NotFound(_))
        ));
    }
}
