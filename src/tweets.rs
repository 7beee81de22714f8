//! Short text posts owned by a user.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    ObjectId, SocialStore,
    content::{ContentKind, Mutation, authorize_owner, purge_likes},
    error::{SocialError, SocialResult, require_content},
    users::UserSummary,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: ObjectId,
    pub content: String,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TWEET_COLUMNS: &str = r#"
    t.id, t.content, t.created_at, t.updated_at,
    t.owner AS owner_id, u.username AS owner_username, u.avatar AS owner_avatar
"#;

fn row_to_tweet(row: &Row<'_>) -> rusqlite::Result<Tweet> {
    Ok(Tweet {
        id: row.get("id")?,
        content: row.get("content")?,
        owner: UserSummary::from_row(row, "owner")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn fetch_tweet(conn: &Connection, id: ObjectId) -> SocialResult<Tweet> {
    conn.query_row(
        &format!(
            "SELECT {TWEET_COLUMNS} FROM tweets t LEFT JOIN users u ON u.id = t.owner
             WHERE t.id = ?1"
        ),
        params![id],
        row_to_tweet,
    )
    .optional()?
    .ok_or_else(|| SocialError::not_found("Tweet not found"))
}

impl SocialStore {
    pub fn create_tweet(&self, owner: ObjectId, content: &str) -> SocialResult<Tweet> {
        require_content(content, "Tweet content is required")?;

        let id = ObjectId::new();
        let tweet = self.with_transaction(|tx| {
            let now = Utc::now();
            tx.execute(
                r#"
                INSERT INTO tweets (id, content, owner, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                "#,
                params![id, content, owner, now],
            )?;
            fetch_tweet(tx, id)
                .map_err(|err| err.into_internal("Something went wrong while creating the tweet"))
        })?;

        info!(tweet = %id, %owner, "tweet created");
        Ok(tweet)
    }

    pub fn get_tweet(&self, tweet_id: &str) -> SocialResult<Tweet> {
        let id = ObjectId::parse_labeled(tweet_id, "tweet")?;
        self.with_connection(|conn| fetch_tweet(conn, id))
    }

    /// All tweets by `user_id`, newest first. Empty when the user never
    /// tweeted.
    pub fn list_user_tweets(&self, user_id: &str) -> SocialResult<Vec<Tweet>> {
        let owner = ObjectId::parse_labeled(user_id, "user")?;
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TWEET_COLUMNS} FROM tweets t LEFT JOIN users u ON u.id = t.owner
                 WHERE t.owner = ?1
                 ORDER BY t.created_at DESC, t.rowid DESC"
            ))?;
            let tweets = stmt
                .query_map(params![owner], row_to_tweet)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            debug!(%owner, count = tweets.len(), "listed tweets");
            Ok(tweets)
        })
    }

    pub fn update_tweet(
        &self,
        tweet_id: &str,
        requester: ObjectId,
        content: &str,
    ) -> SocialResult<Tweet> {
        let id = ObjectId::parse_labeled(tweet_id, "tweet")?;
        require_content(content, "Tweet content is required")?;

        let tweet = self.with_transaction(|tx| {
            authorize_owner(tx, ContentKind::Tweet, id, requester, Mutation::Update)?;
            tx.execute(
                "UPDATE tweets SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, content, Utc::now()],
            )?;
            fetch_tweet(tx, id)
        })?;

        info!(tweet = %id, %requester, "tweet updated");
        Ok(tweet)
    }

    /// Hard-deletes a tweet owned by `requester` along with its likes.
    pub fn delete_tweet(&self, tweet_id: &str, requester: ObjectId) -> SocialResult<()> {
        let id = ObjectId::parse_labeled(tweet_id, "tweet")?;
        self.with_transaction(|tx| {
            authorize_owner(tx, ContentKind::Tweet, id, requester, Mutation::Delete)?;
            let likes = purge_likes(tx, ContentKind::Tweet, id)?;
            tx.execute("DELETE FROM tweets WHERE id = ?1", params![id])?;
            info!(tweet = %id, %requester, likes, "tweet deleted");
            Ok(())
        })
    }
}
