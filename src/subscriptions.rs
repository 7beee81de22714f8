//! Subscription graph: directed subscriber → channel edges between users.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::{ObjectId, SocialStore, error::SocialResult, users::UserSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEdge {
    pub id: ObjectId,
    pub subscriber: ObjectId,
    pub channel: ObjectId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Subscribed,
    Unsubscribed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionToggle {
    pub state: SubscriptionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<SubscriptionEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberList {
    pub subscribers: Vec<UserSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelList {
    pub channels: Vec<UserSummary>,
    pub count: usize,
}

/// Users on the far side of every edge whose `anchor` column equals `id`.
/// `anchor`/`far` are fixed column names, never user input.
fn edge_endpoints(
    conn: &Connection,
    anchor: &str,
    far: &str,
    id: ObjectId,
) -> SocialResult<Vec<UserSummary>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT s.{far} AS user_id, u.username AS user_username, u.avatar AS user_avatar
        FROM subscriptions s
        LEFT JOIN users u ON u.id = s.{far}
        WHERE s.{anchor} = ?1
        ORDER BY s.created_at DESC, s.rowid DESC
        "#
    ))?;
    let users = stmt
        .query_map(params![id], |row| UserSummary::from_row(row, "user"))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

impl SocialStore {
    /// Subscribes `subscriber` to `channel_id`, or unsubscribes if the edge
    /// already exists. Atomic in the same way as [`SocialStore::toggle_like`].
    /// Subscribing to yourself is allowed.
    pub fn toggle_subscription(
        &self,
        subscriber: ObjectId,
        channel_id: &str,
    ) -> SocialResult<SubscriptionToggle> {
        let channel = ObjectId::parse_labeled(channel_id, "channel")?;

        self.with_transaction(|tx| {
            let removed = tx.execute(
                "DELETE FROM subscriptions WHERE subscriber = ?1 AND channel = ?2",
                params![subscriber, channel],
            )?;
            if removed > 0 {
                info!(%subscriber, %channel, "unsubscribed");
                return Ok(SubscriptionToggle {
                    state: SubscriptionState::Unsubscribed,
                    edge: None,
                });
            }

            let edge = SubscriptionEdge {
                id: ObjectId::new(),
                subscriber,
                channel,
                created_at: Utc::now(),
            };
            tx.execute(
                r#"
                INSERT INTO subscriptions (id, subscriber, channel, created_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![edge.id, edge.subscriber, edge.channel, edge.created_at],
            )?;
            info!(%subscriber, %channel, "subscribed");
            Ok(SubscriptionToggle {
                state: SubscriptionState::Subscribed,
                edge: Some(edge),
            })
        })
    }

    /// Who subscribes to `channel_id`, newest subscriber first.
    pub fn list_subscribers(&self, channel_id: &str) -> SocialResult<SubscriberList> {
        let channel = ObjectId::parse_labeled(channel_id, "channel")?;
        let subscribers =
            self.with_connection(|conn| edge_endpoints(conn, "channel", "subscriber", channel))?;
        debug!(%channel, count = subscribers.len(), "listed subscribers");
        Ok(SubscriberList {
            count: subscribers.len(),
            subscribers,
        })
    }

    /// Channels `subscriber_id` follows, most recent subscription first. No
    /// subscriptions is an empty list, same as [`Self::list_subscribers`].
    pub fn list_subscribed_channels(&self, subscriber_id: &str) -> SocialResult<ChannelList> {
        let subscriber = ObjectId::parse_labeled(subscriber_id, "subscriber")?;
        let channels =
            self.with_connection(|conn| edge_endpoints(conn, "subscriber", "channel", subscriber))?;
        debug!(%subscriber, count = channels.len(), "listed subscribed channels");
        Ok(ChannelList {
            count: channels.len(),
            channels,
        })
    }
}
