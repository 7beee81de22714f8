#![forbid(unsafe_code)]

//! Social interaction layer of the ViewTube backend: likes, comments,
//! subscriptions, tweets, the video catalog they hang off, and the channel
//! dashboard.
//!
//! Everything persists through [`SocialStore`]; [`api`] exposes it over HTTP.

pub mod api;
pub mod comments;
pub mod config;
pub mod content;
pub mod dashboard;
pub mod error;
pub mod ids;
pub mod likes;
pub mod pagination;
pub mod security;
pub mod store;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

pub use error::{SocialError, SocialResult};
pub use ids::ObjectId;
pub use store::SocialStore;
