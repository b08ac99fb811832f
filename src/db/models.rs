use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i64;
pub type ArticleId = i64;
pub type CommentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Writable user columns, shared by sign-up and profile updates.
#[derive(Debug, Clone)]
pub struct UserFields {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// The single refresh-token slot a user may hold.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RefreshSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshSession {
    pub fn new(token: String, expires_in_days: i64) -> Self {
        Self {
            token,
            expires_at: Utc::now() + chrono::Duration::days(expires_in_days),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A user hydrated together with both sides of its follow edges.
#[derive(Debug, Clone)]
pub struct FollowGraph {
    pub user: User,
    /// Ids of users following `user`.
    pub followers: Vec<UserId>,
    /// Ids of users `user` follows.
    pub following: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub author_id: UserId,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Always computed from the favorite edges at read time.
    pub favorited_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub article_title: String,
    pub author_id: UserId,
    pub author_name: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub article_id: ArticleId,
    pub author_id: UserId,
    pub content: String,
    pub published_at: DateTime<Utc>,
}
