//! Storage seams for the core.
//!
//! Every mutating method is one unit of work: it either applies completely
//! or not at all. Backends serialize concurrent writers on the same rows.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{
    Article, ArticleId, Comment, CommentId, FollowGraph, NewArticle, NewComment, RefreshSession,
    User, UserFields, UserId,
};
use crate::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DatabaseError::Duplicate` if the email is taken.
    async fn create_user(&self, fields: &UserFields) -> Result<User>;

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Exact, case-sensitive match.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns `None` if the user does not exist.
    async fn update_user(&self, id: UserId, fields: &UserFields) -> Result<Option<User>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Overwrites whatever slot the user held.
    async fn put_session(&self, user_id: UserId, session: &RefreshSession) -> Result<()>;

    /// Swaps the stored token for `replacement` only if the slot exists,
    /// holds `presented`, and has not expired at `now`. Expiry is kept.
    async fn rotate_session(
        &self,
        user_id: UserId,
        presented: &str,
        replacement: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Returns `true` if a slot was present.
    async fn clear_session(&self, user_id: UserId) -> Result<bool>;
}

#[async_trait]
pub trait RelationshipGraph: Send + Sync {
    /// Adds the edge `follower -> followed`; `false` if it already existed.
    async fn follow(&self, followed: UserId, follower: UserId) -> Result<bool>;

    /// Removes the edge; `false` if there was none.
    async fn unfollow(&self, followed: UserId, follower: UserId) -> Result<bool>;

    async fn get_user_with_follow_graph(&self, id: UserId) -> Result<Option<FollowGraph>>;
}

#[async_trait]
pub trait FavoriteIndex: Send + Sync {
    /// `false` if the user had already favorited the article.
    async fn favorite(&self, user_id: UserId, article_id: ArticleId) -> Result<bool>;

    /// `false` if there was nothing to remove.
    async fn unfavorite(&self, user_id: UserId, article_id: ArticleId) -> Result<bool>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn create_article(&self, article: &NewArticle) -> Result<Article>;

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>>;

    /// Returns `false` if the article does not exist.
    async fn update_article(
        &self,
        id: ArticleId,
        title: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Removes the article together with its comments and favorite edges.
    async fn delete_article(&self, id: ArticleId) -> Result<bool>;

    /// Articles by any of `authors`, newest `last_updated` first, ties by id
    /// descending.
    async fn get_articles_by_authors(
        &self,
        authors: &[UserId],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, comment: &NewComment) -> Result<Comment>;

    /// Only returns the comment if it belongs to `article_id`.
    async fn get_comment(&self, article_id: ArticleId, id: CommentId) -> Result<Option<Comment>>;

    async fn get_comments(&self, article_id: ArticleId) -> Result<Vec<Comment>>;

    async fn delete_comment(&self, id: CommentId) -> Result<bool>;
}

/// Trait-object handles onto one backend.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub graph: Arc<dyn RelationshipGraph>,
    pub favorites: Arc<dyn FavoriteIndex>,
    pub articles: Arc<dyn ArticleStore>,
    pub comments: Arc<dyn CommentStore>,
}

impl Stores {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore
            + SessionStore
            + RelationshipGraph
            + FavoriteIndex
            + ArticleStore
            + CommentStore
            + 'static,
    {
        Self {
            users: backend.clone(),
            sessions: backend.clone(),
            graph: backend.clone(),
            favorites: backend.clone(),
            articles: backend.clone(),
            comments: backend,
        }
    }
}
