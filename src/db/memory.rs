//! In-process backend. A single `RwLock` guards the whole state, so each
//! trait call is one atomic unit of work.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::db::edges::EdgeIndex;
use crate::db::models::{
    Article, ArticleId, Comment, CommentId, FollowGraph, NewArticle, NewComment, RefreshSession,
    User, UserFields, UserId,
};
use crate::db::store::{
    ArticleStore, CommentStore, FavoriteIndex, RelationshipGraph, SessionStore, UserStore,
};
use crate::error::DatabaseError;
use crate::Result;

#[derive(Debug, Clone)]
struct ArticleRow {
    id: ArticleId,
    author_id: UserId,
    title: String,
    content: String,
    published_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: CommentId,
    article_id: ArticleId,
    author_id: UserId,
    content: String,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    last_user_id: UserId,
    last_article_id: ArticleId,
    last_comment_id: CommentId,
    users: BTreeMap<UserId, User>,
    sessions: HashMap<UserId, RefreshSession>,
    /// (followed, follower)
    follows: EdgeIndex<UserId, UserId>,
    /// (user, article)
    favorites: EdgeIndex<UserId, ArticleId>,
    articles: BTreeMap<ArticleId, ArticleRow>,
    comments: BTreeMap<CommentId, CommentRow>,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|user| user.email == email && Some(user.id) != except)
    }

    fn require_user(&self, id: UserId) -> Result<&User> {
        self.users.get(&id).ok_or_else(|| DatabaseError::NotFound.into())
    }

    fn author_name(&self, id: UserId) -> String {
        self.users.get(&id).map(User::full_name).unwrap_or_default()
    }

    fn article(&self, row: &ArticleRow) -> Article {
        Article {
            id: row.id,
            author_id: row.author_id,
            author_name: self.author_name(row.author_id),
            title: row.title.clone(),
            content: row.content.clone(),
            published_at: row.published_at,
            last_updated: row.last_updated,
            favorited_count: self.favorites.count_for_second(row.id) as i64,
        }
    }

    fn comment(&self, row: &CommentRow) -> Comment {
        Comment {
            id: row.id,
            article_id: row.article_id,
            article_title: self
                .articles
                .get(&row.article_id)
                .map(|article| article.title.clone())
                .unwrap_or_default(),
            author_id: row.author_id,
            author_name: self.author_name(row.author_id),
            content: row.content.clone(),
            published_at: row.published_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) async fn get_session(&self, user_id: UserId) -> Result<Option<RefreshSession>> {
        Ok(self.state.read().await.sessions.get(&user_id).cloned())
    }

    pub(crate) async fn favorited_count(&self, article_id: ArticleId) -> Result<i64> {
        Ok(self.state.read().await.favorites.count_for_second(article_id) as i64)
    }

    pub(crate) async fn is_favorited(&self, user_id: UserId, article_id: ArticleId) -> Result<bool> {
        Ok(self.state.read().await.favorites.contains(user_id, article_id))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, fields: &UserFields) -> Result<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&fields.email, None) {
            return Err(DatabaseError::Duplicate.into());
        }

        state.last_user_id += 1;
        let user = User {
            id: state.last_user_id,
            email: fields.email.clone(),
            password_hash: fields.password_hash.clone(),
            first_name: fields.first_name.clone(),
            last_name: fields.last_name.clone(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    async fn update_user(&self, id: UserId, fields: &UserFields) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        if state.email_taken(&fields.email, Some(id)) {
            return Err(DatabaseError::Duplicate.into());
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        user.email = fields.email.clone();
        user.password_hash = fields.password_hash.clone();
        user.first_name = fields.first_name.clone();
        user.last_name = fields.last_name.clone();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put_session(&self, user_id: UserId, session: &RefreshSession) -> Result<()> {
        let mut state = self.state.write().await;
        state.require_user(user_id)?;
        state.sessions.insert(user_id, session.clone());
        Ok(())
    }

    async fn rotate_session(
        &self,
        user_id: UserId,
        presented: &str,
        replacement: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.sessions.get_mut(&user_id) {
            Some(session)
                if bool::from(session.token.as_bytes().ct_eq(presented.as_bytes()))
                    && !session.is_expired_at(now) =>
            {
                session.token = replacement.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_session(&self, user_id: UserId) -> Result<bool> {
        Ok(self.state.write().await.sessions.remove(&user_id).is_some())
    }
}

#[async_trait]
impl RelationshipGraph for MemoryStore {
    async fn follow(&self, followed: UserId, follower: UserId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.require_user(followed)?;
        state.require_user(follower)?;
        Ok(state.follows.insert(followed, follower))
    }

    async fn unfollow(&self, followed: UserId, follower: UserId) -> Result<bool> {
        Ok(self.state.write().await.follows.remove(followed, follower))
    }

    async fn get_user_with_follow_graph(&self, id: UserId) -> Result<Option<FollowGraph>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|user| FollowGraph {
            user: user.clone(),
            followers: state.follows.seconds_of(id).collect(),
            following: state.follows.firsts_of(id).collect(),
        }))
    }
}

#[async_trait]
impl FavoriteIndex for MemoryStore {
    async fn favorite(&self, user_id: UserId, article_id: ArticleId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.require_user(user_id)?;
        if !state.articles.contains_key(&article_id) {
            return Err(DatabaseError::NotFound.into());
        }
        Ok(state.favorites.insert(user_id, article_id))
    }

    async fn unfavorite(&self, user_id: UserId, article_id: ArticleId) -> Result<bool> {
        Ok(self.state.write().await.favorites.remove(user_id, article_id))
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn create_article(&self, article: &NewArticle) -> Result<Article> {
        let mut state = self.state.write().await;
        state.require_user(article.author_id)?;

        state.last_article_id += 1;
        let row = ArticleRow {
            id: state.last_article_id,
            author_id: article.author_id,
            title: article.title.clone(),
            content: article.content.clone(),
            published_at: article.published_at,
            last_updated: article.published_at,
        };
        let view = state.article(&row);
        state.articles.insert(row.id, row);
        Ok(view)
    }

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>> {
        let state = self.state.read().await;
        Ok(state.articles.get(&id).map(|row| state.article(row)))
    }

    async fn update_article(
        &self,
        id: ArticleId,
        title: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(row) = state.articles.get_mut(&id) else {
            return Ok(false);
        };
        row.title = title.to_string();
        row.content = content.to_string();
        row.last_updated = updated_at;
        Ok(true)
    }

    async fn delete_article(&self, id: ArticleId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.articles.remove(&id).is_none() {
            return Ok(false);
        }
        state.favorites.remove_second(id);
        state.comments.retain(|_, comment| comment.article_id != id);
        Ok(true)
    }

    async fn get_articles_by_authors(
        &self,
        authors: &[UserId],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>> {
        let state = self.state.read().await;
        let mut rows: Vec<&ArticleRow> = state
            .articles
            .values()
            .filter(|row| authors.contains(&row.author_id))
            .collect();
        rows.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|row| state.article(row))
            .collect())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let mut state = self.state.write().await;
        state.require_user(comment.author_id)?;
        if !state.articles.contains_key(&comment.article_id) {
            return Err(DatabaseError::NotFound.into());
        }

        state.last_comment_id += 1;
        let row = CommentRow {
            id: state.last_comment_id,
            article_id: comment.article_id,
            author_id: comment.author_id,
            content: comment.content.clone(),
            published_at: comment.published_at,
        };
        let view = state.comment(&row);
        state.comments.insert(row.id, row);
        Ok(view)
    }

    async fn get_comment(&self, article_id: ArticleId, id: CommentId) -> Result<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .get(&id)
            .filter(|row| row.article_id == article_id)
            .map(|row| state.comment(row)))
    }

    async fn get_comments(&self, article_id: ArticleId) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .values()
            .filter(|row| row.article_id == article_id)
            .map(|row| state.comment(row))
            .collect())
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        Ok(self.state.write().await.comments.remove(&id).is_some())
    }
}
