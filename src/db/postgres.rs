use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::models::{
    Article, ArticleId, Comment, CommentId, FollowGraph, NewArticle, NewComment, RefreshSession,
    User, UserFields, UserId,
};
use crate::db::store::{
    ArticleStore, CommentStore, FavoriteIndex, RelationshipGraph, SessionStore, UserStore,
};
use crate::error::DatabaseError;
use crate::Result;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, created_at";

const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.author_id, (u.first_name || ' ' || u.last_name) AS author_name,
           a.title, a.content, a.published_at, a.last_updated,
           (SELECT COUNT(*) FROM favorite_articles f WHERE f.article_id = a.id) AS favorited_count
    FROM articles a
    JOIN users u ON u.id = a.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.article_id, a.title AS article_title, c.author_id,
           (u.first_name || ' ' || u.last_name) AS author_name, c.content, c.published_at
    FROM comments c
    JOIN articles a ON a.id = c.article_id
    JOIN users u ON u.id = c.author_id
"#;

#[derive(Debug, FromRow)]
struct FollowGraphRow {
    id: UserId,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    followers: Vec<UserId>,
    following: Vec<UserId>,
}

impl From<FollowGraphRow> for FollowGraph {
    fn from(row: FollowGraphRow) -> Self {
        FollowGraph {
            user: User {
                id: row.id,
                email: row.email,
                password_hash: row.password_hash,
                first_name: row.first_name,
                last_name: row.last_name,
                created_at: row.created_at,
            },
            followers: row.followers,
            following: row.following,
        }
    }
}

/// Postgres-backed store. Single statements are atomic on their own;
/// multi-statement operations run inside one transaction.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");

        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, fields: &UserFields) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&fields.email)
            .bind(&fields.password_hash)
            .bind(&fields.first_name)
            .bind(&fields.last_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update_user(&self, id: UserId, fields: &UserFields) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET email = $2, password_hash = $3, first_name = $4, last_name = $5 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&fields.email)
            .bind(&fields.password_hash)
            .bind(&fields.first_name)
            .bind(&fields.last_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn put_session(&self, user_id: UserId, session: &RefreshSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(user_id)
        .bind(&session.token)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn rotate_session(
        &self,
        user_id: UserId,
        presented: &str,
        replacement: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        // Compare-and-swap in one statement; the row lock serializes racing refreshes
        let result = sqlx::query(
            r#"
            UPDATE refresh_sessions SET token = $3
            WHERE user_id = $1 AND token = $2 AND expires_at > $4
            "#,
        )
        .bind(user_id)
        .bind(presented)
        .bind(replacement)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_session(&self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RelationshipGraph for PgStore {
    async fn follow(&self, followed: UserId, follower: UserId) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO follows (followed_id, follower_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(followed)
        .bind(follower)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn unfollow(&self, followed: UserId, follower: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE followed_id = $1 AND follower_id = $2")
            .bind(followed)
            .bind(follower)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_user_with_follow_graph(&self, id: UserId) -> Result<Option<FollowGraph>> {
        // One statement, so both id lists come from the same snapshot
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS},
                   ARRAY(SELECT follower_id FROM follows WHERE followed_id = users.id ORDER BY follower_id) AS followers,
                   ARRAY(SELECT followed_id FROM follows WHERE follower_id = users.id ORDER BY followed_id) AS following
            FROM users WHERE id = $1
            "#
        );
        let row = sqlx::query_as::<_, FollowGraphRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(FollowGraph::from))
    }
}

#[async_trait]
impl FavoriteIndex for PgStore {
    async fn favorite(&self, user_id: UserId, article_id: ArticleId) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO favorite_articles (user_id, article_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(article_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn unfavorite(&self, user_id: UserId, article_id: ArticleId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM favorite_articles WHERE user_id = $1 AND article_id = $2")
                .bind(user_id)
                .bind(article_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn create_article(&self, article: &NewArticle) -> Result<Article> {
        let mut transaction = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, ArticleId>(
            r#"
            INSERT INTO articles (author_id, title, content, published_at, last_updated)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id
            "#,
        )
        .bind(article.author_id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.published_at)
        .fetch_one(&mut *transaction)
        .await?;

        let sql = format!("{ARTICLE_SELECT} WHERE a.id = $1");
        let created = sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_one(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(created)
    }

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>> {
        let sql = format!("{ARTICLE_SELECT} WHERE a.id = $1");
        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(article)
    }

    async fn update_article(
        &self,
        id: ArticleId,
        title: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE articles SET title = $2, content = $3, last_updated = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_article(&self, id: ArticleId) -> Result<bool> {
        // Comments and favorites go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_articles_by_authors(
        &self,
        authors: &[UserId],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>> {
        let sql = format!(
            "{ARTICLE_SELECT} WHERE a.author_id = ANY($1) \
             ORDER BY a.last_updated DESC, a.id DESC OFFSET $2 LIMIT $3"
        );
        let articles = sqlx::query_as::<_, Article>(&sql)
            .bind(authors.to_vec())
            .bind(offset.max(0))
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?;

        Ok(articles)
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let mut transaction = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, CommentId>(
            r#"
            INSERT INTO comments (article_id, author_id, content, published_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(comment.article_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.published_at)
        .fetch_one(&mut *transaction)
        .await?;

        let sql = format!("{COMMENT_SELECT} WHERE c.id = $1");
        let created = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_one(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(created)
    }

    async fn get_comment(&self, article_id: ArticleId, id: CommentId) -> Result<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = $1 AND c.article_id = $2");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    async fn get_comments(&self, article_id: ArticleId) -> Result<Vec<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.article_id = $1 ORDER BY c.id");
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(article_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(comments)
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
