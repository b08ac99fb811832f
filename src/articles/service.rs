use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::db::models::{Article, ArticleId, NewArticle, UserId};
use crate::db::store::{ArticleStore, FavoriteIndex};
use crate::error::{AppError, AuthError};
use crate::Result;

pub struct ArticleService {
    articles: Arc<dyn ArticleStore>,
    favorites: Arc<dyn FavoriteIndex>,
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticleStore>, favorites: Arc<dyn FavoriteIndex>) -> Self {
        Self { articles, favorites }
    }

    pub async fn get(&self, id: ArticleId) -> Result<Article> {
        self.articles
            .get_article(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Article {}", id)))
    }

    #[instrument(skip(self, title, content))]
    pub async fn create(&self, author_id: UserId, title: &str, content: &str) -> Result<Article> {
        let article = self
            .articles
            .create_article(&NewArticle {
                author_id,
                title: title.to_string(),
                content: content.to_string(),
                published_at: Utc::now(),
            })
            .await?;

        info!(article_id = article.id, "Article published");
        Ok(article)
    }

    #[instrument(skip(self, title, content))]
    pub async fn update(&self, caller: UserId, id: ArticleId, title: &str, content: &str) -> Result<()> {
        self.require_author(caller, id).await?;
        if !self.articles.update_article(id, title, content, Utc::now()).await? {
            return Err(AppError::not_found(format!("Article {}", id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, caller: UserId, id: ArticleId) -> Result<()> {
        self.require_author(caller, id).await?;
        if self.articles.delete_article(id).await? {
            info!(article_id = id, "Article deleted");
        }
        Ok(())
    }

    /// Favoriting twice keeps a single edge.
    #[instrument(skip(self))]
    pub async fn favorite(&self, user_id: UserId, id: ArticleId) -> Result<()> {
        self.get(id).await?;
        self.favorites.favorite(user_id, id).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unfavorite(&self, user_id: UserId, id: ArticleId) -> Result<()> {
        self.get(id).await?;
        self.favorites.unfavorite(user_id, id).await?;
        Ok(())
    }

    async fn require_author(&self, caller: UserId, id: ArticleId) -> Result<Article> {
        let article = self.get(id).await?;
        if article.author_id != caller {
            return Err(AuthError::Forbidden.into());
        }
        Ok(article)
    }
}
