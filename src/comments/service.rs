use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::db::models::{ArticleId, Comment, CommentId, NewComment, UserId};
use crate::db::store::{ArticleStore, CommentStore};
use crate::error::{AppError, AuthError};
use crate::Result;

pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    articles: Arc<dyn ArticleStore>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentStore>, articles: Arc<dyn ArticleStore>) -> Self {
        Self { comments, articles }
    }

    pub async fn list(&self, article_id: ArticleId) -> Result<Vec<Comment>> {
        self.require_article(article_id).await?;
        self.comments.get_comments(article_id).await
    }

    pub async fn get(&self, article_id: ArticleId, id: CommentId) -> Result<Comment> {
        self.comments
            .get_comment(article_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Comment {} on article {}", id, article_id)))
    }

    #[instrument(skip(self, content))]
    pub async fn create(&self, author_id: UserId, article_id: ArticleId, content: &str) -> Result<Comment> {
        self.require_article(article_id).await?;
        let comment = self
            .comments
            .create_comment(&NewComment {
                article_id,
                author_id,
                content: content.to_string(),
                published_at: Utc::now(),
            })
            .await?;

        info!(comment_id = comment.id, "Comment posted");
        Ok(comment)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, caller: UserId, article_id: ArticleId, id: CommentId) -> Result<()> {
        let comment = self.get(article_id, id).await?;
        if comment.author_id != caller {
            return Err(AuthError::Forbidden.into());
        }
        self.comments.delete_comment(id).await?;
        Ok(())
    }

    async fn require_article(&self, article_id: ArticleId) -> Result<()> {
        match self.articles.get_article(article_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(format!("Article {}", article_id))),
        }
    }
}
