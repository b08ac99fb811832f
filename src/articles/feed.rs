use std::sync::Arc;

use tracing::{debug, instrument};

use crate::db::models::{Article, UserId};
use crate::db::store::{ArticleStore, RelationshipGraph};
use crate::error::AppError;
use crate::Result;

/// A resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Pagination {
    /// Pages are 1-based; indices below 1 select the first page. A
    /// non-positive size selects nothing.
    pub fn new(page_index: i64, page_size: i64, max_page_size: i64) -> Self {
        let limit = page_size.clamp(0, max_page_size.max(0));
        let page = page_index.max(1);
        Self {
            offset: (page - 1).saturating_mul(limit),
            limit,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }
}

/// Recency-ordered articles written by the accounts a user follows.
pub struct FeedAssembler {
    graph: Arc<dyn RelationshipGraph>,
    articles: Arc<dyn ArticleStore>,
    max_page_size: i64,
}

impl FeedAssembler {
    pub fn new(
        graph: Arc<dyn RelationshipGraph>,
        articles: Arc<dyn ArticleStore>,
        max_page_size: i64,
    ) -> Self {
        Self {
            graph,
            articles,
            max_page_size,
        }
    }

    #[instrument(skip(self))]
    pub async fn feed(&self, user_id: UserId, page_index: i64, page_size: i64) -> Result<Vec<Article>> {
        let graph = self
            .graph
            .get_user_with_follow_graph(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {}", user_id)))?;

        let page = Pagination::new(page_index, page_size, self.max_page_size);
        if graph.following.is_empty() || page.is_empty() {
            return Ok(Vec::new());
        }

        let articles = self
            .articles
            .get_articles_by_authors(&graph.following, page.offset, page.limit)
            .await?;
        debug!(count = articles.len(), offset = page.offset, "Feed page assembled");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::models::{NewArticle, UserFields};
    use crate::db::store::UserStore;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;

    #[test]
    fn test_pagination_window() {
        assert_eq!(Pagination::new(1, 10, 15), Pagination { offset: 0, limit: 10 });
        assert_eq!(Pagination::new(3, 10, 15), Pagination { offset: 20, limit: 10 });
        assert_eq!(Pagination::new(2, 100, 15), Pagination { offset: 15, limit: 15 });
        assert_eq!(Pagination::new(0, 10, 15), Pagination::new(1, 10, 15));
        assert_eq!(Pagination::new(-4, 10, 15), Pagination::new(1, 10, 15));
        assert!(Pagination::new(1, 0, 15).is_empty());
        assert!(Pagination::new(1, -3, 15).is_empty());
    }

    async fn user(store: &MemoryStore, email: &str) -> UserId {
        store
            .create_user(&UserFields {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                first_name: "Feed".to_string(),
                last_name: "User".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    /// Reader follows two authors who wrote `count` articles between them,
    /// each a minute newer than the last.
    async fn populated(count: i64) -> (FeedAssembler, Arc<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let reader = user(&store, "reader@example.com").await;
        let first = user(&store, "first@example.com").await;
        let second = user(&store, "second@example.com").await;
        let stranger = user(&store, "stranger@example.com").await;
        store.follow(first, reader).await.unwrap();
        store.follow(second, reader).await.unwrap();

        let base = Utc::now() - Duration::days(1);
        for i in 0..count {
            let author = if i % 2 == 0 { first } else { second };
            store
                .create_article(&NewArticle {
                    author_id: author,
                    title: format!("Article {}", i),
                    content: "Body".to_string(),
                    published_at: base + Duration::minutes(i),
                })
                .await
                .unwrap();
        }
        store
            .create_article(&NewArticle {
                author_id: stranger,
                title: "Unfollowed".to_string(),
                content: "Body".to_string(),
                published_at: Utc::now(),
            })
            .await
            .unwrap();

        (FeedAssembler::new(store.clone(), store.clone(), 15), store, reader)
    }

    #[tokio::test]
    async fn test_page_size_is_clamped() {
        let (feed, _, reader) = populated(20).await;
        let page = feed.feed(reader, 1, 100).await.unwrap();
        assert_eq!(page.len(), 15);
    }

    #[tokio::test]
    async fn test_pages_are_disjoint_and_ordered() {
        let (feed, _, reader) = populated(20).await;
        let first = feed.feed(reader, 1, 10).await.unwrap();
        let second = feed.feed(reader, 2, 10).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 10);

        let all: Vec<&Article> = first.iter().chain(second.iter()).collect();
        let ids: HashSet<_> = all.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 20);
        assert!(all.windows(2).all(|w| w[0].last_updated >= w[1].last_updated));
        assert!(all.iter().all(|a| a.title != "Unfollowed"));
        assert_eq!(first[0].title, "Article 19");

        assert!(feed.feed(reader, 3, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_page_zero_is_first_page() {
        let (feed, _, reader) = populated(5).await;
        assert_eq!(feed.feed(reader, 0, 3).await.unwrap(), feed.feed(reader, 1, 3).await.unwrap());
        assert!(feed.feed(reader, 1, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_following_nobody_gives_empty_feed() {
        let (feed, store, _) = populated(5).await;
        let loner = user(&store, "loner@example.com").await;
        assert!(feed.feed(loner, 1, 10).await.unwrap().is_empty());

        let err = feed.feed(999, 1, 10).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_equal_timestamps_fall_back_to_newest_id() {
        let store = Arc::new(MemoryStore::new());
        let reader = user(&store, "reader@example.com").await;
        let author = user(&store, "author@example.com").await;
        store.follow(author, reader).await.unwrap();

        let instant = Utc::now();
        for i in 0..5 {
            store
                .create_article(&NewArticle {
                    author_id: author,
                    title: format!("Same time {}", i),
                    content: "Body".to_string(),
                    published_at: instant,
                })
                .await
                .unwrap();
        }

        let feed = FeedAssembler::new(store.clone(), store.clone(), 15);
        let ids: Vec<_> = feed.feed(reader, 1, 10).await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);

        let second: Vec<_> = feed.feed(reader, 2, 2).await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(second, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_updated_article_moves_to_front() {
        let (feed, store, reader) = populated(4).await;
        let oldest = feed.feed(reader, 1, 10).await.unwrap().last().unwrap().id;
        store.update_article(oldest, "Edited", "Body", Utc::now()).await.unwrap();

        assert_eq!(feed.feed(reader, 1, 10).await.unwrap()[0].id, oldest);
    }
}
