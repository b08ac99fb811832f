//! Articles, favorites and the follow feed.

pub mod feed;
pub mod handlers;
mod service;

pub use feed::{FeedAssembler, Pagination};
pub use service::ArticleService;
