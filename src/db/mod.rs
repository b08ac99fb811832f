//! Database module for the conduit server
//!
//! Models, the storage traits the services are written against, and the
//! two backends implementing them.

pub mod edges;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use models::{Article, Comment, FollowGraph, RefreshSession, User};
pub use postgres::PgStore;
pub use store::Stores;
