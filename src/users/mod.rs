//! User profiles and the follow graph.

pub mod handlers;
mod service;

pub use service::{UserProfile, UserService};
