//! Authentication module for the conduit server
//!
//! Password hashing, access/refresh token handling, the refresh-session
//! state machine and the bearer-token extractor.

pub mod extractor;
pub mod handlers;
pub mod password;
mod service;
pub mod tokens;

pub use extractor::AuthenticatedUser;
pub use password::PasswordHasher;
pub use service::{AuthService, TokenPair};
pub use tokens::{Claims, TokenService};
