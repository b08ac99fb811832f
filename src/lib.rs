pub mod articles;
pub mod auth;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod users;
pub mod validation;

use std::sync::Arc;
use actix_web::{web, HttpResponse};
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

use articles::{ArticleService, FeedAssembler};
use auth::{AuthService, TokenService};
use comments::CommentService;
use config::StoreBackend;
use db::{MemoryStore, PgStore, Stores};
use users::UserService;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub tokens: Arc<TokenService>,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub article_service: Arc<ArticleService>,
    pub comment_service: Arc<CommentService>,
    pub feed: Arc<FeedAssembler>,
    pg: Option<Arc<PgStore>>,
}

impl AppState {
    /// Connects to the configured backend and wires the services onto it.
    pub async fn new(config: Settings) -> Result<Self> {
        match config.database.backend {
            StoreBackend::Postgres => {
                let pg = Arc::new(PgStore::connect(&config.database).await?);
                info!("Using Postgres store");
                Ok(Self::assemble(config, Stores::from_backend(pg.clone()), Some(pg)))
            }
            StoreBackend::Memory => Ok(Self::in_memory(config)),
        }
    }

    pub fn in_memory(config: Settings) -> Self {
        info!("Using in-memory store");
        Self::assemble(config, Stores::from_backend(Arc::new(MemoryStore::new())), None)
    }

    fn assemble(config: Settings, stores: Stores, pg: Option<Arc<PgStore>>) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config.auth));
        let auth_service = AuthService::new(
            stores.users.clone(),
            stores.sessions.clone(),
            tokens.clone(),
            &config.auth,
        );
        let user_service = UserService::new(
            stores.users.clone(),
            stores.graph.clone(),
            auth_service.hasher().clone(),
        );
        let feed = FeedAssembler::new(
            stores.graph.clone(),
            stores.articles.clone(),
            config.feed.max_page_size,
        );

        Self {
            tokens,
            auth_service: Arc::new(auth_service),
            user_service: Arc::new(user_service),
            article_service: Arc::new(ArticleService::new(stores.articles.clone(), stores.favorites)),
            comment_service: Arc::new(CommentService::new(stores.comments, stores.articles)),
            feed: Arc::new(feed),
            config: Arc::new(config),
            pg,
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(pg) = &self.pg {
            pg.close().await;
            info!("Database connections closed");
        }
        Ok(())
    }
}

/// Route table, shared by the binary and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use articles::handlers as article;
    use auth::handlers as authn;
    use comments::handlers as comment;
    use users::handlers as user;

    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        AppError::InvalidRequest(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        AppError::InvalidRequest(err.to_string()).into()
    }))
    .route("/health", web::get().to(health_check))
    .service(
        web::scope("/api")
            .service(
                web::scope("/authentication")
                    .route("/signIn", web::post().to(authn::sign_in))
                    .route("/signUp", web::post().to(authn::sign_up))
                    .route("/refresh", web::post().to(authn::refresh))
                    .route("/logout", web::post().to(authn::logout)),
            )
            .service(
                web::scope("/users")
                    .route("/{userId}", web::get().to(user::get_user))
                    .route("/{userId}", web::put().to(user::update_user))
                    .route("/{userId}/follow/{targetId}", web::post().to(user::follow))
                    .route("/{userId}/follow/{targetId}", web::delete().to(user::unfollow)),
            )
            .service(
                web::scope("/articles")
                    .route("", web::get().to(article::feed))
                    .route("", web::post().to(article::create_article))
                    .route("/{articleId}", web::get().to(article::get_article))
                    .route("/{articleId}", web::put().to(article::update_article))
                    .route("/{articleId}", web::delete().to(article::delete_article))
                    .route("/{articleId}/favorite", web::post().to(article::favorite))
                    .route("/{articleId}/favorite", web::delete().to(article::unfavorite))
                    .route("/{articleId}/comments", web::get().to(comment::list_comments))
                    .route("/{articleId}/comments", web::post().to(comment::create_comment))
                    .route("/{articleId}/comments/{commentId}", web::get().to(comment::get_comment))
                    .route("/{articleId}/comments/{commentId}", web::delete().to(comment::delete_comment)),
            ),
    );
}
