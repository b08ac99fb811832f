use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::db::models::ArticleId;
use crate::error::AppError;
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub page_index: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn feed(
    user: AuthenticatedUser,
    query: web::Query<FeedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let page_index = query.page_index.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(state.config.feed.default_page_size);

    let articles = state.feed.feed(user.user_id, page_index, page_size).await?;
    Ok(HttpResponse::Ok().json(articles))
}

pub async fn get_article(
    path: web::Path<ArticleId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let article = state.article_service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(article))
}

pub async fn create_article(
    user: AuthenticatedUser,
    req: web::Json<ArticleRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    validation::article(&req.title, &req.content)?;
    let article = state
        .article_service
        .create(user.user_id, &req.title, &req.content)
        .await?;

    info!("User {} published article {}", user.user_id, article.id);
    Ok(HttpResponse::Created()
        .insert_header(("Location", format!("/api/articles/{}", article.id)))
        .json(article))
}

pub async fn update_article(
    user: AuthenticatedUser,
    path: web::Path<ArticleId>,
    req: web::Json<ArticleRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    validation::article(&req.title, &req.content)?;
    state
        .article_service
        .update(user.user_id, path.into_inner(), &req.title, &req.content)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_article(
    user: AuthenticatedUser,
    path: web::Path<ArticleId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.article_service.delete(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn favorite(
    user: AuthenticatedUser,
    path: web::Path<ArticleId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.article_service.favorite(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn unfavorite(
    user: AuthenticatedUser,
    path: web::Path<ArticleId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.article_service.unfavorite(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
