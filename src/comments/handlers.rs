use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthenticatedUser;
use crate::db::models::{ArticleId, CommentId};
use crate::error::AppError;
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

pub async fn list_comments(
    path: web::Path<ArticleId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let comments = state.comment_service.list(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub async fn get_comment(
    path: web::Path<(ArticleId, CommentId)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (article_id, comment_id) = path.into_inner();
    let comment = state.comment_service.get(article_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(comment))
}

pub async fn create_comment(
    user: AuthenticatedUser,
    path: web::Path<ArticleId>,
    req: web::Json<CommentRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    validation::comment(&req.content)?;
    let article_id = path.into_inner();
    let comment = state
        .comment_service
        .create(user.user_id, article_id, &req.content)
        .await?;

    Ok(HttpResponse::Created()
        .insert_header((
            "Location",
            format!("/api/articles/{}/comments/{}", article_id, comment.id),
        ))
        .json(comment))
}

pub async fn delete_comment(
    user: AuthenticatedUser,
    path: web::Path<(ArticleId, CommentId)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (article_id, comment_id) = path.into_inner();
    state
        .comment_service
        .delete(user.user_id, article_id, comment_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
