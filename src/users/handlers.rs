use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::db::models::UserId;
use crate::error::AppError;
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

pub async fn get_user(
    _user: AuthenticatedUser,
    path: web::Path<UserId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state.user_service.profile(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_user(
    user: AuthenticatedUser,
    path: web::Path<UserId>,
    req: web::Json<UpdateUserRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    user.ensure_is(id)?;
    validation::user_fields(&req.email, &req.password, &req.first_name, &req.last_name)?;

    state
        .user_service
        .update(user.user_id, id, &req.email, &req.password, &req.first_name, &req.last_name)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn follow(
    user: AuthenticatedUser,
    path: web::Path<(UserId, UserId)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (acting, target) = path.into_inner();
    info!("User {} requested to follow {}", acting, target);
    state.user_service.follow(user.user_id, acting, target).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn unfollow(
    user: AuthenticatedUser,
    path: web::Path<(UserId, UserId)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (acting, target) = path.into_inner();
    info!("User {} requested to unfollow {}", acting, target);
    state.user_service.unfollow(user.user_id, acting, target).await?;
    Ok(HttpResponse::NoContent().finish())
}
