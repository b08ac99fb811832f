use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, error, warn};

use crate::auth::extractor::AuthenticatedUser;
use crate::users::UserProfile;
use crate::validation;
use crate::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

pub async fn sign_in(
    req: web::Json<SignInRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received sign-in request for email: {}", req.email);
    match state.auth_service.sign_in(&req.email, &req.password).await {
        Ok(tokens) => {
            info!("Sign-in successful for email: {}", req.email);
            Ok(HttpResponse::Ok().json(tokens))
        }
        Err(e) => {
            warn!("Sign-in failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn sign_up(
    req: web::Json<SignUpRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received sign-up request for email: {}", req.email);
    validation::user_fields(&req.email, &req.password, &req.first_name, &req.last_name)?;

    let user = match state
        .auth_service
        .sign_up(&req.email, &req.password, &req.first_name, &req.last_name)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            error!("Sign-up failed for email: {}: {}", req.email, e);
            return Err(e);
        }
    };

    let profile = UserProfile::new(&user, 0, 0);
    Ok(HttpResponse::Created()
        .insert_header(("Location", format!("/api/users/{}", user.id)))
        .json(profile))
}

pub async fn refresh(
    req: web::Json<RefreshRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let tokens = state
        .auth_service
        .refresh(&req.access_token, &req.refresh_token)
        .await?;

    Ok(HttpResponse::Ok().json(tokens))
}

pub async fn logout(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.auth_service.logout(user.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
