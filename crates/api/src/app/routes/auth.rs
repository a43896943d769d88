use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use hrdesk_auth::NewUser;

use crate::app::dto::LoginRequest;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::AuthContext;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = body?;
    let session = services.sessions.register(input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    request.validate()?;
    let session = services.sessions.login(&request.email, &request.password).await?;
    Ok(Json(session))
}

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    let account = services.sessions.profile(ctx.claims()).await?;
    Ok(Json(account))
}
