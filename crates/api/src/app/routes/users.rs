use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use hrdesk_auth::{AccountKind, AccountPatch, NewUser, Permission};

use crate::app::dto::MessageResponse;
use crate::app::errors::{parse_id, ApiResult};
use crate::app::routes::find_of_kind;
use crate::app::services::AppServices;
use crate::authz::{require, require_user_update};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    require(&ctx, Permission::ManageUsers)?;
    Ok(Json(services.registry().list_users().await?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require(&ctx, Permission::ManageUsers)?;
    let id = parse_id(&id)?;
    Ok(Json(find_of_kind(&services, id, AccountKind::User).await?))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    require(&ctx, Permission::ManageUsers)?;
    let Json(input) = body?;
    let account = services.registry().create(input.into()).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    body: Result<Json<AccountPatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let Json(patch) = body?;
    require_user_update(&ctx, id, &patch)?;

    find_of_kind(&services, id, AccountKind::User).await?;
    let account = services.registry().update(id, patch).await?;
    Ok(Json(account))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require(&ctx, Permission::ManageUsers)?;
    let id = parse_id(&id)?;

    find_of_kind(&services, id, AccountKind::User).await?;
    services.registry().delete(id).await?;
    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}
