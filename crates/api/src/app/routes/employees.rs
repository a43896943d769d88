use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use hrdesk_auth::{AccountKind, AccountPatch, NewEmployee, Permission};

use crate::app::dto::{EmployeeListParams, EmployeeUpdated, MessageResponse};
use crate::app::errors::{parse_id, ApiResult};
use crate::app::routes::find_of_kind;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/stats", get(employee_stats))
        .route(
            "/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
}

pub async fn employee_stats(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(services.registry().employee_stats().await?))
}

pub async fn list_employees(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<EmployeeListParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params?;
    let query = params.into_query()?;
    Ok(Json(services.registry().list_employees(&query).await?))
}

pub async fn get_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    Ok(Json(find_of_kind(&services, id, AccountKind::Employee).await?))
}

pub async fn create_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    body: Result<Json<NewEmployee>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    require(&ctx, Permission::CreateEmployee)?;
    let Json(input) = body?;
    let employee = services.registry().create(input.into()).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn update_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    body: Result<Json<AccountPatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    require(&ctx, Permission::UpdateEmployee)?;
    let id = parse_id(&id)?;
    let Json(patch) = body?;

    find_of_kind(&services, id, AccountKind::Employee).await?;
    let employee = services.registry().update(id, patch).await?;
    Ok(Json(EmployeeUpdated {
        message: "Employee updated successfully",
        employee,
    }))
}

pub async fn delete_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require(&ctx, Permission::DeleteEmployee)?;
    let id = parse_id(&id)?;

    find_of_kind(&services, id, AccountKind::Employee).await?;
    services.registry().delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Employee deleted successfully",
    }))
}
