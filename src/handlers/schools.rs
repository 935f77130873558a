use super::common::{created, paginated};
use crate::{
    auth::{AuthRouterExt, Role},
    entities::school,
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::schools::{CreateSchoolInput, UpdateSchoolInput},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SchoolListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-sensitive fragment of the school name
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/schools",
    params(SchoolListQuery),
    responses(
        (status = 200, description = "Schools", body = ApiResponse<PaginatedResponse<school::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "schools"
)]
pub async fn list_schools(
    State(state): State<AppState>,
    Query(query): Query<SchoolListQuery>,
) -> ApiResult<PaginatedResponse<school::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);
    let (items, total) = state
        .services
        .schools
        .list_schools(page, limit, query.search)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School id")),
    responses(
        (status = 200, description = "School", body = ApiResponse<school::Model>),
        (status = 404, description = "School not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "schools"
)]
pub async fn get_school(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<school::Model> {
    let school = state.services.schools.get_school(id).await?;
    Ok(Json(ApiResponse::success(school)))
}

#[utoipa::path(
    post,
    path = "/api/v1/schools",
    request_body = CreateSchoolInput,
    responses(
        (status = 201, description = "School created", body = ApiResponse<school::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "schools"
)]
pub async fn create_school(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateSchoolInput>,
) -> Result<(StatusCode, Json<ApiResponse<school::Model>>), ServiceError> {
    let school = state.services.schools.create_school(input).await?;
    Ok(created(school))
}

#[utoipa::path(
    put,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School id")),
    request_body = UpdateSchoolInput,
    responses(
        (status = 200, description = "School updated", body = ApiResponse<school::Model>),
        (status = 404, description = "School not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "schools"
)]
pub async fn update_school(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateSchoolInput>,
) -> ApiResult<school::Model> {
    let school = state.services.schools.update_school(id, input).await?;
    Ok(Json(ApiResponse::success(school)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School id")),
    responses(
        (status = 204, description = "School deleted"),
        (status = 400, description = "School still has requests", body = crate::errors::ErrorResponse),
        (status = 404, description = "School not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "schools"
)]
pub async fn delete_school(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.schools.delete_school(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn school_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_schools))
        .route("/:id", get(get_school))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/", axum::routing::post(create_school))
        .route(
            "/:id",
            axum::routing::put(update_school).delete(delete_school),
        )
        .with_role(Role::Admin);

    read.merge(write)
}
