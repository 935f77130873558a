use super::common::{created, paginated};
use crate::{
    auth::{AuthRouterExt, Role},
    entities::instructor,
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::instructors::{CreateInstructorInput, UpdateInstructorInput},
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
pub struct InstructorListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Only active (`true`) or inactive (`false`) instructors
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/instructors",
    params(InstructorListQuery),
    responses(
        (status = 200, description = "Instructors", body = ApiResponse<PaginatedResponse<instructor::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "instructors"
)]
pub async fn list_instructors(
    State(state): State<AppState>,
    Query(query): Query<InstructorListQuery>,
) -> ApiResult<PaginatedResponse<instructor::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);
    let (items, total) = state
        .services
        .instructors
        .list_instructors(page, limit, query.active)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/instructors/{id}",
    params(("id" = Uuid, Path, description = "Instructor id")),
    responses(
        (status = 200, description = "Instructor", body = ApiResponse<instructor::Model>),
        (status = 404, description = "Instructor not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "instructors"
)]
pub async fn get_instructor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<instructor::Model> {
    let instructor = state.services.instructors.get_instructor(id).await?;
    Ok(Json(ApiResponse::success(instructor)))
}

#[utoipa::path(
    post,
    path = "/api/v1/instructors",
    request_body = CreateInstructorInput,
    responses(
        (status = 201, description = "Instructor created", body = ApiResponse<instructor::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "instructors"
)]
pub async fn create_instructor(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateInstructorInput>,
) -> Result<(StatusCode, Json<ApiResponse<instructor::Model>>), ServiceError> {
    let instructor = state.services.instructors.create_instructor(input).await?;
    Ok(created(instructor))
}

#[utoipa::path(
    put,
    path = "/api/v1/instructors/{id}",
    params(("id" = Uuid, Path, description = "Instructor id")),
    request_body = UpdateInstructorInput,
    responses(
        (status = 200, description = "Instructor updated", body = ApiResponse<instructor::Model>),
        (status = 404, description = "Instructor not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "instructors"
)]
pub async fn update_instructor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateInstructorInput>,
) -> ApiResult<instructor::Model> {
    let instructor = state
        .services
        .instructors
        .update_instructor(id, input)
        .await?;
    Ok(Json(ApiResponse::success(instructor)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/instructors/{id}",
    params(("id" = Uuid, Path, description = "Instructor id")),
    responses(
        (status = 204, description = "Instructor deleted"),
        (status = 400, description = "Instructor has assignments", body = crate::errors::ErrorResponse),
        (status = 404, description = "Instructor not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "instructors"
)]
pub async fn delete_instructor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.instructors.delete_instructor(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn instructor_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_instructors))
        .route("/:id", get(get_instructor))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/", axum::routing::post(create_instructor))
        .route(
            "/:id",
            axum::routing::put(update_instructor).delete(delete_instructor),
        )
        .with_role(Role::Admin);

    read.merge(write)
}
