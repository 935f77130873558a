use super::common::{created, paginated, PaginationParams};
use crate::{
    auth::{AuthRouterExt, Role},
    entities::program,
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::programs::{CreateProgramInput, UpdateProgramInput},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/programs",
    params(PaginationParams),
    responses(
        (status = 200, description = "All programs, retired ones included", body = ApiResponse<PaginatedResponse<program::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "programs"
)]
pub async fn list_programs(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<program::Model>> {
    let (page, limit) = pagination.resolve(&state.config);
    let (items, total) = state
        .services
        .programs
        .list_programs(page, limit, false)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/programs/{id}",
    params(("id" = Uuid, Path, description = "Program id")),
    responses(
        (status = 200, description = "Program", body = ApiResponse<program::Model>),
        (status = 404, description = "Program not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "programs"
)]
pub async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<program::Model> {
    let program = state.services.programs.get_program(id).await?;
    Ok(Json(ApiResponse::success(program)))
}

#[utoipa::path(
    post,
    path = "/api/v1/programs",
    request_body = CreateProgramInput,
    responses(
        (status = 201, description = "Program created", body = ApiResponse<program::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "programs"
)]
pub async fn create_program(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateProgramInput>,
) -> Result<(StatusCode, Json<ApiResponse<program::Model>>), ServiceError> {
    let program = state.services.programs.create_program(input).await?;
    Ok(created(program))
}

#[utoipa::path(
    put,
    path = "/api/v1/programs/{id}",
    params(("id" = Uuid, Path, description = "Program id")),
    request_body = UpdateProgramInput,
    responses(
        (status = 200, description = "Program updated", body = ApiResponse<program::Model>),
        (status = 404, description = "Program not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "programs"
)]
pub async fn update_program(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateProgramInput>,
) -> ApiResult<program::Model> {
    let program = state.services.programs.update_program(id, input).await?;
    Ok(Json(ApiResponse::success(program)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/programs/{id}",
    params(("id" = Uuid, Path, description = "Program id")),
    responses(
        (status = 204, description = "Program deleted"),
        (status = 404, description = "Program not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "programs"
)]
pub async fn delete_program(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.programs.delete_program(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn program_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_programs))
        .route("/:id", get(get_program))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/", axum::routing::post(create_program))
        .route(
            "/:id",
            axum::routing::put(update_program).delete(delete_program),
        )
        .with_role(Role::Admin);

    read.merge(write)
}
