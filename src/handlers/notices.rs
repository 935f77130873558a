use super::common::{created, paginated, PaginationParams};
use crate::{
    auth::{AuthRouterExt, Role},
    entities::notice,
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::notices::{CreateNoticeInput, UpdateNoticeInput},
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
    path = "/api/v1/notices",
    params(PaginationParams),
    responses(
        (status = 200, description = "All notices, drafts included", body = ApiResponse<PaginatedResponse<notice::Model>>),
    ),
    security(("Bearer" = [])),
    tag = "notices"
)]
pub async fn list_notices(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<notice::Model>> {
    let (page, limit) = pagination.resolve(&state.config);
    let (items, total) = state.services.notices.list_notices(page, limit).await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice id")),
    responses(
        (status = 200, description = "Notice", body = ApiResponse<notice::Model>),
        (status = 404, description = "Notice not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "notices"
)]
pub async fn get_notice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<notice::Model> {
    let notice = state.services.notices.get_notice(id).await?;
    Ok(Json(ApiResponse::success(notice)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notices",
    request_body = CreateNoticeInput,
    responses(
        (status = 201, description = "Notice created", body = ApiResponse<notice::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "notices"
)]
pub async fn create_notice(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateNoticeInput>,
) -> Result<(StatusCode, Json<ApiResponse<notice::Model>>), ServiceError> {
    let notice = state.services.notices.create_notice(input).await?;
    Ok(created(notice))
}

#[utoipa::path(
    put,
    path = "/api/v1/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice id")),
    request_body = UpdateNoticeInput,
    responses(
        (status = 200, description = "Notice updated", body = ApiResponse<notice::Model>),
        (status = 404, description = "Notice not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "notices"
)]
pub async fn update_notice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateNoticeInput>,
) -> ApiResult<notice::Model> {
    let notice = state.services.notices.update_notice(id, input).await?;
    Ok(Json(ApiResponse::success(notice)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice id")),
    responses(
        (status = 204, description = "Notice deleted"),
        (status = 404, description = "Notice not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "notices"
)]
pub async fn delete_notice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.notices.delete_notice(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn notice_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_notices))
        .route("/:id", get(get_notice))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/", axum::routing::post(create_notice))
        .route(
            "/:id",
            axum::routing::put(update_notice).delete(delete_notice),
        )
        .with_role(Role::Admin);

    read.merge(write)
}
