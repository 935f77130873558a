use super::common::paginated;
use crate::{
    auth::{AuthRouterExt, Role},
    entities::{quote, school_request, SchoolRequestStatus},
    middleware_helpers::JsonBody,
    services::school_requests::UpdateRequestStatusInput,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<SchoolRequestStatus>,
}

#[utoipa::path(
    get,
    path = "/api/v1/school-requests",
    params(RequestListQuery),
    responses(
        (status = 200, description = "School requests, newest first", body = ApiResponse<PaginatedResponse<school_request::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "school-requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestListQuery>,
) -> ApiResult<PaginatedResponse<school_request::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);
    let (items, total) = state
        .services
        .school_requests
        .list_requests(page, limit, query.status)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/school-requests/{id}",
    params(("id" = Uuid, Path, description = "School request id")),
    responses(
        (status = 200, description = "School request", body = ApiResponse<school_request::Model>),
        (status = 404, description = "School request not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "school-requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<school_request::Model> {
    let request = state.services.school_requests.get_request(id).await?;
    Ok(Json(ApiResponse::success(request)))
}

#[utoipa::path(
    get,
    path = "/api/v1/school-requests/{id}/quotes",
    params(("id" = Uuid, Path, description = "School request id")),
    responses(
        (status = 200, description = "Quotes issued for the request", body = ApiResponse<Vec<quote::Model>>),
        (status = 404, description = "School request not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "school-requests"
)]
pub async fn list_request_quotes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<quote::Model>> {
    let quotes = state.services.school_requests.list_quotes(id).await?;
    Ok(Json(ApiResponse::success(quotes)))
}

#[utoipa::path(
    put,
    path = "/api/v1/school-requests/{id}/status",
    params(("id" = Uuid, Path, description = "School request id")),
    request_body = UpdateRequestStatusInput,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<school_request::Model>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "School request not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "school-requests"
)]
pub async fn update_request_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateRequestStatusInput>,
) -> ApiResult<school_request::Model> {
    let request = state
        .services
        .school_requests
        .update_status(id, input.status)
        .await?;
    Ok(Json(ApiResponse::success(request)))
}

pub fn school_request_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_requests))
        .route("/:id", get(get_request))
        .route("/:id/quotes", get(list_request_quotes))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/:id/status", put(update_request_status))
        .with_role(Role::Admin);

    read.merge(write)
}
