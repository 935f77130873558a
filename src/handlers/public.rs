//! Endpoints the marketing website calls without a token.

use super::common::{created, paginated, PaginationParams};
use crate::{
    entities::{notice, notification, program, school_request},
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::{notifications::ContactInput, school_requests::SubmitRequestInput},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};

#[utoipa::path(
    get,
    path = "/api/v1/public/programs",
    params(PaginationParams),
    responses(
        (status = 200, description = "Active programs", body = ApiResponse<PaginatedResponse<program::Model>>),
    ),
    tag = "public"
)]
pub async fn active_programs(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<program::Model>> {
    let (page, limit) = pagination.resolve(&state.config);
    let (items, total) = state
        .services
        .programs
        .list_programs(page, limit, true)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/public/notices",
    params(PaginationParams),
    responses(
        (status = 200, description = "Published notices, pinned first", body = ApiResponse<PaginatedResponse<notice::Model>>),
    ),
    tag = "public"
)]
pub async fn published_notices(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<notice::Model>> {
    let (page, limit) = pagination.resolve(&state.config);
    let (items, total) = state.services.notices.list_published(page, limit).await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    post,
    path = "/api/v1/public/school-requests",
    summary = "Submit school request",
    description = "Registers the request as SUBMITTED under the next REQ-YYYY-NNN number. An inline school is created in the same transaction.",
    request_body = SubmitRequestInput,
    responses(
        (status = 201, description = "Request submitted", body = ApiResponse<school_request::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Referenced school or program not found", body = crate::errors::ErrorResponse),
    ),
    tag = "public"
)]
pub async fn submit_school_request(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SubmitRequestInput>,
) -> Result<(StatusCode, Json<ApiResponse<school_request::Model>>), ServiceError> {
    let request = state
        .services
        .school_requests
        .submit_request(input)
        .await?;
    Ok(created(request))
}

#[utoipa::path(
    post,
    path = "/api/v1/public/contact",
    request_body = ContactInput,
    responses(
        (status = 201, description = "Message received", body = ApiResponse<notification::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
    ),
    tag = "public"
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ContactInput>,
) -> Result<(StatusCode, Json<ApiResponse<notification::Model>>), ServiceError> {
    let notification = state.services.notifications.submit_contact(input).await?;
    Ok(created(notification))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/programs", get(active_programs))
        .route("/notices", get(published_notices))
        .route("/school-requests", post(submit_school_request))
        .route("/contact", post(submit_contact))
}
