use super::common::{created, paginated};
use crate::{
    auth::{AuthRouterExt, Role},
    entities::{assignment, AssignmentStatus},
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::assignments::{
        AssignmentFilter, CompleteAssignmentInput, CompletedAssignment, CreateAssignmentInput,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssignmentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub instructor_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub status: Option<AssignmentStatus>,
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments",
    params(AssignmentListQuery),
    responses(
        (status = 200, description = "Assignments by session date", body = ApiResponse<PaginatedResponse<assignment::Model>>),
    ),
    security(("Bearer" = [])),
    tag = "assignments"
)]
pub async fn list_assignments(
    State(state): State<AppState>,
    Query(query): Query<AssignmentListQuery>,
) -> ApiResult<PaginatedResponse<assignment::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);
    let filter = AssignmentFilter {
        instructor_id: query.instructor_id,
        request_id: query.request_id,
        status: query.status,
    };
    let (items, total) = state
        .services
        .assignments
        .list_assignments(page, limit, filter)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment", body = ApiResponse<assignment::Model>),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "assignments"
)]
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<assignment::Model> {
    let assignment = state.services.assignments.get_assignment(id).await?;
    Ok(Json(ApiResponse::success(assignment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments",
    request_body = CreateAssignmentInput,
    responses(
        (status = 201, description = "Instructor scheduled", body = ApiResponse<assignment::Model>),
        (status = 400, description = "Request closed or instructor inactive", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request or instructor not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "assignments"
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateAssignmentInput>,
) -> Result<(StatusCode, Json<ApiResponse<assignment::Model>>), ServiceError> {
    let assignment = state.services.assignments.create_assignment(input).await?;
    Ok(created(assignment))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/complete",
    params(("id" = Uuid, Path, description = "Assignment id")),
    request_body = CompleteAssignmentInput,
    responses(
        (status = 200, description = "Assignment completed", body = ApiResponse<CompletedAssignment>),
        (status = 400, description = "Assignment or request not completable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "assignments"
)]
pub async fn complete_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<CompleteAssignmentInput>,
) -> ApiResult<CompletedAssignment> {
    let outcome = state
        .services
        .assignments
        .complete_assignment(id, input)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment cancelled", body = ApiResponse<assignment::Model>),
        (status = 400, description = "Assignment already closed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "assignments"
)]
pub async fn cancel_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<assignment::Model> {
    let assignment = state.services.assignments.cancel_assignment(id).await?;
    Ok(Json(ApiResponse::success(assignment)))
}

pub fn assignment_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_assignments))
        .route("/:id", get(get_assignment))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/", post(create_assignment))
        .route("/:id/complete", post(complete_assignment))
        .route("/:id/cancel", post(cancel_assignment))
        .with_role(Role::Admin);

    read.merge(write)
}
