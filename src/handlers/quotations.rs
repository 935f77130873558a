use super::common::{created, paginated, PaginationParams};
use crate::{
    auth::{AuthRouterExt, AuthUser, Role},
    entities::quotation,
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::quotations::CreateQuotationInput,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/quotations",
    params(PaginationParams),
    responses(
        (status = 200, description = "Quotations, newest first", body = ApiResponse<PaginatedResponse<quotation::Model>>),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn list_quotations(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<quotation::Model>> {
    let (page, limit) = pagination.resolve(&state.config);
    let (items, total) = state
        .services
        .quotations
        .list_quotations(page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotations/{id}",
    params(("id" = Uuid, Path, description = "Quotation id")),
    responses(
        (status = 200, description = "Quotation", body = ApiResponse<quotation::Model>),
        (status = 404, description = "Quotation not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<quotation::Model> {
    let quotation = state.services.quotations.get_quotation(id).await?;
    Ok(Json(ApiResponse::success(quotation)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotations",
    summary = "Issue quotation",
    description = "Prices the line items and assigns today's next YYYY/MM/DD-N number",
    request_body = CreateQuotationInput,
    responses(
        (status = 201, description = "Quotation issued", body = ApiResponse<quotation::Model>),
        (status = 400, description = "Invalid line items", body = crate::errors::ErrorResponse),
        (status = 409, description = "Quotation number could not be allocated", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn create_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<CreateQuotationInput>,
) -> Result<(StatusCode, Json<ApiResponse<quotation::Model>>), ServiceError> {
    let quotation = state
        .services
        .quotations
        .create_quotation(input, user.actor_name())
        .await?;
    Ok(created(quotation))
}

pub fn quotation_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_quotations))
        .route("/:id", get(get_quotation))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/", post(create_quotation))
        .with_role(Role::Admin);

    read.merge(write)
}
