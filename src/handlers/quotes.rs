use super::common::{created, paginated};
use crate::{
    auth::{AuthRouterExt, AuthUser, Role},
    entities::quote,
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::quotes::CreateQuoteInput,
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
pub struct QuoteListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub request_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/quotes",
    params(QuoteListQuery),
    responses(
        (status = 200, description = "Quotes, newest first", body = ApiResponse<PaginatedResponse<quote::Model>>),
    ),
    security(("Bearer" = [])),
    tag = "quotes"
)]
pub async fn list_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuoteListQuery>,
) -> ApiResult<PaginatedResponse<quote::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);
    let (items, total) = state
        .services
        .quotes
        .list_quotes(page, limit, query.request_id)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotes/{id}",
    params(("id" = Uuid, Path, description = "Quote id")),
    responses(
        (status = 200, description = "Quote", body = ApiResponse<quote::Model>),
        (status = 404, description = "Quote not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotes"
)]
pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<quote::Model> {
    let quote = state.services.quotes.get_quote(id).await?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotes/by-number/{number}",
    params(("number" = String, Path, description = "Quote number, e.g. QT-2025-001")),
    responses(
        (status = 200, description = "Quote", body = ApiResponse<quote::Model>),
        (status = 404, description = "Quote not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotes"
)]
pub async fn get_quote_by_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<quote::Model> {
    let quote = state.services.quotes.get_by_number(&number).await?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotes",
    summary = "Create quote",
    description = "Prices a school request, assigns the next QT-YYYY-NNN number and marks the request QUOTED",
    request_body = CreateQuoteInput,
    responses(
        (status = 201, description = "Quote created", body = ApiResponse<quote::Model>),
        (status = 400, description = "Invalid fees or request no longer quotable", body = crate::errors::ErrorResponse),
        (status = 404, description = "School request not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Quote number could not be allocated", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotes"
)]
pub async fn create_quote(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<CreateQuoteInput>,
) -> Result<(StatusCode, Json<ApiResponse<quote::Model>>), ServiceError> {
    let quote = state
        .services
        .quotes
        .create_quote(input, user.actor_name())
        .await?;
    Ok(created(quote))
}

pub fn quote_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_quotes))
        .route("/:id", get(get_quote))
        .route("/by-number/:number", get(get_quote_by_number))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/", post(create_quote))
        .with_role(Role::Admin);

    read.merge(write)
}
