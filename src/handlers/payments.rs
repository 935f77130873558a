use super::common::{created, paginated};
use crate::{
    auth::{AuthRouterExt, AuthUser, Role},
    entities::{payment, PaymentStatus},
    errors::ServiceError,
    middleware_helpers::JsonBody,
    services::payments::{CreatePaymentInput, UpdatePaymentStatusInput},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<PaymentStatus>,
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(PaymentListQuery),
    responses(
        (status = 200, description = "Instructor payments, newest first", body = ApiResponse<PaginatedResponse<payment::Model>>),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> ApiResult<PaginatedResponse<payment::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);
    let (items, total) = state
        .services
        .payments
        .list_payments(page, limit, query.status)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<payment::Model>),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<payment::Model> {
    let payment = state.services.payments.get_payment(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePaymentInput,
    responses(
        (status = 201, description = "Payment created as PENDING", body = ApiResponse<payment::Model>),
        (status = 400, description = "Invalid amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreatePaymentInput>,
) -> Result<(StatusCode, Json<ApiResponse<payment::Model>>), ServiceError> {
    let payment = state.services.payments.create_payment(input).await?;
    Ok(created(payment))
}

#[utoipa::path(
    put,
    path = "/api/v1/payments/{id}/status",
    summary = "Update payment status",
    description = "PENDING -> APPROVED stamps approved_at/approved_by, -> PAID stamps paid_at/paid_by. Whether approval may be skipped depends on payment_transition_policy.",
    params(("id" = Uuid, Path, description = "Payment id")),
    request_body = UpdatePaymentStatusInput,
    responses(
        (status = 200, description = "Payment updated", body = ApiResponse<payment::Model>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: Option<AuthUser>,
    JsonBody(input): JsonBody<UpdatePaymentStatusInput>,
) -> ApiResult<payment::Model> {
    let payment = state
        .services
        .payments
        .update_status(id, input, user.as_ref().map(AuthUser::actor_name))
        .await?;
    Ok(Json(ApiResponse::success(payment)))
}

pub fn payment_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_payments))
        .route("/:id", get(get_payment))
        .with_role(Role::Staff);

    let write = Router::new()
        .route("/", post(create_payment))
        .route("/:id/status", put(update_payment_status))
        .with_role(Role::Admin);

    read.merge(write)
}
