use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EduOps API",
        version = "1.0.0",
        description = r#"
# EduOps Back-Office API

Operations API for an education provider that runs programs at partner schools.

## Workflow

1. A school submits a request through `POST /public/school-requests` and receives a `REQ-YYYY-NNN` number.
2. Staff price it with `POST /quotes`; the fee breakdown is derived server-side and the request moves to `QUOTED`.
3. After approval an instructor is assigned; completing the assignment completes the request and can open a pending instructor payment.
4. Payments move `PENDING -> APPROVED -> PAID` with the acting user stamped at each step.

## Authentication

Everything outside `/public` and `/health` requires a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Read endpoints accept the `staff` role, writes require `admin`.

## Money

Monetary values are decimal strings (e.g. `"151800"`). VAT is 10% of the
pre-tax total, rounded half away from zero to cents.

## Pagination

List endpoints take `page` (default 1) and `limit` (default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "public", description = "Unauthenticated website endpoints"),
        (name = "school-requests", description = "Incoming school requests"),
        (name = "quotes", description = "Fee quotes attached to requests"),
        (name = "quotations", description = "Stand-alone itemized quotations"),
        (name = "assignments", description = "Instructor scheduling"),
        (name = "payments", description = "Instructor payments"),
        (name = "schools", description = "School directory"),
        (name = "programs", description = "Program catalog"),
        (name = "instructors", description = "Instructor roster"),
        (name = "notices", description = "Website notice board"),
        (name = "notifications", description = "Back-office inbox"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Public
        crate::handlers::public::active_programs,
        crate::handlers::public::published_notices,
        crate::handlers::public::submit_school_request,
        crate::handlers::public::submit_contact,

        // School requests
        crate::handlers::school_requests::list_requests,
        crate::handlers::school_requests::get_request,
        crate::handlers::school_requests::list_request_quotes,
        crate::handlers::school_requests::update_request_status,

        // Quotes and quotations
        crate::handlers::quotes::list_quotes,
        crate::handlers::quotes::get_quote,
        crate::handlers::quotes::get_quote_by_number,
        crate::handlers::quotes::create_quote,
        crate::handlers::quotations::list_quotations,
        crate::handlers::quotations::get_quotation,
        crate::handlers::quotations::create_quotation,

        // Assignments and payments
        crate::handlers::assignments::list_assignments,
        crate::handlers::assignments::get_assignment,
        crate::handlers::assignments::create_assignment,
        crate::handlers::assignments::complete_assignment,
        crate::handlers::assignments::cancel_assignment,
        crate::handlers::payments::list_payments,
        crate::handlers::payments::get_payment,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::update_payment_status,

        // Reference data
        crate::handlers::schools::list_schools,
        crate::handlers::schools::get_school,
        crate::handlers::schools::create_school,
        crate::handlers::schools::update_school,
        crate::handlers::schools::delete_school,
        crate::handlers::programs::list_programs,
        crate::handlers::programs::get_program,
        crate::handlers::programs::create_program,
        crate::handlers::programs::update_program,
        crate::handlers::programs::delete_program,
        crate::handlers::instructors::list_instructors,
        crate::handlers::instructors::get_instructor,
        crate::handlers::instructors::create_instructor,
        crate::handlers::instructors::update_instructor,
        crate::handlers::instructors::delete_instructor,

        // Content and inbox
        crate::handlers::notices::list_notices,
        crate::handlers::notices::get_notice,
        crate::handlers::notices::create_notice,
        crate::handlers::notices::update_notice,
        crate::handlers::notices::delete_notice,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::mark_notification_read,

        // Health
        crate::health::health_check,
        crate::health::liveness_check,
    ),
    components(
        schemas(
            crate::services::pricing::FeeInputs,
            crate::services::pricing::QuoteBreakdown,
            crate::services::pricing::LineInput,
            crate::services::payments::TransitionPolicy,
            crate::entities::SchoolRequestStatus,
            crate::entities::PaymentStatus,
            crate::entities::AssignmentStatus,
            crate::entities::NotificationKind,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

/// Registers the `Bearer` scheme referenced by `security(("Bearer" = []))`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_core_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("EduOps API"));
        assert!(json.contains("/api/v1/quotes"));
        assert!(json.contains("/api/v1/public/school-requests"));
        assert!(json.contains("/api/v1/payments/{id}/status"));
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let openapi = ApiDocV1::openapi();
        let schemes = openapi
            .components
            .expect("components")
            .security_schemes;
        assert!(schemes.contains_key("Bearer"));
    }
}
