use crate::{config::AppConfig, ApiResponse, PaginatedResponse};
use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Pagination parameters shared by list endpoints
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    pub page: Option<u64>,
    /// Page size; capped by `api_max_page_size`
    pub limit: Option<u64>,
}

impl PaginationParams {
    /// Resolves `(page, limit)` against the configured defaults and cap.
    pub fn resolve(&self, config: &AppConfig) -> (u64, u64) {
        (self.page.unwrap_or(1).max(1), config.page_size(self.limit))
    }
}

pub fn paginated<T>(items: Vec<T>, total: u64, page: u64, limit: u64) -> PaginatedResponse<T> {
    let total_pages = if total == 0 || limit == 0 {
        0
    } else {
        total.div_ceil(limit)
    };

    PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    }
}

/// Standard created response
pub fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "secret".into(),
            "127.0.0.1".into(),
            8080,
            "development".into(),
        )
    }

    #[test]
    fn resolve_applies_defaults_and_cap() {
        let cfg = config();
        assert_eq!(PaginationParams::default().resolve(&cfg), (1, cfg.api_default_page_size));

        let huge = PaginationParams {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(huge.resolve(&cfg), (1, cfg.api_max_page_size));
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = paginated(vec![1, 2], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(paginated::<u8>(vec![], 0, 1, 20).total_pages, 0);
    }
}
