/*!
 * # Authentication and Authorization Module
 *
 * Bearer-token (JWT, HS256) verification for the back-office API plus a
 * role guard layered per router. Tokens are minted by the admin CLI or an
 * external identity service sharing the signing secret; there is no login
 * flow here.
 */

use crate::config::AppConfig;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

mod rbac;

pub use rbac::Role;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // Subject (user ID)
    pub name: Option<String>, // Display name, used as the actor on audit stamps
    pub role: Role,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub role: Role,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user's role ranks at or above `role`
    pub fn has_role(&self, role: Role) -> bool {
        self.role.satisfies(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Name recorded in `approved_by` / `paid_by` style columns.
    pub fn actor_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.user_id)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            role: claims.role,
            token_id: claims.jti,
        }
    }
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("access_token_expiration", &self.access_token_expiration)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            access_token_expiration,
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
    }
}

/// Issues and validates bearer tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

/// Token returned by [`AuthService::issue_token`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Mint a signed access token for `subject` carrying `role`.
    pub fn issue_token(
        &self,
        subject: &str,
        name: Option<&str>,
        role: Role,
    ) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            name: name.map(str::to_string),
            role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs(),
        })
    }

    /// Validate signature, expiry and issuer.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => {
                debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            }
        })?;

        Ok(data.claims)
    }

    /// Resolve the caller from an `Authorization: Bearer` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingAuth)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.validate_token(token).map(AuthUser::from)
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InsufficientPermissions => StatusCode::FORBIDDEN,
            Self::TokenCreation(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingAuth => "AUTH_MISSING",
            Self::MissingToken => "AUTH_MISSING_TOKEN",
            Self::InvalidToken => "AUTH_INVALID_TOKEN",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::TokenCreation(_) => "AUTH_TOKEN_CREATION_FAILED",
            Self::InsufficientPermissions => "AUTH_INSUFFICIENT_PERMISSIONS",
            Self::InternalError(_) => "AUTH_INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::TokenCreation(_) | Self::InternalError(_) => {
                warn!(error = %self, "authentication failure");
                "Authentication service error".to_string()
            }
            _ => self.to_string(),
        };

        let body = crate::errors::ErrorResponse {
            error: self.code().to_string(),
            message,
            details: None,
            request_id: crate::tracing::current_request_id().map(|r| r.0),
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

/// Resolves the caller, preferring the identity `auth_middleware` already
/// attached. `Option<AuthUser>` yields `None` for anonymous requests.
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let auth_service = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| AuthError::InternalError("Auth service not available".to_string()))?;

        auth_service.authenticate(&parts.headers)
    }
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(required_role) {
        debug!(
            user = %user.user_id,
            role = %user.role,
            required = %required_role,
            "role check failed"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates auth tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Auth service not available".to_string())
                .into_response();
        }
    };

    match auth_service.authenticate(request.headers()) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn service() -> Arc<AuthService> {
        Arc::new(AuthService::new(AuthConfig::new(
            "unit_test_signing_secret_that_is_long_enough".to_string(),
            "eduops-auth".to_string(),
            Duration::from_secs(600),
        )))
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let svc = service();
        let token = svc
            .issue_token("user-1", Some("Kim"), Role::Staff)
            .unwrap();
        let claims = svc.validate_token(&token.access_token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn wrong_secret_or_issuer_is_rejected() {
        let token = service()
            .issue_token("user-1", None, Role::Admin)
            .unwrap()
            .access_token;

        let other_secret = AuthService::new(AuthConfig::new(
            "a_completely_different_signing_secret_value".to_string(),
            "eduops-auth".to_string(),
            Duration::from_secs(600),
        ));
        assert!(matches!(
            other_secret.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));

        let other_issuer = AuthService::new(AuthConfig::new(
            "unit_test_signing_secret_that_is_long_enough".to_string(),
            "someone-else".to_string(),
            Duration::from_secs(600),
        ));
        assert!(other_issuer.validate_token(&token).is_err());
    }

    #[test]
    fn actor_name_falls_back_to_subject() {
        let user = AuthUser {
            user_id: "sub-9".into(),
            name: None,
            role: Role::Admin,
            token_id: "t".into(),
        };
        assert_eq!(user.actor_name(), "sub-9");
    }

    async fn status_for(router: Router, auth: Option<String>) -> StatusCode {
        let mut req = axum::http::Request::builder().uri("/");
        if let Some(value) = auth {
            req = req.header(header::AUTHORIZATION, value);
        }
        router
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    fn guarded(role: Role) -> Router {
        Router::new()
            .route("/", get(|user: AuthUser| async move { user.user_id }))
            .with_role(role)
            .layer(Extension(service()))
    }

    #[tokio::test]
    async fn role_guard_enforces_hierarchy() {
        let svc = service();
        let staff = svc.issue_token("s", None, Role::Staff).unwrap().access_token;
        let admin = svc.issue_token("a", None, Role::Admin).unwrap().access_token;

        assert_eq!(status_for(guarded(Role::Admin), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(guarded(Role::Admin), Some("Bearer garbage".into())).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(guarded(Role::Admin), Some(format!("Bearer {staff}"))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(guarded(Role::Admin), Some(format!("Bearer {admin}"))).await,
            StatusCode::OK
        );
        assert_eq!(
            status_for(guarded(Role::Staff), Some(format!("Bearer {admin}"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn optional_extractor_allows_anonymous() {
        let router = Router::new()
            .route(
                "/",
                get(|user: Option<AuthUser>| async move {
                    user.map(|u| u.user_id).unwrap_or_else(|| "anonymous".into())
                }),
            )
            .layer(Extension(service()));

        assert_eq!(status_for(router, None).await, StatusCode::OK);
    }
}
