//! Authentication for the ClinicDesk API
//!
//! Password login issuing HS256 JWTs, bearer-token middleware, role checks
//! and token revocation.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::auth::logging::{
    log_failed_login, log_logout, log_successful_login, log_token_refresh, log_token_revocation, AuditEvent, AuditKind,
    Credential,
};
use crate::auth::token::{SecurityError, TokenSubject, TokenType};
use crate::entities::user::User;
use crate::services::user::UserServiceTrait;
use crate::services::ServiceError;

// JWT handling
pub mod token;

// Token blacklist for revocation
pub mod token_blacklist;

// Authorization module for RBAC
pub mod authorize;

// Argon2 password hashing
pub mod password;

// Auth audit logging
pub mod logging;

/// User service handle the auth handlers extract from router state
pub type SharedUserService = Arc<dyn UserServiceTrait + Send + Sync>;

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Unique token id, the unit of revocation
    pub jti: String,
    /// Access or refresh
    #[schema(value_type = String)]
    pub token_type: TokenType,
    /// Login name
    pub username: String,
    /// Granted roles
    pub roles: Vec<String>,
}

/// User information extracted from authenticated requests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    /// User ID
    pub user_id: String,
    /// Login name
    pub username: String,
    /// User roles
    pub roles: Vec<String>,
    /// Authentication source
    pub auth_source: String,
}

impl UserInfo {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<&Claims> for UserInfo {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            username: claims.username.clone(),
            roles: claims.roles.clone(),
            auth_source: "jwt".to_string(),
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// JWT access token
    pub access_token: String,
    /// JWT refresh token
    pub refresh_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: User,
}

/// Refresh response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user_id: String,
}

/// Optional logout body; a refresh token sent here is revoked too
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Error half of the auth handlers
pub type AuthError = (StatusCode, Json<serde_json::Value>);

fn auth_error(status: StatusCode, code: &str, message: impl Into<String>) -> AuthError {
    (status, Json(json!({ "error": code, "message": message.into() })))
}

fn unauthorized(message: &str) -> Response {
    auth_error(StatusCode::UNAUTHORIZED, "unauthorized", message).into_response()
}

/// Pull the token out of an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err("Authorization header does not contain Bearer token"),
    }
}

fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok())
}

/// Authentication middleware for protected routes.
///
/// Accepts only unrevoked access tokens and inserts [`UserInfo`] and [`Claims`]
/// into the request extensions.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Response {
    let request_path = req.uri().path().to_string();
    let start_time = std::time::Instant::now();

    let token = match bearer_token(req.headers()) {
        Ok(token) => token.to_string(),
        Err(reason) => {
            debug!("{}", reason);

            AuditEvent::denied(AuditKind::BearerCheck, None)
                .path(request_path)
                .note(reason)
                .took(start_time.elapsed())
                .emit();

            return unauthorized(reason);
        }
    };

    match token::validate_token_of_type(&token, TokenType::Access) {
        Ok(claims) => {
            debug!("Token validated for user: {}", claims.sub);

            AuditEvent::allowed(AuditKind::BearerCheck, Some(&claims.sub))
                .credential(Credential::AccessToken)
                .path(request_path)
                .took(start_time.elapsed())
                .emit();

            req.extensions_mut().insert(UserInfo::from(&claims));
            req.extensions_mut().insert(claims);

            next.run(req).await
        }
        Err(e) => {
            let message = match e {
                SecurityError::TokenExpired => "Token has expired",
                SecurityError::TokenRevoked => "Token has been revoked",
                SecurityError::WrongTokenType { .. } => "An access token is required",
                SecurityError::ConfigError(_) => {
                    error!("Authentication is misconfigured: {}", e);
                    "Authentication is unavailable"
                }
                _ => "Invalid token",
            };
            warn!("Rejected bearer token on {}: {}", request_path, e);

            AuditEvent::denied(AuditKind::BearerCheck, None)
                .credential(Credential::AccessToken)
                .path(request_path)
                .note(e.to_string())
                .took(start_time.elapsed())
                .emit();

            unauthorized(message)
        }
    }
}

/// Apply CORS and security headers to the whole application
pub fn configure_auth<S>(app: Router<S>, allowed_origin: Option<&str>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    use axum::http::{HeaderName, HeaderValue, Method};
    use tower_http::cors::{AllowOrigin, Any, CorsLayer};
    use tower_http::set_header::SetResponseHeaderLayer;

    let origin = match allowed_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            warn!("Ignoring invalid CORS_ALLOW_ORIGIN: {}", e);
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ));

    app.layer(cors).layer(security_headers)
}

fn issue_tokens(user: &User) -> Result<(String, String), SecurityError> {
    let roles = vec![user.role.to_string()];
    let subject = TokenSubject {
        user_id: &user.id,
        username: &user.username,
        roles: &roles,
    };
    let access = token::generate_token(&subject, TokenType::Access)?;
    let refresh = token::generate_token(&subject, TokenType::Refresh)?;
    Ok((access, refresh))
}

/// Login endpoint - authenticate a user with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful. Send the access_token as 'Bearer {token}'.", body = LoginResponse),
        (status = 401, description = "Invalid credentials or inactive user"),
        (status = 500, description = "Internal server error")
    ),
    operation_id = "login"
)]
pub async fn login(
    State(users): State<SharedUserService>,
    headers: HeaderMap,
    Json(login_req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let start_time = std::time::Instant::now();

    let user = match users.authenticate(&login_req.username, &login_req.password).await {
        Ok(user) => user,
        Err(ServiceError::Unauthorized(reason)) => {
            log_failed_login(&login_req.username, user_agent(&headers), &reason);
            return Err(auth_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid username or password",
            ));
        }
        Err(e) => {
            error!("Login failed for {}: {}", login_req.username, e);
            return Err(auth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Login is temporarily unavailable",
            ));
        }
    };

    let (access_token, refresh_token) = issue_tokens(&user).map_err(|e| {
        error!("Failed to generate tokens: {}", e);

        AuditEvent::denied(AuditKind::Login, Some(&user.id))
            .credential(Credential::Password)
            .note("token signing failed")
            .took(start_time.elapsed())
            .emit();

        auth_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Failed to generate token")
    })?;

    log_successful_login(&user.id, user_agent(&headers), start_time.elapsed());

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.expiration().num_seconds(),
        user,
    }))
}

/// Refresh token endpoint
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Authentication",
    responses(
        (status = 200, description = "Token refreshed successfully", body = RefreshResponse),
        (status = 401, description = "Invalid refresh token")
    ),
    security(("jwt_auth" = []))
)]
pub async fn refresh_token(
    State(users): State<SharedUserService>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AuthError> {
    let refresh = bearer_token(&headers).map_err(|reason| {
        AuditEvent::denied(AuditKind::Refresh, None).note(reason).emit();
        auth_error(StatusCode::UNAUTHORIZED, "invalid_request", reason)
    })?;

    let claims = token::validate_token_of_type(refresh, TokenType::Refresh).map_err(|e| {
        warn!("Invalid refresh token: {}", e);
        AuditEvent::denied(AuditKind::Refresh, None)
            .credential(Credential::RefreshToken)
            .note(e.to_string())
            .emit();
        auth_error(StatusCode::UNAUTHORIZED, "invalid_token", "Invalid or expired refresh token")
    })?;

    // Roles and the active flag are re-read so changes apply at the next refresh
    let user = match users.get_user(&claims.sub).await {
        Ok(user) if user.active => user,
        Ok(_) | Err(ServiceError::NotFound(_)) => {
            log_token_refresh(&claims.sub, false, Some("User no longer active"));
            return Err(auth_error(StatusCode::UNAUTHORIZED, "invalid_token", "User is not active"));
        }
        Err(e) => {
            error!("Failed to load user {} for refresh: {}", claims.sub, e);
            return Err(auth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Failed to refresh token",
            ));
        }
    };

    let roles = vec![user.role.to_string()];
    let subject = TokenSubject {
        user_id: &user.id,
        username: &user.username,
        roles: &roles,
    };
    let access_token = token::generate_token(&subject, TokenType::Access).map_err(|e| {
        error!("Failed to generate new access token: {}", e);
        log_token_refresh(&claims.sub, false, Some(&format!("Failed to generate new token: {}", e)));
        auth_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Failed to generate new token")
    })?;

    log_token_refresh(&claims.sub, true, None);

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.expiration().num_seconds(),
        user_id: claims.sub,
    }))
}

/// Logout endpoint: revokes the presented access token, and the refresh token if sent
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    request_body(content = LogoutRequest, description = "Optional refresh token to revoke"),
    responses(
        (status = 200, description = "Logged out successfully"),
        (status = 401, description = "Not authenticated")
    ),
    security(("jwt_auth" = []))
)]
pub async fn logout(
    Extension(claims): Extension<Claims>,
    body: Option<Json<LogoutRequest>>,
) -> Json<serde_json::Value> {
    token::revoke_token(&claims);
    log_token_revocation(&claims.sub, "access");

    if let Some(refresh) = body.and_then(|Json(b)| b.refresh_token) {
        match token::validate_token_of_type(&refresh, TokenType::Refresh) {
            Ok(refresh_claims) if refresh_claims.sub == claims.sub => {
                token::revoke_token(&refresh_claims);
                log_token_revocation(&claims.sub, "refresh");
            }
            Ok(_) => warn!("User {} tried to revoke another user's refresh token", claims.sub),
            Err(e) => debug!("Ignoring refresh token on logout: {}", e),
        }
    }

    log_logout(&claims.sub);

    Json(json!({
        "message": "Logged out successfully",
        "status": "success"
    }))
}

/// Current user endpoint
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "The authenticated user", body = User),
        (status = 401, description = "Not authenticated")
    ),
    security(("jwt_auth" = []))
)]
pub async fn me(
    State(users): State<SharedUserService>,
    Extension(user_info): Extension<UserInfo>,
) -> Result<Json<User>, AuthError> {
    match users.get_user(&user_info.user_id).await {
        Ok(user) => Ok(Json(user)),
        Err(ServiceError::NotFound(_)) => Err(auth_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "User no longer exists",
        )),
        Err(e) => {
            error!("Failed to load user {}: {}", user_info.user_id, e);
            Err(auth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Failed to load user",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn protected_app() -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Extension(info): Extension<UserInfo>| async move { info.username }),
            )
            .layer(middleware::from_fn(auth_middleware))
    }

    async fn send(authorization: Option<String>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = protected_app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn token_for(token_type: TokenType) -> String {
        token::set_test_env();
        let roles = vec!["doctor".to_string()];
        token::generate_token(
            &TokenSubject {
                user_id: "doc-user",
                username: "dr.iyer",
                roles: &roles,
            },
            token_type,
        )
        .unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err("Missing Authorization header"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Ok("abc.def"));
    }

    #[tokio::test]
    async fn test_missing_header_is_401_json() {
        let (status, body) = send(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_valid_access_token_passes() {
        let access = token_for(TokenType::Access);
        let (status, body) = send(Some(format!("Bearer {}", access))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "dr.iyer");
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_as_access() {
        let refresh = token_for(TokenType::Refresh);
        let (status, body) = send(Some(format!("Bearer {}", refresh))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("access token is required"));
    }

    #[tokio::test]
    async fn test_revoked_token_rejected() {
        let access = token_for(TokenType::Access);
        token::revoke_token(&token::validate_token(&access).unwrap());

        let (status, body) = send(Some(format!("Bearer {}", access))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("revoked"));
    }

    #[test]
    fn test_user_info_from_claims() {
        let access = token_for(TokenType::Access);
        let claims = token::validate_token(&access).unwrap();
        let info = UserInfo::from(&claims);
        assert_eq!(info.user_id, "doc-user");
        assert!(info.has_role("doctor"));
        assert!(!info.has_role("admin"));
    }
}
