use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::logging::{log_access_denied, AuditEvent, AuditKind};
use crate::auth::UserInfo;

/// Middleware for role-based access control
///
/// Lets the request through when the authenticated user holds any of the
/// required roles, otherwise answers 403 Forbidden.
pub async fn require_roles<S, I>(_state: State<S>, req: Request<Body>, next: Next, required_roles: I) -> Response
where
    I: IntoIterator<Item = String>,
{
    let required_roles: Vec<String> = required_roles.into_iter().collect();
    let request_path = req.uri().path().to_string();

    match req.extensions().get::<UserInfo>() {
        Some(user) => {
            let has_required_role = required_roles.iter().any(|role| user.roles.contains(role));

            if has_required_role {
                debug!("User {} has required role for resource access: {}", user.user_id, request_path);
                next.run(req).await
            } else {
                warn!(
                    "User {} lacks required roles: {:?} for resource: {}",
                    user.user_id, required_roles, request_path
                );

                log_access_denied(&user.user_id, &request_path, &required_roles);

                (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "error": "forbidden",
                        "message": "You don't have the required permissions to access this resource",
                        "details": { "required_roles": required_roles }
                    })),
                )
                    .into_response()
            }
        }
        None => {
            // auth_middleware must run first
            warn!("No user info found in request extensions for path: {}", request_path);

            AuditEvent::denied(AuditKind::RoleCheck, None)
                .path(request_path)
                .note("no authenticated user on request")
                .emit();

            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "unauthorized",
                    "message": "Authentication required"
                })),
            )
                .into_response()
        }
    }
}

/// Middleware factory that requires a specific role for access
///
/// ```ignore
/// let admin_routes = Router::new()
///    .route("/clinics", post(create_clinic))
///    .layer(middleware::from_fn_with_state(state.clone(), require_role("admin")));
/// ```
pub fn require_role<S: Clone + Send + Sync + 'static>(
    role: &str,
) -> impl Fn(State<S>, Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + 'static {
    let role = role.to_string();
    move |state, req, next| {
        let role_vec = vec![role.clone()];
        Box::pin(async move { require_roles(state, req, next, role_vec).await })
    }
}

/// Middleware factory that requires any of the specified roles for access
pub fn require_any_role<S: Clone + Send + Sync + 'static>(
    roles: &[&str],
) -> impl Fn(State<S>, Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + 'static {
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    move |state, req, next| {
        let roles = roles.clone();
        Box::pin(async move { require_roles(state, req, next, roles).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn user(roles: &[&str]) -> UserInfo {
        UserInfo {
            user_id: "user-1".to_string(),
            username: "frontdesk".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            auth_source: "jwt".to_string(),
        }
    }

    fn app(required: &'static [&'static str], user_info: Option<UserInfo>) -> Router {
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state((), require_any_role::<()>(required)))
            .layer(middleware::from_fn(move |mut req: Request<Body>, next: Next| {
                let user_info = user_info.clone();
                async move {
                    if let Some(info) = user_info {
                        req.extensions_mut().insert(info);
                    }
                    next.run(req).await
                }
            }))
    }

    async fn call(app: Router) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri("/protected").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    #[tokio::test]
    async fn test_require_roles_with_matching_role() {
        let (status, body) = call(app(&["admin", "doctor"], Some(user(&["doctor"])))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_require_roles_with_no_matching_role() {
        let (status, body) = call(app(&["admin"], Some(user(&["receptionist"])))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "forbidden");
        assert_eq!(json["details"]["required_roles"][0], "admin");
    }

    #[tokio::test]
    async fn test_require_roles_without_user_info() {
        let (status, _) = call(app(&["admin"], None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
