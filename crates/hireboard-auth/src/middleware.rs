//! Authentication middleware for Axum
//!
//! [`AuthLayer`] guards protected routes: it pulls the access token from the
//! Authorization header (preferred) or the `access_token` cookie, verifies
//! it, and attaches an [`AuthenticatedUser`] to the request. Requests with no
//! usable credential are rejected here, not in handlers.
//!
//! [`RoleLayer`] stacks after it and re-reads the user's role from the store,
//! so a role change takes effect immediately instead of at token expiry.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    response::Response,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uuid::Uuid;

use crate::error::{AuthError, ErrorResponse};
use crate::token::TokenService;
use crate::types::AuthenticatedUser;
use hireboard_db::{AuthStore, UserRole};

/// Authentication middleware layer
#[derive(Clone)]
pub struct AuthLayer {
    tokens: Arc<TokenService>,
}

impl AuthLayer {
    /// Create a new authentication layer
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

/// Authentication middleware service
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    tokens: Arc<TokenService>,
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let tokens = self.tokens.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match authenticate_request(req.headers(), &tokens) {
                Ok(user) => {
                    let (mut parts, body) = req.into_parts();
                    parts.extensions.insert(user);
                    inner.call(Request::from_parts(parts, body)).await
                }
                Err(e) => Ok(auth_error_response(e)),
            }
        })
    }
}

/// Authenticate a request from its access token
fn authenticate_request(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<AuthenticatedUser, AuthError> {
    let token = extract_access_token(headers).ok_or(AuthError::NotAuthorized)?;
    let claims = tokens.verify_access(&token)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
    let session_id = Uuid::parse_str(&claims.sid).map_err(|_| AuthError::InvalidToken)?;

    Ok(AuthenticatedUser {
        user_id,
        session_id,
        role: claims.role,
    })
}

/// Extract the access token: Authorization header first, then cookie
fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get("Cookie") {
        if let Ok(cookies) = cookie_header.to_str() {
            for cookie in cookies.split(';') {
                if let Some(value) = cookie.trim().strip_prefix("access_token=") {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}

/// Create error response for authentication errors
pub fn auth_error_response(error: AuthError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::from(&error);

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap_or_default()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

// =============================================================================
// Role gate
// =============================================================================

/// Role authorization layer; stacks after [`AuthLayer`]
#[derive(Clone)]
pub struct RoleLayer {
    store: Arc<dyn AuthStore>,
    allowed: Arc<Vec<UserRole>>,
}

impl RoleLayer {
    /// Allow only the given roles through
    pub fn new(store: Arc<dyn AuthStore>, allowed: Vec<UserRole>) -> Self {
        Self {
            store,
            allowed: Arc::new(allowed),
        }
    }
}

impl<S> Layer<S> for RoleLayer {
    type Service = RoleMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RoleMiddleware {
            inner,
            store: self.store.clone(),
            allowed: self.allowed.clone(),
        }
    }
}

/// Role authorization middleware service
#[derive(Clone)]
pub struct RoleMiddleware<S> {
    inner: S,
    store: Arc<dyn AuthStore>,
    allowed: Arc<Vec<UserRole>>,
}

impl<S> Service<Request> for RoleMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let store = self.store.clone();
        let allowed = self.allowed.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(auth) = req.extensions().get::<AuthenticatedUser>().cloned() else {
                return Ok(auth_error_response(AuthError::NotAuthorized));
            };

            // Current role from the store, not the token snapshot.
            let user = match store.find_user_by_id(auth.user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => return Ok(auth_error_response(AuthError::NotAuthorized)),
                Err(e) => return Ok(auth_error_response(AuthError::Database(e.to_string()))),
            };

            if !allowed.contains(&user.role) {
                return Ok(auth_error_response(AuthError::NotAuthorized));
            }

            inner.call(req).await
        })
    }
}

// =============================================================================
// Axum Extractors
// =============================================================================

/// Extractor for the authenticated user placed by [`AuthLayer`]
///
/// Returns 401 when used on a route the layer does not cover.
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or_else(|| auth_error_response(AuthError::NotAuthorized))
    }
}
