use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_models::error::ApiError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

// Middleware for authentication - validates the bearer token and stashes
// the resulting AuthUser in request extensions for handlers downstream.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| ApiError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| ApiError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(ApiError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let user = validate_token(token, &config.jwt_secret)
        .map_err(|e| ApiError::Auth(e))?;

    if !user.is_active {
        return Err(ApiError::Auth("Account is deactivated".to_string()));
    }

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
