use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::{
    AppState,
    api::models::{
        accounts::AccountResponse,
        auth::{AuthResponse, AuthSuccessResponse, LoginRequest, RefreshRequest, RegisterRequest},
        response::ApiResponse,
    },
    auth::current_user::CurrentUser,
    errors::Error,
};

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Account registered", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Missing fields, invalid email or weak password"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiResponse<AuthResponse>, Error> {
    let Json(request) = payload?;
    let response = state.auth.register(request).await?;
    Ok(ApiResponse::created(response))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is not active"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, payload: Result<Json<LoginRequest>, JsonRejection>) -> Result<ApiResponse<AuthResponse>, Error> {
    let Json(request) = payload?;
    Ok(ApiResponse::ok(state.auth.login(request).await?))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "New token pair issued", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid or expired refresh token"),
        (status = 403, description = "Account is not active"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, payload: Result<Json<RefreshRequest>, JsonRejection>) -> Result<ApiResponse<AuthResponse>, Error> {
    let Json(request) = payload?;
    if request.refresh_token.is_empty() {
        return Err(Error::Validation {
            message: "Refresh token required".to_string(),
        });
    }
    Ok(ApiResponse::ok(state.auth.refresh(&request.refresh_token).await?))
}

/// Get the current caller's account
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current account", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Account no longer exists"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, caller: CurrentUser) -> Result<ApiResponse<AccountResponse>, Error> {
    Ok(ApiResponse::ok(state.auth.identify(caller.id).await?))
}

/// Logout. The token remains valid until it expires; clients discard it.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout acknowledged", body = ApiResponse<AuthSuccessResponse>),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, caller: CurrentUser) -> ApiResponse<AuthSuccessResponse> {
    ApiResponse::ok(state.auth.logout(&caller))
}
