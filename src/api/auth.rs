use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_email;
use crate::core::security;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::user::{TokenResponse, UserLogin, UserResponse};

const BAD_CREDENTIALS: &str = "Incorrect email or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/login", post(login)).route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_email(&payload.email)?;
    let email = payload.email.trim().to_ascii_lowercase();

    ensure_login_allowed(&state, &email).await?;
    let user = authenticate(&state, &email, &payload.password).await?;

    let token = security::create_access_token(&user.id, user.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    tracing::info!(
        user_id = %user.id,
        role = ?user.role,
        action = "login",
        "User logged in"
    );

    Ok(Json(TokenResponse::bearer(token, user)))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

/// Counts the attempt against the per-email window. Redis outages never lock anyone out.
async fn ensure_login_allowed(state: &AppState, email: &str) -> Result<(), ApiError> {
    let limits = state.settings().security();
    let allowed = state
        .redis()
        .rate_limit(
            &format!("rl:login:{email}"),
            limits.login_attempts_limit,
            limits.login_window_seconds,
        )
        .await
        .unwrap_or(true);

    if allowed {
        Ok(())
    } else {
        tracing::warn!(email, action = "login_throttled", "Login rate limit reached");
        Err(ApiError::TooManyRequests("Too many login attempts, try again later"))
    }
}

async fn authenticate(state: &AppState, email: &str, password: &str) -> Result<User, ApiError> {
    let Some(user) = repositories::users::find_by_email(state.db(), email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
    else {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    };

    // A malformed stored hash is treated like a wrong password.
    if !security::verify_password(password, &user.hashed_password).unwrap_or(false) {
        tracing::warn!(user_id = %user.id, action = "login_failed", "Rejected login");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    Ok(user)
}
