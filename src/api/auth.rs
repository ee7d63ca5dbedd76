use actix_web::{web, HttpResponse};
use chrono::Utc;

use super::AppState;
use crate::auth::{AuthService, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::store::StoreError;

const MIN_USERNAME_LEN: usize = 5;
const MIN_PASSWORD_LEN: usize = 6;

fn issue_tokens(auth: &AuthService, user: User) -> AppResult<LoginResponse> {
    let token = auth
        .generate_token(&user.id)
        .map_err(|e| AppError::Server(format!("Failed to generate token: {}", e)))?;
    let refresh_token = auth
        .generate_refresh_token(&user.id)
        .map_err(|e| AppError::Server(format!("Failed to generate token: {}", e)))?;

    Ok(LoginResponse {
        token,
        refresh_token,
        user,
    })
}

fn hash(auth: &AuthService, password: &str) -> AppResult<String> {
    auth.hash_password(password)
        .map_err(|_| AppError::Server("Failed to hash password".to_string()))
}

// ==================== Auth Endpoints ====================

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let username = body.username.trim();
    let email = body.email.trim().to_lowercase();

    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let mut user = User {
        id: String::new(),
        username: username.to_string(),
        email,
        password_hash: hash(&state.auth_service, &body.password)?,
        name: body
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| username.to_string()),
        avatar: String::new(),
        bio: String::new(),
        saved_recipes: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    state.store.create_user(&mut user).map_err(|e| match e {
        StoreError::Conflict(_) => AppError::Conflict("Email is already registered".to_string()),
        other => other.into(),
    })?;
    log::info!("User {} registered", user.id);

    let response = issue_tokens(&state.auth_service, user)?;
    Ok(HttpResponse::Created().json(response))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = match state.store.get_user_by_email(&body.email.trim().to_lowercase()) {
        Ok(u) => u,
        Err(StoreError::NotFound(_)) => {
            log::warn!("Login attempt for unknown email");
            return Err(invalid());
        }
        Err(e) => return Err(e.into()),
    };

    let valid = state
        .auth_service
        .verify_password(&body.password, &user.password_hash)
        .unwrap_or(false);

    if !valid {
        log::warn!("Invalid password for user {}", user.id);
        return Err(invalid());
    }

    Ok(HttpResponse::Ok().json(issue_tokens(&state.auth_service, user)?))
}

pub async fn refresh(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    let claims = state
        .auth_service
        .validate_refresh_token(&body.refresh_token)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let user = state.store.get_user(&claims.sub).map_err(|e| match e {
        StoreError::NotFound(_) => AppError::Unauthorized("Invalid refresh token".to_string()),
        other => other.into(),
    })?;

    let pair = issue_tokens(&state.auth_service, user)?;
    Ok(HttpResponse::Ok().json(TokenPair {
        token: pair.token,
        refresh_token: pair.refresh_token,
    }))
}

/// Tokens are stateless; the client discards them.
pub async fn logout(_auth_user: AuthUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({}))))
}

pub async fn verify(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> AppResult<HttpResponse> {
    let user = state.store.get_user(&auth_user.user_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(user)))
}

pub async fn update_profile(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let mut user = state.store.get_user(&auth_user.user_id)?;
    let body = body.into_inner();

    if let Some(name) = body.name {
        user.name = name;
    }
    if let Some(bio) = body.bio {
        user.bio = bio;
    }
    if let Some(avatar) = body.avatar {
        user.avatar = avatar;
    }

    state.store.update_user(&mut user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(user)))
}

pub async fn change_password(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    let mut user = state.store.get_user(&auth_user.user_id)?;

    let valid = state
        .auth_service
        .verify_password(&body.current_password, &user.password_hash)
        .unwrap_or(false);
    if !valid {
        return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
    }
    if body.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    user.password_hash = hash(&state.auth_service, &body.new_password)?;
    state.store.update_user(&mut user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({}))))
}
