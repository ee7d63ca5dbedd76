use actix_web::{web, HttpResponse};

use super::{AppState, ToggleResponse};
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{ApiResponse, CommentContentRequest, CreateCommentRequest};

// ==================== Comment Endpoints ====================

pub async fn list_comments(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let comments = state.comments.list_by_recipe(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(comments)))
}

pub async fn create_comment(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .create(&body.recipe_id, Some(&auth_user.user_id), &body.content)?;
    Ok(HttpResponse::Created().json(ApiResponse::success(comment)))
}

pub async fn update_comment(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<CommentContentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .update(&path.into_inner(), Some(&auth_user.user_id), &body.content)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(comment)))
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state
        .comments
        .delete(&path.into_inner(), Some(&auth_user.user_id))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({}))))
}

pub async fn add_reply(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<CommentContentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .add_reply(&path.into_inner(), Some(&auth_user.user_id), &body.content)?;
    Ok(HttpResponse::Created().json(ApiResponse::success(comment)))
}

pub async fn toggle_like(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let toggle = state
        .comments
        .toggle_like(&path.into_inner(), Some(&auth_user.user_id))?;
    Ok(HttpResponse::Ok().json(ToggleResponse::new(toggle)))
}
