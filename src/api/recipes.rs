use actix_web::{web, HttpRequest, HttpResponse};

use super::{AppState, RecipeBody, ToggleResponse};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::AppResult;
use crate::models::ApiResponse;
use crate::search::SearchParams;

// ==================== Recipe Endpoints ====================

pub async fn create_recipe(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    req: HttpRequest,
    payload: web::Payload,
) -> AppResult<HttpResponse> {
    let draft = RecipeBody::read(&req, payload, state.body_limit)
        .await?
        .into_draft()?;

    let recipe = state.recipes.create(&auth_user.user_id, draft)?;
    let view = state.recipes.present(vec![recipe], Some(&auth_user.user_id))?;
    Ok(HttpResponse::Created().json(ApiResponse::success(view.into_iter().next())))
}

pub async fn list_recipes(
    state: web::Data<AppState>,
    viewer: MaybeAuthUser,
) -> AppResult<HttpResponse> {
    let recipes = state.recipes.list_all(viewer.user_id())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(recipes)))
}

pub async fn search_recipes(
    state: web::Data<AppState>,
    viewer: MaybeAuthUser,
    params: web::Query<SearchParams>,
) -> AppResult<HttpResponse> {
    let (query, page) = params.split();
    let result = state.search.search(&query, page, viewer.user_id())?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": result.data,
        "pagination": result.pagination
    })))
}

pub async fn get_recipe(
    state: web::Data<AppState>,
    viewer: MaybeAuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let recipe = state.recipes.get_by_id(&id, viewer.user_id())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(recipe)))
}

pub async fn update_recipe(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    req: HttpRequest,
    payload: web::Payload,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let patch = RecipeBody::read(&req, payload, state.body_limit)
        .await?
        .into_patch()?;

    let recipe = state.recipes.update(&id, Some(&auth_user.user_id), patch)?;
    let view = state.recipes.present(vec![recipe], Some(&auth_user.user_id))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(view.into_iter().next())))
}

pub async fn delete_recipe(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.recipes.delete(&id, Some(&auth_user.user_id))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({}))))
}

pub async fn list_by_user(
    state: web::Data<AppState>,
    viewer: MaybeAuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let recipes = state.recipes.list_by_author(&user_id, viewer.user_id())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(recipes)))
}

pub async fn list_by_tag(
    state: web::Data<AppState>,
    viewer: MaybeAuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let tag = path.into_inner();
    let recipes = state.recipes.list_by_tag(&tag, viewer.user_id())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(recipes)))
}

// ==================== Collections ====================

pub async fn list_favorites(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> AppResult<HttpResponse> {
    let recipes = state.recipes.list_favorites(&auth_user.user_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(recipes)))
}

pub async fn list_saved(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> AppResult<HttpResponse> {
    let recipes = state.recipes.list_saved(&auth_user.user_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(recipes)))
}

// ==================== Toggles ====================

pub async fn toggle_like(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let toggle = state
        .interactions
        .toggle_like(&path.into_inner(), Some(&auth_user.user_id))?;
    Ok(HttpResponse::Ok().json(ToggleResponse::new(toggle)))
}

pub async fn toggle_favorite(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let toggle = state
        .interactions
        .toggle_favorite(&path.into_inner(), Some(&auth_user.user_id))?;
    Ok(HttpResponse::Ok().json(ToggleResponse::new(toggle)))
}

pub async fn toggle_save(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let toggle = state
        .interactions
        .toggle_save(&path.into_inner(), Some(&auth_user.user_id))?;
    Ok(HttpResponse::Ok().json(ToggleResponse::new(toggle)))
}
