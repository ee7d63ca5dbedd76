use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::comments::CommentService;
use crate::interactions::InteractionService;
use crate::recipes::RecipeRepository;
use crate::search::SearchEngine;
use crate::store::Store;

mod auth;
mod comments;
mod form;
mod recipes;

pub use form::RecipeBody;

/// Default cap on a request body read by the recipe form decoder (30 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 30 * 1024 * 1024;

pub struct AppState {
    pub store: Arc<Store>,
    pub auth_service: Arc<AuthService>,
    pub recipes: RecipeRepository,
    pub search: SearchEngine,
    pub interactions: InteractionService,
    pub comments: CommentService,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(store: Arc<Store>, auth_service: Arc<AuthService>) -> Self {
        Self {
            recipes: RecipeRepository::new(store.clone()),
            search: SearchEngine::new(store.clone()),
            interactions: InteractionService::new(store.clone()),
            comments: CommentService::new(store.clone()),
            store,
            auth_service,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

/// Flat toggle body: `{"success": true, <toggle fields>}`.
#[derive(Serialize)]
pub struct ToggleResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub toggle: T,
}

impl<T> ToggleResponse<T> {
    pub fn new(toggle: T) -> Self {
        Self {
            success: true,
            toggle,
        }
    }
}

// ==================== Health Check ====================

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// ==================== Route Configuration ====================

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health))

        // Auth
        .route("/api/auth/register", web::post().to(auth::register))
        .route("/api/auth/login", web::post().to(auth::login))
        .route("/api/auth/refresh", web::post().to(auth::refresh))
        .route("/api/auth/logout", web::post().to(auth::logout))
        .route("/api/auth/verify", web::get().to(auth::verify))
        .route("/api/auth/profile", web::put().to(auth::update_profile))
        .route("/api/auth/password", web::patch().to(auth::change_password))

        // Recipes: fixed paths before `/{id}`
        .route("/api/recipes", web::get().to(recipes::list_recipes))
        .route("/api/recipes", web::post().to(recipes::create_recipe))
        .route("/api/recipes/search", web::get().to(recipes::search_recipes))
        .route("/api/recipes/favorites", web::get().to(recipes::list_favorites))
        .route("/api/recipes/saved-recipes", web::get().to(recipes::list_saved))
        .route("/api/recipes/user/{user_id}", web::get().to(recipes::list_by_user))
        .route("/api/recipes/user/{id}/save", web::patch().to(recipes::toggle_save))
        .route("/api/recipes/tag/{tag}", web::get().to(recipes::list_by_tag))
        .route("/api/recipes/{id}", web::get().to(recipes::get_recipe))
        .route("/api/recipes/{id}", web::put().to(recipes::update_recipe))
        .route("/api/recipes/{id}", web::delete().to(recipes::delete_recipe))
        .route("/api/recipes/{id}/like", web::post().to(recipes::toggle_like))
        .route("/api/recipes/{id}/favorite", web::post().to(recipes::toggle_favorite))
        .route("/api/recipes/{id}/save", web::post().to(recipes::toggle_save))
        .route("/api/recipes/{id}/save", web::patch().to(recipes::toggle_save))

        // Comments
        .route("/api/comments", web::post().to(comments::create_comment))
        .route("/api/comments/recipe/{recipe_id}", web::get().to(comments::list_comments))
        .route("/api/comments/{id}", web::put().to(comments::update_comment))
        .route("/api/comments/{id}", web::delete().to(comments::delete_comment))
        .route("/api/comments/{id}/reply", web::post().to(comments::add_reply))
        .route("/api/comments/{id}/like", web::post().to(comments::toggle_like));
}
