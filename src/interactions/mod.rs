//! Like / favorite / save toggles.
//!
//! Each toggle is a read-modify-write of one membership set. Concurrent
//! toggles on the same document are last-write-wins.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::store::Store;

/// Flip `user_id`'s membership in `members`. Returns the new state.
pub fn toggle_membership(members: &mut Vec<String>, user_id: &str) -> bool {
    if let Some(pos) = members.iter().position(|m| m == user_id) {
        members.remove(pos);
        false
    } else {
        members.push(user_id.to_string());
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub likes: usize,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggle {
    pub favorites_count: usize,
    pub is_favorited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveToggle {
    pub saved_count: usize,
    pub is_saved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentLikeToggle {
    pub likes_count: usize,
    pub is_liked: bool,
}

pub struct InteractionService {
    store: Arc<Store>,
}

impl InteractionService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn toggle_like(&self, recipe_id: &str, user: Option<&str>) -> AppResult<LikeToggle> {
        let user_id = user.ok_or_else(AppError::login_required)?;
        let mut recipe = self.store.get_recipe(recipe_id)?;

        let is_liked = toggle_membership(&mut recipe.likes, user_id);
        self.store.set_recipe_likes(recipe_id, &recipe.likes)?;

        Ok(LikeToggle {
            likes: recipe.likes.len(),
            is_liked,
        })
    }

    pub fn toggle_favorite(&self, recipe_id: &str, user: Option<&str>) -> AppResult<FavoriteToggle> {
        let user_id = user.ok_or_else(AppError::login_required)?;
        let mut recipe = self.store.get_recipe(recipe_id)?;

        let is_favorited = toggle_membership(&mut recipe.favorites, user_id);
        self.store.set_recipe_favorites(recipe_id, &recipe.favorites)?;

        Ok(FavoriteToggle {
            favorites_count: recipe.favorites.len(),
            is_favorited,
        })
    }

    /// Save lives on the user document, not the recipe.
    pub fn toggle_save(&self, recipe_id: &str, user: Option<&str>) -> AppResult<SaveToggle> {
        let user_id = user.ok_or_else(AppError::login_required)?;
        let mut account = self.store.get_user(user_id)?;
        // Saving needs a live recipe; unsaving a dangling id is always allowed.
        if !account.saved_recipes.iter().any(|id| id == recipe_id) {
            self.store.get_recipe(recipe_id)?;
        }

        let is_saved = toggle_membership(&mut account.saved_recipes, recipe_id);
        self.store.set_saved_recipes(user_id, &account.saved_recipes)?;

        Ok(SaveToggle {
            saved_count: account.saved_recipes.len(),
            is_saved,
        })
    }
}
