//! Recipe CRUD, ownership checks and read-time counter maintenance.

use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::media::ImageUpload;
use crate::models::{Recipe, RecipeView};
use crate::sections::{resolve_sections, SectionInput};
use crate::store::{RecipeFilter, Store};

/// A list field submitted either as one delimited string or as an array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    Raw(String),
    List(Vec<String>),
}

impl StringList {
    /// Comma-separated tags. Blank and repeated (case-insensitive) tags are dropped.
    pub fn into_tags(self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in self.split(',') {
            if !tags.iter().any(|t| t.to_lowercase() == tag.to_lowercase()) {
                tags.push(tag);
            }
        }
        tags
    }

    /// One ingredient per line; blank lines are dropped.
    pub fn into_lines(self) -> Vec<String> {
        self.split('\n')
    }

    fn split(self, separator: char) -> Vec<String> {
        let items = match self {
            StringList::List(items) => items,
            StringList::Raw(raw) => {
                let trimmed = raw.trim_start();
                match serde_json::from_str::<Vec<String>>(trimmed) {
                    Ok(items) if trimmed.starts_with('[') => items,
                    _ => raw.split(separator).map(str::to_string).collect(),
                }
            }
        };

        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

impl From<&str> for StringList {
    fn from(raw: &str) -> Self {
        StringList::Raw(raw.to_string())
    }
}

/// Everything needed to create a recipe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeDraft {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<StringList>,
    pub ingredients: Option<StringList>,
    #[serde(default)]
    pub sections: Vec<SectionInput>,
    #[serde(skip)]
    pub image: Option<ImageUpload>,
    #[serde(skip)]
    pub section_images: Vec<ImageUpload>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<StringList>,
    pub ingredients: Option<StringList>,
    pub sections: Option<Vec<SectionInput>>,
    #[serde(skip)]
    pub image: Option<ImageUpload>,
    #[serde(skip)]
    pub section_images: Vec<ImageUpload>,
}

pub struct RecipeRepository {
    store: Arc<Store>,
}

impl RecipeRepository {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, author_id: &str, draft: RecipeDraft) -> AppResult<Recipe> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }

        let image_url = draft.image.as_ref().map(|img| img.to_data_uri()).transpose()?;
        let sections = resolve_sections(draft.sections, &draft.section_images)?;

        let mut recipe = Recipe {
            id: String::new(),
            title: title.to_string(),
            description: draft.description.filter(|d| !d.trim().is_empty()),
            tags: draft.tags.map(StringList::into_tags).unwrap_or_default(),
            ingredients: draft.ingredients.map(StringList::into_lines).unwrap_or_default(),
            image_url,
            sections,
            author: author_id.to_string(),
            likes: Vec::new(),
            favorites: Vec::new(),
            views: 0,
            comments_count: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        self.store.create_recipe(&mut recipe)?;
        log::info!("Recipe {} created by {}", recipe.id, author_id);
        Ok(recipe)
    }

    /// Detail read. Bumps `views` on every call and re-syncs `commentsCount`
    /// when it has drifted from the comment table.
    pub fn get_by_id(&self, id: &str, viewer: Option<&str>) -> AppResult<RecipeView> {
        self.store.increment_views(id)?;
        let mut recipe = self.store.get_recipe(id)?;

        let actual = self.store.count_comments_by_recipe(id)?;
        if actual != recipe.comments_count {
            log::debug!(
                "Correcting commentsCount for {}: {} -> {}",
                id,
                recipe.comments_count,
                actual
            );
            self.store.set_comments_count(id, actual)?;
            recipe.comments_count = actual;
        }

        let mut views = self.present(vec![recipe], viewer)?;
        views
            .pop()
            .ok_or_else(|| AppError::Server("Recipe vanished during read".to_string()))
    }

    pub fn update(&self, id: &str, caller: Option<&str>, patch: RecipePatch) -> AppResult<Recipe> {
        let mut recipe = self.owned_recipe(id, caller, "update")?;

        if let Some(title) = patch.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::validation("Title cannot be empty"));
            }
            recipe.title = title.to_string();
        }
        if let Some(description) = patch.description {
            recipe.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(tags) = patch.tags {
            recipe.tags = tags.into_tags();
        }
        if let Some(ingredients) = patch.ingredients {
            recipe.ingredients = ingredients.into_lines();
        }
        if let Some(image) = &patch.image {
            recipe.image_url = Some(image.to_data_uri()?);
        }
        match patch.sections {
            Some(inputs) => recipe.sections = resolve_sections(inputs, &patch.section_images)?,
            None if !patch.section_images.is_empty() => {
                log::warn!(
                    "Ignoring {} section image(s) on {}: no sections supplied",
                    patch.section_images.len(),
                    id
                );
            }
            None => {}
        }

        self.store.update_recipe(&mut recipe)?;
        Ok(recipe)
    }

    pub fn delete(&self, id: &str, caller: Option<&str>) -> AppResult<()> {
        self.owned_recipe(id, caller, "delete")?;
        self.store.delete_recipe(id)?;
        log::info!("Recipe {} deleted", id);
        Ok(())
    }

    pub fn list_all(&self, viewer: Option<&str>) -> AppResult<Vec<RecipeView>> {
        self.list(&RecipeFilter::default(), viewer)
    }

    pub fn list_by_author(&self, author_id: &str, viewer: Option<&str>) -> AppResult<Vec<RecipeView>> {
        let filter = RecipeFilter {
            author: Some(author_id.to_string()),
            ..Default::default()
        };
        self.list(&filter, viewer)
    }

    /// Recipes with at least one tag containing `tag`.
    pub fn list_by_tag(&self, tag: &str, viewer: Option<&str>) -> AppResult<Vec<RecipeView>> {
        let filter = RecipeFilter {
            tag_terms: vec![tag.trim_start_matches('#').to_string()],
            ..Default::default()
        };
        self.list(&filter, viewer)
    }

    pub fn list_favorites(&self, user_id: &str) -> AppResult<Vec<RecipeView>> {
        let filter = RecipeFilter {
            favorited_by: Some(user_id.to_string()),
            ..Default::default()
        };
        self.list(&filter, Some(user_id))
    }

    pub fn list_saved(&self, user_id: &str) -> AppResult<Vec<RecipeView>> {
        let user = self.store.get_user(user_id)?;
        let filter = RecipeFilter {
            ids: Some(user.saved_recipes),
            ..Default::default()
        };
        self.list(&filter, Some(user_id))
    }

    fn list(&self, filter: &RecipeFilter, viewer: Option<&str>) -> AppResult<Vec<RecipeView>> {
        let recipes = self.store.list_recipes(filter, 0, None)?;
        self.present(recipes, viewer)
    }

    /// Attach author profiles and per-viewer flags.
    pub fn present(&self, recipes: Vec<Recipe>, viewer: Option<&str>) -> AppResult<Vec<RecipeView>> {
        let authors: Vec<String> = recipes.iter().map(|r| r.author.clone()).collect();
        let profiles = self.store.get_user_summaries(&authors)?;

        Ok(recipes
            .into_iter()
            .map(|recipe| {
                let profile = profiles.get(&recipe.author).cloned();
                RecipeView::new(recipe, viewer, profile)
            })
            .collect())
    }

    fn owned_recipe(&self, id: &str, caller: Option<&str>, action: &str) -> AppResult<Recipe> {
        let caller = caller.ok_or_else(AppError::login_required)?;
        let recipe = self.store.get_recipe(id)?;
        if recipe.author != caller {
            return Err(AppError::forbidden(format!(
                "Not authorized to {} this recipe",
                action
            )));
        }
        Ok(recipe)
    }
}
