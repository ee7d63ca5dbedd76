//! Client-side request state and session context.
//!
//! A [`Slice`] tracks one resource's async request lifecycle and never lets a
//! failure escape: errors are captured as the slice's message. [`Session`] is
//! the explicit auth context handed to whatever issues requests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::interactions::{FavoriteToggle, LikeToggle};
use crate::models::{Comment, RecipeView};
use crate::search::SearchPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone, Default)]
pub struct Slice<T> {
    pub data: T,
    pub status: RequestStatus,
    pub error: Option<String>,
}

impl<T> Slice<T> {
    pub fn is_loading(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn begin(&mut self) {
        self.status = RequestStatus::Pending;
        self.error = None;
    }

    pub fn fulfill(&mut self, data: T) {
        self.data = data;
        self.status = RequestStatus::Fulfilled;
    }

    pub fn reject(&mut self, message: impl Into<String>) {
        self.status = RequestStatus::Rejected;
        self.error = Some(message.into());
    }

    /// Run `request` and replace the slice data with its result.
    pub async fn track<F>(&mut self, request: F) -> bool
    where
        F: Future<Output = AppResult<T>>,
    {
        self.track_with(request, |data, value| *data = value).await
    }

    /// Run `request` and merge its result into the current data.
    pub async fn track_with<R, F, A>(&mut self, request: F, apply: A) -> bool
    where
        F: Future<Output = AppResult<R>>,
        A: FnOnce(&mut T, R),
    {
        self.begin();
        match request.await {
            Ok(value) => {
                apply(&mut self.data, value);
                self.status = RequestStatus::Fulfilled;
                true
            }
            Err(e) => {
                self.reject(e.to_string());
                false
            }
        }
    }
}

/// All client-held resource slices.
#[derive(Debug, Default)]
pub struct ClientStore {
    pub recipes: Slice<Vec<RecipeView>>,
    pub current: Slice<Option<RecipeView>>,
    pub search: Slice<Option<SearchPage<RecipeView>>>,
    pub comments: HashMap<String, Slice<Vec<Comment>>>,
}

impl ClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_recipes<F>(&mut self, request: F) -> bool
    where
        F: Future<Output = AppResult<Vec<RecipeView>>>,
    {
        self.recipes.track(request).await
    }

    pub async fn load_recipe<F>(&mut self, request: F) -> bool
    where
        F: Future<Output = AppResult<RecipeView>>,
    {
        self.current
            .track_with(request, |current, recipe| *current = Some(recipe))
            .await
    }

    pub async fn search<F>(&mut self, request: F) -> bool
    where
        F: Future<Output = AppResult<SearchPage<RecipeView>>>,
    {
        self.search
            .track_with(request, |page, result| *page = Some(result))
            .await
    }

    pub async fn create_recipe<F>(&mut self, request: F) -> bool
    where
        F: Future<Output = AppResult<RecipeView>>,
    {
        self.recipes
            .track_with(request, |list, created| list.insert(0, created))
            .await
    }

    pub async fn delete_recipe<F>(&mut self, id: &str, request: F) -> bool
    where
        F: Future<Output = AppResult<()>>,
    {
        let deleted = self
            .recipes
            .track_with(request, |list, ()| list.retain(|r| r.recipe.id != id))
            .await;
        if deleted {
            if let Some(current) = &self.current.data {
                if current.recipe.id == id {
                    self.current.data = None;
                }
            }
        }
        deleted
    }

    pub async fn load_comments<F>(&mut self, recipe_id: &str, request: F) -> bool
    where
        F: Future<Output = AppResult<Vec<Comment>>>,
    {
        self.comments
            .entry(recipe_id.to_string())
            .or_default()
            .track(request)
            .await
    }

    pub async fn add_comment<F>(&mut self, recipe_id: &str, request: F) -> bool
    where
        F: Future<Output = AppResult<Comment>>,
    {
        self.comments
            .entry(recipe_id.to_string())
            .or_default()
            .track_with(request, |list, comment| list.insert(0, comment))
            .await
    }

    pub fn comments_for(&self, recipe_id: &str) -> &[Comment] {
        self.comments
            .get(recipe_id)
            .map(|s| s.data.as_slice())
            .unwrap_or(&[])
    }

    /// Reflect a like toggle response on every cached copy of the recipe.
    pub fn apply_like(&mut self, recipe_id: &str, user_id: &str, toggle: LikeToggle) {
        self.for_each_copy(recipe_id, |view| {
            view.recipe.likes.retain(|u| u != user_id);
            if toggle.is_liked {
                view.recipe.likes.push(user_id.to_string());
            }
            view.likes_count = toggle.likes;
            view.is_liked = toggle.is_liked;
        });
    }

    pub fn apply_favorite(&mut self, recipe_id: &str, user_id: &str, toggle: FavoriteToggle) {
        self.for_each_copy(recipe_id, |view| {
            view.recipe.favorites.retain(|u| u != user_id);
            if toggle.is_favorited {
                view.recipe.favorites.push(user_id.to_string());
            }
            view.favorites_count = toggle.favorites_count;
            view.is_favorited = toggle.is_favorited;
        });
    }

    fn for_each_copy(&mut self, recipe_id: &str, mut f: impl FnMut(&mut RecipeView)) {
        let listed = self.recipes.data.iter_mut();
        let current = self.current.data.iter_mut();
        let searched = self.search.data.iter_mut().flat_map(|p| p.data.iter_mut());
        for view in listed.chain(current).chain(searched) {
            if view.recipe.id == recipe_id {
                f(view);
            }
        }
    }
}

/// Resolves a bearer token to a user id.
pub trait TokenVerifier {
    fn verify_token(&self, token: &str) -> Option<String>;
}

/// Where a client keeps its token between runs.
pub trait CredentialStore {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: Mutex<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub token: String,
}

pub struct Session<C: CredentialStore> {
    credentials: C,
    principal: Option<Principal>,
}

impl<C: CredentialStore> Session<C> {
    /// Restore a stored credential. An invalid or expired one is discarded.
    pub fn init(credentials: C, verifier: &dyn TokenVerifier) -> Self {
        let principal = credentials.load().and_then(|token| {
            match verifier.verify_token(&token) {
                Some(user_id) => Some(Principal { user_id, token }),
                None => {
                    log::debug!("Discarding stored credential that no longer verifies");
                    credentials.clear();
                    None
                }
            }
        });

        Self {
            credentials,
            principal,
        }
    }

    pub fn login(&mut self, token: &str, verifier: &dyn TokenVerifier) -> AppResult<&Principal> {
        let user_id = verifier
            .verify_token(token)
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

        self.credentials.save(token);
        Ok(&*self.principal.insert(Principal {
            user_id,
            token: token.to_string(),
        }))
    }

    pub fn logout(&mut self) {
        self.credentials.clear();
        self.principal = None;
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.user_id.as_str())
    }

    /// `Authorization` header value for authenticated requests.
    pub fn authorization(&self) -> Option<String> {
        self.principal
            .as_ref()
            .map(|p| format!("Bearer {}", p.token))
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }
}
