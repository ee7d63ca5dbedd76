use chrono::Utc;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::interactions::{toggle_membership, CommentLikeToggle};
use crate::models::{Comment, Reply};
use crate::store::Store;

pub struct CommentService {
    store: Arc<Store>,
}

impl CommentService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, recipe_id: &str, author: Option<&str>, content: &str) -> AppResult<Comment> {
        let author_id = author.ok_or_else(AppError::login_required)?;
        let content = require_content(content, "Comment content is required")?;
        if recipe_id.trim().is_empty() {
            return Err(AppError::validation("Recipe id is required"));
        }
        self.store.get_recipe(recipe_id)?;

        let mut comment = Comment {
            id: String::new(),
            content,
            recipe: recipe_id.to_string(),
            user: author_id.to_string(),
            replies: Vec::new(),
            likes: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user_profile: None,
        };
        self.store.create_comment(&mut comment)?;
        self.hydrate_one(comment)
    }

    pub fn update(&self, comment_id: &str, caller: Option<&str>, content: &str) -> AppResult<Comment> {
        let mut comment = self.owned_comment(comment_id, caller, "update")?;
        comment.content = require_content(content, "Comment content is required")?;
        self.store.update_comment_content(&mut comment)?;
        self.hydrate_one(comment)
    }

    pub fn delete(&self, comment_id: &str, caller: Option<&str>) -> AppResult<()> {
        self.owned_comment(comment_id, caller, "delete")?;
        self.store.delete_comment(comment_id)?;
        Ok(())
    }

    /// Any signed-in user may reply. Replies are append-only.
    pub fn add_reply(&self, comment_id: &str, author: Option<&str>, content: &str) -> AppResult<Comment> {
        let author_id = author.ok_or_else(AppError::login_required)?;
        let content = require_content(content, "Reply content is required")?;
        let mut comment = self.store.get_comment(comment_id)?;

        comment.replies.push(Reply {
            content,
            user: author_id.to_string(),
            created_at: Utc::now(),
            user_profile: None,
        });
        self.store.set_comment_replies(comment_id, &comment.replies)?;
        self.hydrate_one(comment)
    }

    pub fn toggle_like(&self, comment_id: &str, user: Option<&str>) -> AppResult<CommentLikeToggle> {
        let user_id = user.ok_or_else(AppError::login_required)?;
        let mut comment = self.store.get_comment(comment_id)?;

        let is_liked = toggle_membership(&mut comment.likes, user_id);
        self.store.set_comment_likes(comment_id, &comment.likes)?;

        Ok(CommentLikeToggle {
            likes_count: comment.likes.len(),
            is_liked,
        })
    }

    /// Newest first; replies stay in the order they were added.
    pub fn list_by_recipe(&self, recipe_id: &str) -> AppResult<Vec<Comment>> {
        let comments = self.store.list_comments_by_recipe(recipe_id)?;
        self.hydrate(comments)
    }

    fn owned_comment(&self, comment_id: &str, caller: Option<&str>, action: &str) -> AppResult<Comment> {
        let caller = caller.ok_or_else(AppError::login_required)?;
        let comment = self.store.get_comment(comment_id)?;
        if comment.user != caller {
            return Err(AppError::forbidden(format!(
                "Not authorized to {} this comment",
                action
            )));
        }
        Ok(comment)
    }

    fn hydrate_one(&self, comment: Comment) -> AppResult<Comment> {
        self.hydrate(vec![comment])?
            .pop()
            .ok_or_else(|| AppError::Server("Comment vanished during read".to_string()))
    }

    fn hydrate(&self, mut comments: Vec<Comment>) -> AppResult<Vec<Comment>> {
        let mut ids: Vec<String> = Vec::new();
        for comment in &comments {
            ids.push(comment.user.clone());
            ids.extend(comment.replies.iter().map(|r| r.user.clone()));
        }
        ids.sort();
        ids.dedup();
        let profiles = self.store.get_user_summaries(&ids)?;

        for comment in &mut comments {
            comment.user_profile = profiles.get(&comment.user).cloned();
            for reply in &mut comment.replies {
                reply.user_profile = profiles.get(&reply.user).cloned();
            }
        }
        Ok(comments)
    }
}

fn require_content(content: &str, message: &str) -> AppResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::validation(message));
    }
    Ok(content.to_string())
}
