//! Recipe create/update bodies: `multipart/form-data` or JSON.

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest};
use futures_util::StreamExt;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::media::ImageUpload;
use crate::recipes::{RecipeDraft, RecipePatch, StringList};
use crate::sections::SectionInput;

pub enum RecipeBody {
    Json(serde_json::Value),
    Form(RecipeForm),
}

#[derive(Debug, Default)]
pub struct RecipeForm {
    pub fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
    pub section_images: Vec<ImageUpload>,
}

impl RecipeForm {
    /// Text field, with empty values treated as absent.
    fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).filter(|v| !v.is_empty()).cloned()
    }

    fn sections(&self) -> AppResult<Option<Vec<SectionInput>>> {
        match self.text("sections") {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|_| AppError::validation("Invalid sections format")),
            None => Ok(None),
        }
    }
}

impl RecipeBody {
    pub async fn read(req: &HttpRequest, payload: web::Payload, limit: usize) -> AppResult<Self> {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        if content_type.starts_with("multipart/") {
            read_multipart(req, payload, limit).await.map(RecipeBody::Form)
        } else {
            read_json(payload, limit).await.map(RecipeBody::Json)
        }
    }

    pub fn into_draft(self) -> AppResult<RecipeDraft> {
        match self {
            RecipeBody::Json(value) => serde_json::from_value(value)
                .map_err(|e| AppError::validation(format!("Invalid recipe body: {}", e))),
            RecipeBody::Form(form) => Ok(RecipeDraft {
                title: form.text("title").unwrap_or_default(),
                description: form.text("description"),
                tags: form.text("tags").map(StringList::Raw),
                ingredients: form.text("ingredients").map(StringList::Raw),
                sections: form.sections()?.unwrap_or_default(),
                image: form.image,
                section_images: form.section_images,
            }),
        }
    }

    pub fn into_patch(self) -> AppResult<RecipePatch> {
        match self {
            RecipeBody::Json(value) => serde_json::from_value(value)
                .map_err(|e| AppError::validation(format!("Invalid recipe body: {}", e))),
            RecipeBody::Form(form) => Ok(RecipePatch {
                title: form.text("title"),
                description: form.text("description"),
                tags: form.text("tags").map(StringList::Raw),
                ingredients: form.text("ingredients").map(StringList::Raw),
                sections: form.sections()?,
                image: form.image,
                section_images: form.section_images,
            }),
        }
    }
}

async fn read_json(mut payload: web::Payload, limit: usize) -> AppResult<serde_json::Value> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::validation(format!("Failed to read body: {}", e)))?;
        if body.len() + chunk.len() > limit {
            return Err(AppError::validation("Request body too large"));
        }
        body.extend_from_slice(&chunk);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_slice(&body).map_err(|e| AppError::validation(format!("Invalid JSON: {}", e)))
}

async fn read_multipart(req: &HttpRequest, payload: web::Payload, limit: usize) -> AppResult<RecipeForm> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut form = RecipeForm::default();
    let mut total = 0usize;

    while let Some(item) = multipart.next().await {
        let mut field =
            item.map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?;

        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::validation(format!("Failed to read field: {}", e)))?;
            total += chunk.len();
            if total > limit {
                return Err(AppError::validation("Request body too large"));
            }
            data.extend_from_slice(&chunk);
        }

        let is_file = matches!(name.as_str(), "image" | "sectionImages" | "sectionImages[]");
        if is_file && data.is_empty() && filename.as_deref().unwrap_or("").is_empty() {
            // A file input left blank still submits an empty part.
            log::debug!("Skipping empty {} part", name);
            continue;
        }

        match name.as_str() {
            "image" => {
                form.image = Some(ImageUpload::new(filename.unwrap_or(name), content_type, data));
            }
            "sectionImages" | "sectionImages[]" => {
                form.section_images
                    .push(ImageUpload::new(filename.unwrap_or_default(), content_type, data));
            }
            _ => {
                let value = String::from_utf8(data)
                    .map_err(|_| AppError::validation(format!("Field {} is not valid UTF-8", name)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
