//! Ordered, reorderable recipe instruction blocks.
//!
//! [`SectionEditor`] is the authoring list a form works against before
//! submission. [`SectionInput`] is what arrives at the server, and
//! [`resolve_sections`] turns inputs plus uploaded files into persisted
//! [`Section`]s. Array position is the only rank; there is no order field.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::media::{ImageUpload, MediaError};
use crate::models::Section;

/// A section as submitted by a client. `id` only exists to pair the block
/// with its uploaded image and is not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionField {
    Title,
    Content,
}

/// One block in the authoring list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSection {
    pub id: String,
    pub title: String,
    pub content: String,
    /// New image waiting to be uploaded.
    pub image: Option<ImageUpload>,
    /// Image already stored on the recipe (edit flow).
    pub image_url: Option<String>,
}

impl DraftSection {
    fn empty(id: String) -> Self {
        Self {
            id,
            title: String::new(),
            content: String::new(),
            image: None,
            image_url: None,
        }
    }
}

/// Serialized form of an editor, ready to be sent as `sections` plus
/// `sectionImages` form parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSubmission {
    pub sections: Vec<SectionInput>,
    pub images: Vec<ImageUpload>,
}

impl SectionSubmission {
    pub fn sections_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.sections)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectionEditor {
    sections: Vec<DraftSection>,
    last_id: i64,
}

impl SectionEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh form with two empty blocks.
    pub fn starter() -> Self {
        Self {
            sections: vec![
                DraftSection::empty("section-1".to_string()),
                DraftSection::empty("section-2".to_string()),
            ],
            last_id: 2,
        }
    }

    /// Load persisted sections for editing. Stored images are kept by URL.
    pub fn from_sections(sections: &[Section]) -> Self {
        let mut editor = Self::new();
        for section in sections {
            let id = editor.next_id();
            editor.sections.push(DraftSection {
                id,
                title: section.title.clone(),
                content: section.content.clone(),
                image: None,
                image_url: section.image_url.clone(),
            });
        }
        editor
    }

    pub fn sections(&self) -> &[DraftSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    // Millisecond timestamp, bumped past the last issued value so ids stay
    // unique when several blocks are added within the same millisecond.
    fn next_id(&mut self) -> String {
        let stamp = Utc::now().timestamp_millis().max(self.last_id + 1);
        self.last_id = stamp;
        format!("section-{}", stamp)
    }

    /// Append an empty block and return its id.
    pub fn add_section(&mut self) -> String {
        let id = self.next_id();
        self.sections.push(DraftSection::empty(id.clone()));
        id
    }

    /// Out-of-range indexes are ignored.
    pub fn update_field(&mut self, index: usize, field: SectionField, value: impl Into<String>) {
        if let Some(section) = self.sections.get_mut(index) {
            match field {
                SectionField::Title => section.title = value.into(),
                SectionField::Content => section.content = value.into(),
            }
        }
    }

    pub fn remove_section(&mut self, index: usize) -> Option<DraftSection> {
        if index < self.sections.len() {
            Some(self.sections.remove(index))
        } else {
            None
        }
    }

    /// Move the block `source_id` so it lands at `target_index` once it has
    /// been taken out of the list. Returns whether anything moved.
    pub fn reorder(&mut self, source_id: &str, target_index: usize) -> bool {
        let Some(source) = self.sections.iter().position(|s| s.id == source_id) else {
            return false;
        };
        if source == target_index {
            return false;
        }

        let moved = self.sections.remove(source);
        let target = target_index.min(self.sections.len());
        self.sections.insert(target, moved);
        source != target
    }

    /// Replaces any prior image, uploaded or stored.
    pub fn attach_image(&mut self, index: usize, image: ImageUpload) {
        if let Some(section) = self.sections.get_mut(index) {
            section.image = Some(image);
            section.image_url = None;
        }
    }

    pub fn detach_image(&mut self, index: usize) {
        if let Some(section) = self.sections.get_mut(index) {
            section.image = None;
            section.image_url = None;
        }
    }

    /// Serialize in current order. Images are renamed `section-<id>` so the
    /// server can pair them back up.
    pub fn into_submission(self) -> SectionSubmission {
        let mut sections = Vec::with_capacity(self.sections.len());
        let mut images = Vec::new();

        for draft in self.sections {
            if let Some(mut image) = draft.image {
                image.filename = format!("section-{}", draft.id);
                images.push(image);
            }
            sections.push(SectionInput {
                id: draft.id,
                title: draft.title,
                content: draft.content,
                image_url: draft.image_url,
            });
        }

        SectionSubmission { sections, images }
    }
}

/// Pair uploaded images with submitted sections and encode them.
///
/// An image whose filename is exactly `section-<id>` or `<id>` wins; otherwise
/// the first filename containing the id is used. Images that match no section
/// are dropped with a warning. A section without a new image keeps the
/// `imageUrl` it was submitted with.
pub fn resolve_sections(
    inputs: Vec<SectionInput>,
    images: &[ImageUpload],
) -> Result<Vec<Section>, MediaError> {
    let mut used = vec![false; images.len()];
    let mut sections = Vec::with_capacity(inputs.len());

    for input in inputs {
        let mut image_url = input.image_url.filter(|url| !url.is_empty());

        if let Some(idx) = match_image(&input.id, images, &used) {
            used[idx] = true;
            image_url = Some(images[idx].to_data_uri()?);
        }

        sections.push(Section {
            title: input.title,
            content: input.content,
            image_url,
        });
    }

    for (image, was_used) in images.iter().zip(&used) {
        if !was_used {
            log::warn!("Ignoring section image {:?}: no matching section", image.filename);
        }
    }

    Ok(sections)
}

fn match_image(id: &str, images: &[ImageUpload], used: &[bool]) -> Option<usize> {
    if id.is_empty() {
        return None;
    }
    let exact = format!("section-{}", id);
    let available = || {
        images
            .iter()
            .enumerate()
            .filter(|(i, _)| !used[*i])
    };

    available()
        .find(|(_, img)| file_stem(&img.filename) == exact || file_stem(&img.filename) == id)
        .or_else(|| available().find(|(_, img)| img.filename.contains(id)))
        .map(|(i, _)| i)
}

fn file_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => &filename[..dot],
        _ => filename,
    }
}
