// Data models for the Notes and Action Items backend

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::record::{Record, Validate};

/// Shortest accepted note title / action item description
pub const MIN_TEXT_LEN: usize = 3;

/// A note as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
}

/// Body of `POST /notes/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
}

/// Body of `PATCH /notes/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// An action item as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: i64,
    pub description: String,
    pub completed: bool,
}

/// Body of `POST /action-items/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItemInput {
    pub description: String,
}

impl Record for Note {
    type Input = NoteInput;

    fn id(&self) -> i64 {
        self.id
    }

    fn collection_name() -> &'static str {
        "notes"
    }

    fn placeholder(id: i64, input: &NoteInput) -> Self {
        Self {
            id,
            title: input.title.clone(),
            content: input.content.clone(),
        }
    }
}

impl Record for ActionItem {
    type Input = ActionItemInput;

    fn id(&self) -> i64 {
        self.id
    }

    fn collection_name() -> &'static str {
        "action-items"
    }

    fn placeholder(id: i64, input: &ActionItemInput) -> Self {
        Self {
            id,
            description: input.description.clone(),
            completed: false,
        }
    }
}

impl NoteInput {
    /// Trimmed copy of the input, as it is submitted
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }
    }
}

impl ActionItemInput {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.trim().to_string(),
        }
    }
}

impl NotePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    /// Apply the present fields to `note` in place
    pub fn apply(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
    }
}

fn check_text(field: &str, value: &str, required: bool, min_len: Option<usize>) -> Result<(), ApiError> {
    let trimmed = value.trim();
    if required && trimmed.is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    match min_len {
        Some(min) if trimmed.chars().count() < min => Err(ApiError::validation(format!(
            "{} must be at least {} characters",
            field, min
        ))),
        _ => Ok(()),
    }
}

impl Validate for NoteInput {
    fn validate(&self) -> Result<(), ApiError> {
        check_text("Title", &self.title, true, Some(MIN_TEXT_LEN))?;
        check_text("Content", &self.content, true, None)
    }
}

impl Validate for ActionItemInput {
    fn validate(&self) -> Result<(), ApiError> {
        check_text("Description", &self.description, true, Some(MIN_TEXT_LEN))
    }
}

impl Validate for NotePatch {
    fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::validation("Nothing to update"));
        }
        if let Some(title) = &self.title {
            check_text("Title", title, true, Some(MIN_TEXT_LEN))?;
        }
        if let Some(content) = &self.content {
            check_text("Content", content, true, None)?;
        }
        Ok(())
    }
}
