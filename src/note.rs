//! Core note record for the Lumina workspace.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Represents a single note in the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: String,
    /// Note title
    #[serde(default)]
    pub title: String,
    /// Note body
    #[serde(default)]
    pub content: String,
    /// Labels for organization, kept free of duplicates
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the note is bookmarked
    #[serde(default)]
    pub is_favorite: bool,
    /// Generated summary, present once a summary request succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    /// Last modification time in milliseconds since epoch
    pub updated_at: i64,
}

impl Note {
    /// Creates an empty, untagged note
    pub fn new() -> Self {
        Note {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            content: String::new(),
            tags: Vec::new(),
            is_favorite: false,
            ai_summary: None,
            updated_at: now_millis(),
        }
    }

    /// Advances `updated_at`, never moving it backwards or leaving it unchanged.
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at.saturating_add(1));
    }

    /// Merges the set fields of `patch` and advances the timestamp.
    pub fn apply(&mut self, patch: NotePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(summary) = patch.ai_summary {
            self.ai_summary = Some(summary);
        }
        self.touch();
    }

    /// Case-insensitive substring match on title or content.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial update for a note. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    pub ai_summary: Option<String>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        NotePatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        NotePatch {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Folds a later patch into this one; the later value wins per field.
    pub fn merge(&mut self, later: NotePatch) {
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.content.is_some() {
            self.content = later.content;
        }
        if later.tags.is_some() {
            self.tags = later.tags;
        }
        if later.is_favorite.is_some() {
            self.is_favorite = later.is_favorite;
        }
        if later.ai_summary.is_some() {
            self.ai_summary = later.ai_summary;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == NotePatch::default()
    }
}

/// Trims labels and drops blanks and repeats, keeping first occurrence order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !seen.iter().any(|t: &String| t == tag) {
            seen.push(tag.to_string());
        }
    }
    seen
}
