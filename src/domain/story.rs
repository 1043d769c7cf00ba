use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{Result, StoryError};

/// A story as served by the remote API and as stored in both local collections.
///
/// The wire shape and the record shape are identical, so the same struct is
/// deserialized from responses and written to the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub name: String,
    pub description: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Story {
    pub fn new(id: &str, name: &str, description: &str, photo_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            photo_url: photo_url.to_string(),
            created_at: Utc::now(),
            lat: None,
            lon: None,
        }
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    /// Coordinates, only when both halves are present.
    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Checks the record invariants enforced before anything is persisted.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(StoryError::InvalidRecord("story id is empty".into()));
        }
        if self.lat.is_some() != self.lon.is_some() {
            return Err(StoryError::InvalidRecord(format!(
                "story {} has only one of lat/lon",
                self.id
            )));
        }
        // SQLite reads a stored NaN back as NULL, which would split the pair.
        if let Some((lat, lon)) = self.location() {
            if !lat.is_finite() || !lon.is_finite() {
                return Err(StoryError::InvalidRecord(format!(
                    "story {} has non-finite coordinates",
                    self.id
                )));
            }
        }
        Ok(())
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(anonymous)"
        } else {
            &self.name
        }
    }

    /// First line of the description, truncated for list views.
    pub fn summary(&self, max_chars: usize) -> String {
        let first_line = self.description.lines().next().unwrap_or("");
        if first_line.chars().count() <= max_chars {
            first_line.to_string()
        } else {
            let cut: String = first_line.chars().take(max_chars).collect();
            format!("{}…", cut)
        }
    }
}

/// A story draft submitted through the add-story endpoint.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub description: String,
    pub photo: Vec<u8>,
    pub photo_name: String,
    pub photo_content_type: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}
