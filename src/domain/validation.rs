//! Input checks shared by the CLI, account and add-story paths.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::{Result, StoryError};

/// Shortest password the register endpoint accepts.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Largest photo the add-story endpoint accepts.
pub const MAX_PHOTO_BYTES: usize = 1024 * 1024;

const IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_CHARS
}

pub fn is_valid_image(content_type: &str, size: usize) -> bool {
    IMAGE_TYPES.contains(&content_type) && size <= MAX_PHOTO_BYTES
}

/// Guess an image content type from a file extension.
pub fn image_content_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Coordinates must come as a pair and lie on the globe.
pub fn validate_coordinates(lat: Option<f64>, lon: Option<f64>) -> Result<Option<(f64, f64)>> {
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(StoryError::InvalidRecord(format!(
                    "coordinates out of range: {}, {}",
                    lat, lon
                )));
            }
            Ok(Some((lat, lon)))
        }
        _ => Err(StoryError::InvalidRecord(
            "lat and lon must be given together".into(),
        )),
    }
}
