pub mod http;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::Story;

pub use http::HttpStoryApi;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Pagination and filter parameters for a story listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub size: u32,
    /// Only stories that carry coordinates.
    pub with_location: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            with_location: false,
        }
    }
}

impl ListQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }
}

/// Outcome of a request that reached the server.
///
/// Transport failures (no response at all) are reported as
/// `Err(StoryError::Transport)` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    /// Success status and a well-formed body.
    Ok(T),
    /// Non-success status, or a success status with an unusable body.
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait StoryApi {
    async fn list_stories(&self, token: &str, query: &ListQuery)
        -> Result<ApiResponse<Vec<Story>>>;

    async fn get_story(&self, token: &str, story_id: &str) -> Result<ApiResponse<Story>>;
}
