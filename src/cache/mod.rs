//! Network-first story reads with the local database as a fallback.
//!
//! Every read tries the remote API first. A usable answer is written to the
//! `stories` collection before it is returned; anything else falls back to
//! whatever the collection already holds.

pub mod prefetch;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::api::{ApiResponse, ListQuery, StoryApi};
use crate::app::StoryError;
use crate::domain::{Source, Story};
use crate::store::{Collection, Store};

/// Result of one cached read, by tier.
#[derive(Debug)]
pub enum Lookup<T> {
    /// Fresh from the API, already written to the cache.
    Network(T),
    /// Served from the cache after the API failed. `error` carries the reason.
    Cached {
        data: T,
        source: Source,
        error: String,
    },
    /// Neither the API nor the cache produced data.
    Unavailable { source: Source, error: StoryError },
}

impl<T> Lookup<T> {
    pub fn source(&self) -> Source {
        match self {
            Lookup::Network(_) => Source::Network,
            Lookup::Cached { source, .. } | Lookup::Unavailable { source, .. } => *source,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Lookup::Unavailable { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Lookup::Network(data) | Lookup::Cached { data, .. } => Some(data),
            Lookup::Unavailable { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Lookup::Network(data) | Lookup::Cached { data, .. } => Some(data),
            Lookup::Unavailable { .. } => None,
        }
    }

    /// Flatten into the tagged shape handed to presentation code.
    pub fn into_response(self) -> StoryResponse<T> {
        match self {
            Lookup::Network(data) => StoryResponse {
                success: true,
                data: Some(data),
                error: None,
                source: Source::Network,
            },
            Lookup::Cached {
                data,
                source,
                error,
            } => StoryResponse {
                success: true,
                data: Some(data),
                error: Some(error),
                source,
            },
            Lookup::Unavailable { source, error } => StoryResponse {
                success: false,
                data: None,
                error: Some(error.to_string()),
                source,
            },
        }
    }
}

/// Tagged read result: success flag, payload, diagnostic message, provenance.
#[derive(Debug, Clone, Serialize)]
pub struct StoryResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub source: Source,
}

/// Why the network tier did not produce data.
#[derive(Debug)]
enum Miss {
    /// A response arrived but was an error or unusable.
    Server(String),
    /// No response, or the cache write after a good response failed.
    Transport(StoryError),
}

impl Miss {
    fn source(&self) -> Source {
        match self {
            Miss::Server(_) => Source::IndexeddbFallback,
            Miss::Transport(_) => Source::Indexeddb,
        }
    }

    fn from_cache_write(err: StoryError) -> Self {
        if err.is_storage() {
            Miss::Transport(err)
        } else {
            Miss::Server(err.to_string())
        }
    }
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Miss::Server(message) => f.write_str(message),
            Miss::Transport(err) => write!(f, "{}", err),
        }
    }
}

pub struct StoryCache {
    store: Arc<dyn Store + Send + Sync>,
    api: Arc<dyn StoryApi + Send + Sync>,
}

impl StoryCache {
    pub fn new(store: Arc<dyn Store + Send + Sync>, api: Arc<dyn StoryApi + Send + Sync>) -> Self {
        Self { store, api }
    }

    /// Fetch one page of stories, falling back to every cached story.
    pub async fn list_stories(&self, token: &str, query: &ListQuery) -> Lookup<Vec<Story>> {
        let miss = match self.api.list_stories(token, query).await {
            Ok(ApiResponse::Ok(stories)) => {
                match self.store.put_many(Collection::Stories, &stories) {
                    Ok(count) => {
                        tracing::debug!("Cached {} stories from page {}", count, query.page);
                        return Lookup::Network(stories);
                    }
                    Err(e) => {
                        tracing::warn!("Could not cache fetched stories: {}", e);
                        Miss::from_cache_write(e)
                    }
                }
            }
            Ok(ApiResponse::Rejected { status, message }) => {
                tracing::warn!("Story listing rejected ({}), trying local cache", status);
                Miss::Server(message)
            }
            Err(e) => {
                tracing::warn!("Story listing failed: {}, trying local cache", e);
                Miss::Transport(e)
            }
        };

        match self.store.get_all(Collection::Stories) {
            Ok(cached) if !cached.is_empty() => {
                tracing::info!("Serving {} cached stories ({})", cached.len(), miss.source());
                Lookup::Cached {
                    data: cached,
                    source: miss.source(),
                    error: miss.to_string(),
                }
            }
            Ok(_) => Lookup::Unavailable {
                source: Source::NoDataAvailable,
                error: StoryError::DataUnavailable(format!(
                    "{}; no cached stories available",
                    miss
                )),
            },
            Err(e) => {
                tracing::error!("Story cache read failed: {}", e);
                Lookup::Unavailable {
                    source: Source::FetchAndIndexeddbFailed,
                    error: StoryError::DataUnavailable(format!(
                        "{}; cache read failed: {}",
                        miss, e
                    )),
                }
            }
        }
    }

    /// Fetch one story, falling back to its cached copy.
    pub async fn get_story_detail(&self, token: &str, story_id: &str) -> Lookup<Story> {
        let miss = match self.api.get_story(token, story_id).await {
            Ok(ApiResponse::Ok(story)) => match self.store.put(Collection::Stories, &story) {
                Ok(()) => return Lookup::Network(story),
                Err(e) => {
                    tracing::warn!("Could not cache story {}: {}", story_id, e);
                    Miss::from_cache_write(e)
                }
            },
            Ok(ApiResponse::Rejected { status, message }) => {
                tracing::warn!("Story {} rejected ({}), trying local cache", story_id, status);
                Miss::Server(message)
            }
            Err(e) => {
                tracing::warn!("Story {} fetch failed: {}, trying local cache", story_id, e);
                Miss::Transport(e)
            }
        };

        match self.store.get(Collection::Stories, story_id) {
            Ok(Some(story)) => Lookup::Cached {
                data: story,
                source: miss.source(),
                error: miss.to_string(),
            },
            Ok(None) => Lookup::Unavailable {
                source: Source::NoDataAvailable,
                error: StoryError::NotFound(format!("{} ({})", story_id, miss)),
            },
            Err(e) => {
                tracing::error!("Story cache read failed: {}", e);
                Lookup::Unavailable {
                    source: Source::FetchAndIndexeddbFailed,
                    error: StoryError::DataUnavailable(format!(
                        "{}; cache read failed: {}",
                        miss, e
                    )),
                }
            }
        }
    }
}
