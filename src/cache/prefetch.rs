use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::api::ListQuery;
use crate::cache::{Lookup, StoryCache};
use crate::domain::Story;

pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on pages read by one prefetch run.
pub const MAX_PREFETCH_PAGES: u32 = 100;

/// Warms the story cache by reading several pages concurrently.
pub struct Prefetcher {
    cache: Arc<StoryCache>,
    semaphore: Arc<Semaphore>,
}

impl Prefetcher {
    pub fn new(cache: Arc<StoryCache>) -> Self {
        Self::with_workers(cache, DEFAULT_WORKERS)
    }

    pub fn with_workers(cache: Arc<StoryCache>, workers: usize) -> Self {
        Self {
            cache,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Read pages `1..=pages` through the cache, at most
    /// [`MAX_PREFETCH_PAGES`]. Results are ordered by page.
    pub async fn prefetch(
        &self,
        token: &str,
        pages: u32,
        template: ListQuery,
    ) -> Vec<(u32, Lookup<Vec<Story>>)> {
        if pages > MAX_PREFETCH_PAGES {
            tracing::warn!(
                "Prefetch of {} pages capped at {}",
                pages,
                MAX_PREFETCH_PAGES
            );
        }
        let pages = pages.min(MAX_PREFETCH_PAGES);
        let mut handles = Vec::new();

        for page in 1..=pages {
            // Take the permit before spawning so at most `workers` tasks exist.
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!("Prefetch semaphore closed: {}", e);
                    break;
                }
            };
            let cache = self.cache.clone();
            let token = token.to_string();
            let query = ListQuery { page, ..template };

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let lookup = cache.list_stories(&token, &query).await;
                (page, lookup)
            });

            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Prefetch task join error: {}", e);
                }
            }
        }

        results
    }
}

/// Stories fetched fresh across a prefetch run.
pub fn fresh_count(results: &[(u32, Lookup<Vec<Story>>)]) -> usize {
    results
        .iter()
        .filter_map(|(_, lookup)| match lookup {
            Lookup::Network(stories) => Some(stories.len()),
            _ => None,
        })
        .sum()
}
