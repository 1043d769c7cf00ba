use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a read result came from. Never persisted; attached to one read only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Fresh data from the remote API.
    Network,
    /// The API answered with an error or an unusable body; served from the cache.
    IndexeddbFallback,
    /// The API call failed outright; served from the cache.
    Indexeddb,
    /// The API failed and the cache had nothing to offer.
    NoDataAvailable,
    /// The API failed and the cache read failed too.
    FetchAndIndexeddbFailed,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::IndexeddbFallback => "indexeddb_fallback",
            Source::Indexeddb => "indexeddb",
            Source::NoDataAvailable => "no_data_available",
            Source::FetchAndIndexeddbFailed => "fetch_and_indexeddb_failed",
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Source::IndexeddbFallback | Source::Indexeddb)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tags_match_as_str() {
        for source in [
            Source::Network,
            Source::IndexeddbFallback,
            Source::Indexeddb,
            Source::NoDataAvailable,
            Source::FetchAndIndexeddbFailed,
        ] {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.as_str()));
        }
    }

    #[test]
    fn test_is_cached() {
        assert!(Source::Indexeddb.is_cached());
        assert!(Source::IndexeddbFallback.is_cached());
        assert!(!Source::Network.is_cached());
        assert!(!Source::NoDataAvailable.is_cached());
    }
}
