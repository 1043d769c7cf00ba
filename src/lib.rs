//! # storyline
//!
//! An offline-first client for a story-sharing service.
//!
//! ## Architecture
//!
//! ```text
//! StoryApi ─┐
//!           ├─> StoryCache ─> UI
//! Store ────┤
//!           └─> BookmarkService ─> UI
//! ```
//!
//! Reads go to the network first. Successful results are written to the
//! local database before they are returned; failures fall back to whatever
//! the database holds, and every result says where it came from.
//! Bookmarks live in their own collection and never touch the network.
//!
//! ## Quick Start
//!
//! ```bash
//! storyline register -n Me -e me@example.com -p secret123
//! storyline login -e me@example.com -p secret123
//! storyline list --page 1
//! storyline bookmark add story-FvU4u0Vp2S3PMsFg
//! storyline bookmark list
//! ```

/// Application context and error types.
///
/// [`AppContext`](app::AppContext) opens the store, builds the HTTP client
/// and hands both to the services.
pub mod app;

/// Remote story service.
///
/// - [`StoryApi`](api::StoryApi): async trait the cache reads through
/// - [`HttpStoryApi`](api::HttpStoryApi): reqwest-based implementation
pub mod api;

/// Bookmarks kept locally, independent of network and session state.
pub mod bookmarks;

/// Network-first story reads with local fallback and provenance tags.
pub mod cache;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/storyline/config.toml`.
pub mod config;

/// Core domain models: [`Story`](domain::Story), [`Source`](domain::Source).
pub mod domain;

/// Signed-in identity persisted between runs.
pub mod session;

/// Versioned SQLite store with `stories` and `bookmarks` collections.
///
/// - [`Store`](store::Store): trait defining collection operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
