pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cache::prefetch::{DEFAULT_WORKERS, MAX_PREFETCH_PAGES};

#[derive(Parser)]
#[command(name = "storyline")]
#[command(about = "An offline-first story feed client", long_about = None)]
pub struct Cli {
    /// Use this config file instead of ~/.config/storyline/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        /// At least 8 characters
        #[arg(short, long)]
        password: String,
    },
    /// Create a throwaway guest account and sign in with it
    Guest,
    /// Sign out and wipe cached stories and bookmarks
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List a page of stories (served from the cache when offline)
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Stories per page (default from config)
        #[arg(short, long)]
        size: Option<u32>,
        /// Only stories with coordinates
        #[arg(long)]
        with_location: bool,
    },
    /// Show one story
    Show {
        id: String,
        /// Open the photo in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Publish a new story
    Post {
        #[arg(short, long)]
        description: String,
        /// JPEG, PNG or GIF, at most 1 MiB
        #[arg(long)]
        photo: PathBuf,
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },
    /// Manage bookmarked stories (works offline)
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },
    /// Fetch several pages ahead of going offline
    Prefetch {
        /// Number of pages (default from config)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=MAX_PREFETCH_PAGES as i64))]
        pages: Option<u32>,
        /// Concurrent requests
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },
}

#[derive(Subcommand)]
pub enum BookmarkAction {
    /// Bookmark a story by id
    Add { id: String },
    /// Remove a bookmark
    Remove { id: String },
    /// List bookmarked stories
    List,
}
