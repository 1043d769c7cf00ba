use std::path::Path;
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::app::{AppContext, Result, StoryError};
use crate::bookmarks::FeedEntry;
use crate::cache::prefetch::{fresh_count, Prefetcher};
use crate::cache::Lookup;
use crate::domain::validation::{image_content_type, is_valid_image, validate_coordinates, MAX_PHOTO_BYTES};
use crate::domain::{NewStory, Source, Story};
use crate::session::SessionProvider;
use crate::store::{Collection, Store};

pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    let session = ctx.login(email, password).await?;
    println!("Signed in as {}", session.name);
    Ok(())
}

pub async fn register(ctx: &AppContext, name: &str, email: &str, password: &str) -> Result<()> {
    let message = ctx.register(name, email, password).await?;
    println!("{}", if message.is_empty() { "Account created" } else { message.as_str() });
    println!("Sign in with: storyline login -e {} -p <password>", email);
    Ok(())
}

pub async fn guest(ctx: &AppContext) -> Result<()> {
    let session = ctx.register_guest().await?;
    println!("Signed in as guest {}", session.name);
    Ok(())
}

pub fn logout(ctx: &AppContext) -> Result<()> {
    ctx.logout()?;
    println!("Signed out. Cached stories and bookmarks were removed.");
    Ok(())
}

pub fn whoami(ctx: &AppContext) -> Result<()> {
    match ctx.session.current() {
        Some(session) => println!("{} ({})", session.name, session.user_id),
        None => println!("Not signed in"),
    }
    Ok(())
}

pub async fn list_stories(
    ctx: &AppContext,
    page: u32,
    size: Option<u32>,
    with_location: bool,
) -> Result<()> {
    let token = ctx.token()?;
    let query = ctx.list_query(page, size, with_location);

    let stories = match ctx.stories.list_stories(&token, &query).await {
        Lookup::Network(stories) => stories,
        Lookup::Cached {
            data,
            source,
            error,
        } => {
            print_fallback_notice(source, &error);
            data
        }
        Lookup::Unavailable { error, .. } => return Err(error),
    };

    if stories.is_empty() {
        println!("No stories");
        return Ok(());
    }

    for entry in ctx.bookmarks.decorate(stories)? {
        println!("{}", format_entry(&entry));
    }

    Ok(())
}

pub async fn show_story(ctx: &AppContext, id: &str, open_photo: bool) -> Result<()> {
    let token = ctx.token()?;

    let story = match ctx.stories.get_story_detail(&token, id).await {
        Lookup::Network(story) => story,
        Lookup::Cached {
            data,
            source,
            error,
        } => {
            print_fallback_notice(source, &error);
            data
        }
        Lookup::Unavailable { error, .. } => return Err(error),
    };

    let bookmarked = ctx.bookmarks.is_bookmarked(&story.id)?;
    println!("{}{}", story.display_name(), if bookmarked { "  ★" } else { "" });
    println!("{}", story.created_at.format("%Y-%m-%d %H:%M UTC"));
    if let Some((lat, lon)) = story.location() {
        println!("Location: {:.4}, {:.4}", lat, lon);
    }
    println!("Photo: {}", story.photo_url);
    println!();
    println!("{}", story.description);

    if open_photo {
        open::that(&story.photo_url)?;
    }

    Ok(())
}

pub async fn post_story(
    ctx: &AppContext,
    description: &str,
    photo: &Path,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<()> {
    let token = ctx.token()?;

    if description.trim().is_empty() {
        return Err(StoryError::InvalidInput("description is empty".into()));
    }
    let coordinates = validate_coordinates(lat, lon)?;

    let photo_name = photo
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| StoryError::InvalidInput(format!("not a file: {}", photo.display())))?;
    let content_type = image_content_type(&photo_name).ok_or_else(|| {
        StoryError::InvalidInput(format!("unsupported image type: {}", photo_name))
    })?;
    let bytes = std::fs::read(photo)?;
    if !is_valid_image(content_type, bytes.len()) {
        return Err(StoryError::InvalidInput(format!(
            "photo must be at most {} bytes (got {})",
            MAX_PHOTO_BYTES,
            bytes.len()
        )));
    }

    let draft = NewStory {
        description: description.to_string(),
        photo: bytes,
        photo_name,
        photo_content_type: content_type.to_string(),
        lat: coordinates.map(|(lat, _)| lat),
        lon: coordinates.map(|(_, lon)| lon),
    };

    match ctx.api.add_story(&token, draft).await? {
        ApiResponse::Ok(message) => {
            println!("{}", if message.is_empty() { "Story posted" } else { message.as_str() });
            Ok(())
        }
        ApiResponse::Rejected { message, .. } => Err(StoryError::Server(message)),
    }
}

/// Bookmark a story, looking it up through the cache when signed in and
/// in the local story collection otherwise.
pub async fn bookmark_add(ctx: &AppContext, id: &str) -> Result<()> {
    let story = match ctx.session.token() {
        Some(token) => ctx.stories.get_story_detail(&token, id).await.into_data(),
        None => ctx.store.get(Collection::Stories, id)?,
    }
    .ok_or_else(|| StoryError::NotFound(id.to_string()))?;

    ctx.bookmarks.put_bookmark(&story)?;
    println!("Bookmarked: {}", story.summary(60));
    Ok(())
}

pub fn bookmark_remove(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.bookmarks.delete_bookmark(id)?;
    println!("Removed bookmark {}", id);
    Ok(())
}

pub fn bookmark_list(ctx: &AppContext) -> Result<()> {
    let mut stories = ctx.bookmarks.get_all_bookmarks()?;

    if stories.is_empty() {
        println!("No bookmarks");
        return Ok(());
    }

    stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    for story in stories {
        println!("{}", format_story(&story, true));
    }

    Ok(())
}

pub async fn prefetch(ctx: &AppContext, pages: Option<u32>, workers: usize) -> Result<()> {
    let token = ctx.token()?;
    let pages = pages.unwrap_or(ctx.config.feed.prefetch_pages);
    let template = ctx.list_query(1, None, false);

    println!("Prefetching {} pages...", pages);

    let prefetcher = Prefetcher::with_workers(Arc::clone(&ctx.stories), workers);
    let results = prefetcher.prefetch(&token, pages, template).await;

    let mut failed = 0;
    for (page, lookup) in &results {
        if lookup.source() != Source::Network {
            failed += 1;
            eprintln!("  page {}: not refreshed ({})", page, lookup.source());
        }
    }

    println!(
        "Prefetch complete: {} stories refreshed, {} pages failed, {} stories cached",
        fresh_count(&results),
        failed,
        ctx.store.count(Collection::Stories)?
    );
    Ok(())
}

fn print_fallback_notice(source: Source, error: &str) {
    eprintln!("Showing cached stories ({}): {}", source, error);
}

fn format_story(story: &Story, bookmarked: bool) -> String {
    format!(
        "{} {} {:<16} {}  [{}]",
        if bookmarked { "★" } else { " " },
        story.created_at.format("%Y-%m-%d"),
        story.display_name(),
        story.summary(50),
        story.id
    )
}

fn format_entry(entry: &FeedEntry) -> String {
    format_story(&entry.story, entry.bookmarked)
}
