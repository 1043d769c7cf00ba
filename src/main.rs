use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storyline::app::AppContext;
use storyline::cli::{commands, BookmarkAction, Cli, Commands};
use storyline::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::login(&ctx, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            commands::register(&ctx, &name, &email, &password).await?;
        }
        Commands::Guest => {
            commands::guest(&ctx).await?;
        }
        Commands::Logout => {
            commands::logout(&ctx)?;
        }
        Commands::Whoami => {
            commands::whoami(&ctx)?;
        }
        Commands::List {
            page,
            size,
            with_location,
        } => {
            commands::list_stories(&ctx, page, size, with_location).await?;
        }
        Commands::Show { id, open } => {
            commands::show_story(&ctx, &id, open).await?;
        }
        Commands::Post {
            description,
            photo,
            lat,
            lon,
        } => {
            commands::post_story(&ctx, &description, &photo, lat, lon).await?;
        }
        Commands::Bookmark { action } => match action {
            BookmarkAction::Add { id } => commands::bookmark_add(&ctx, &id).await?,
            BookmarkAction::Remove { id } => commands::bookmark_remove(&ctx, &id)?,
            BookmarkAction::List => commands::bookmark_list(&ctx)?,
        },
        Commands::Prefetch { pages, workers } => {
            commands::prefetch(&ctx, pages, workers).await?;
        }
    }

    Ok(())
}
