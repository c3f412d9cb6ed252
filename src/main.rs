use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use headlines::config::Config;
use headlines::connectivity::{ConnectivityProvider, StaticConnectivity, SysfsConnectivity};
use headlines::feed::paging::{self, ScrollWindow};
use headlines::feed::{FeedKind, FeedState, NewsViewModel, PageRequest};
use headlines::news::{Article, NewsApiClient};
use headlines::resource::Resource;
use headlines::storage::{Database, DatabaseError};
use headlines::util::{single_line, truncate_to_width};

/// Titles are cut to this many terminal columns
const TITLE_WIDTH: usize = 96;

/// Get the config directory path (~/.config/headlines/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("headlines"))
}

#[derive(Parser, Debug)]
#[command(name = "headlines", about = "Terminal news reader with offline saved articles")]
struct Args {
    /// Config file (default: ~/.config/headlines/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Saved articles database (default: ~/.config/headlines/saved.db)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show breaking news for a country
    Top {
        /// Two-letter country code (default from config)
        #[arg(long)]
        country: Option<String>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Save every loaded article for offline reading
        #[arg(long)]
        save: bool,
    },
    /// Search all articles
    Search {
        query: String,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Save every loaded article for offline reading
        #[arg(long)]
        save: bool,
    },
    /// List saved articles
    Saved,
    /// Delete a saved article by url
    Delete { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
            {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to set config directory permissions to 0700"
                );
            }
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(config = ?config, "Effective configuration");

    let db_path = args.db.clone().unwrap_or_else(|| config_dir.join("saved.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: {}", DatabaseError::InstanceLocked);
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    match args.command {
        Command::Saved => list_saved(&db).await,
        Command::Delete { url } => {
            if db.delete_saved_article(&url).await? {
                println!("Deleted {}", url);
            } else {
                println!("Not saved: {}", url);
            }
            Ok(())
        }
        Command::Top {
            country,
            pages,
            save,
        } => {
            let country = country.unwrap_or_else(|| config.country.clone());
            run_feed(&config, db, FeedKind::BreakingNews, &country, pages, save).await
        }
        Command::Search { query, pages, save } => {
            run_feed(&config, db, FeedKind::Search, &query, pages, save).await
        }
    }
}

async fn list_saved(db: &Database) -> Result<()> {
    let saved = db
        .get_saved_articles()
        .await
        .context("Failed to load saved articles")?;
    if saved.is_empty() {
        println!("No saved articles.");
        return Ok(());
    }
    for (i, article) in saved.iter().enumerate() {
        print_article(i + 1, article);
    }
    Ok(())
}

async fn run_feed(
    config: &Config,
    db: Database,
    feed: FeedKind,
    parameter: &str,
    pages: u32,
    save: bool,
) -> Result<()> {
    let api_key = config.resolve_api_key().ok_or_else(|| {
        anyhow::anyhow!("No news API key: set NEWS_API_KEY or news_api_key in the config file")
    })?;
    let client = NewsApiClient::new(
        &config.api_base_url,
        SecretString::from(api_key),
        config.request_timeout(),
    )
    .context("Invalid api_base_url")?;

    let connectivity: Box<dyn ConnectivityProvider> = if config.assume_online {
        Box::new(StaticConnectivity::online())
    } else {
        Box::new(SysfsConnectivity::default())
    };

    let vm = NewsViewModel::new(client, db.clone(), connectivity);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling requests");
                cancel.cancel();
            }
        });
    }

    let mut rx = vm.subscribe(feed);
    let renderer = tokio::spawn(async move {
        let mut shown = 0;
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            render_state(&state, &mut shown);
        }
    });

    for _ in 0..pages.max(1) {
        // Pages are requested one at a time, so nothing else can hold the feed
        if vm.request_page(feed, parameter, &cancel).await != PageRequest::Completed {
            break;
        }

        let next_page = vm.cursor(feed).await.page;
        let keep_going = match vm.state(feed) {
            Resource::Success { data, .. } => paging::should_paginate(
                &ScrollWindow::showing_all(data.articles.len()),
                false,
                paging::is_last_page(next_page, data.total_results),
            ),
            Resource::Error { .. } | Resource::Loading => false,
        };
        if !keep_going {
            break;
        }
    }

    if save && !cancel.is_cancelled() {
        let state = vm.state(feed);
        if let Some(response) = state.data() {
            let mut added = 0;
            for article in &response.articles {
                if !db.is_saved(&article.url).await? {
                    added += 1;
                }
                vm.save_article(article).await;
            }
            let total = vm.saved_articles().borrow().len();
            println!("Saved {} new articles ({} total)", added, total);
        }
    }

    drop(vm);
    renderer.await.context("Renderer task failed")?;
    Ok(())
}

/// Print a feed state. `shown` tracks how many articles are already on
/// screen so each page prints only its new rows.
fn render_state(state: &FeedState, shown: &mut usize) {
    match state {
        Resource::Loading => eprintln!("Loading…"),
        Resource::Success { data, message } => {
            if data.articles.len() < *shown {
                *shown = 0;
            }
            for (i, article) in data.articles.iter().enumerate().skip(*shown) {
                print_article(i + 1, article);
            }
            *shown = data.articles.len();
            if let Some(message) = message {
                println!("{}", message);
            }
        }
        Resource::Error { message, .. } => eprintln!("An error occured: {}", message),
    }
}

fn print_article(index: usize, article: &Article) {
    let title = single_line(&article.title);
    let source = article
        .source_name()
        .map(|s| single_line(s).into_owned())
        .unwrap_or_default();
    let published = article
        .published()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    println!("{:>4}. {}", index, truncate_to_width(&title, TITLE_WIDTH));
    println!("      {} {}", source, published);
    println!("      {}", single_line(&article.url));
}
