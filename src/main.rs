//! YGO Client - command line access to the YGOPRODeck card database
//!
//! Prints API answers as JSON. Responses are cached on disk between runs.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use ygo_client::{
    CardInfoParams, ClientOptions, FallbackConfig, FileSystemCacheOptions, FileSystemStore,
    ImageCacheOption, RequestQueue, ThrottledQueue, YgoApi,
};

/// Yu-Gi-Oh! card database client
#[derive(Parser, Debug)]
#[command(name = "ygo_client")]
#[command(version, about, long_about = None)]
struct Args {
    /// Root directory for cached responses and images
    #[arg(long, env = "YGO_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Disable the response cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Minimum spacing between outgoing requests, in milliseconds
    #[arg(long, env = "YGO_QUEUE_INTERVAL_MS")]
    queue_interval_ms: Option<u64>,

    /// Fallback API hosts, tried in order after the primary one
    #[arg(long, env = "YGO_FALLBACK_URLS", value_delimiter = ',')]
    fallback: Vec<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, env = "YGO_TIMEOUT_MS", default_value_t = 5000)]
    timeout_ms: u64,

    /// Download artwork of returned cards while the command runs
    #[arg(long, env = "YGO_CACHE_IMAGES", default_value_t = false)]
    cache_images: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a single card by exact name or passcode
    Card {
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        name: Option<String>,
        #[arg(long)]
        id: Option<u64>,
    },
    /// Fuzzy search by card name
    Search {
        fname: String,
        #[arg(long)]
        num: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// List the cards of an archetype
    Archetype { name: String },
    /// Fetch a random card
    Random,
    /// List every card set
    Sets,
    /// List every archetype
    Archetypes,
    /// Show the database version
    DbVersion,
    /// Remove stale cache entries and images
    Cleanup,
}

fn build_client(args: &Args) -> (YgoApi, Option<ThrottledQueue>) {
    let cache_root = args.cache_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ygo_client")
    });
    log::debug!("Cache root: {}", cache_root.display());

    let queue = args
        .queue_interval_ms
        .map(|ms| ThrottledQueue::new(Duration::from_millis(ms)));

    let mut options = ClientOptions {
        fallback: FallbackConfig {
            urls: args.fallback.clone(),
            timeout: Duration::from_millis(args.timeout_ms),
        },
        queue: queue
            .clone()
            .map(|queue| Arc::new(queue) as Arc<RequestQueue>),
        image_cache: Some(ImageCacheOption::FileSystem(FileSystemCacheOptions {
            cache_dir: Some(cache_root.join("images")),
            max_age: None,
        })),
        image_cache_enabled: args.cache_images,
        ..Default::default()
    };
    if !args.no_cache {
        options.cache = Some(Arc::new(FileSystemStore::new(FileSystemCacheOptions {
            cache_dir: Some(cache_root.join("data")),
            max_age: None,
        })));
    }

    (YgoApi::new(options), queue)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize response")?;
    println!("{}", json);
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let (api, queue) = build_client(&args);

    match args.command {
        Command::Card { name, id } => {
            let card = match (name, id) {
                (Some(name), _) => api
                    .get_card_by_name(&name)
                    .await
                    .with_context(|| format!("Failed to look up '{}'", name))?,
                (None, Some(id)) => api
                    .get_card_by_id(id)
                    .await
                    .with_context(|| format!("Failed to look up card {}", id))?,
                (None, None) => bail!("Either --name or --id is required"),
            };
            match card {
                Some(card) => print_json(&card)?,
                None => bail!("No matching card found"),
            }
        }
        Command::Search { fname, num, offset } => {
            let params = CardInfoParams {
                num,
                offset,
                ..Default::default()
            };
            let response = api
                .search_cards(&fname, params)
                .await
                .with_context(|| format!("Search for '{}' failed", fname))?;
            log::info!("{} card(s) found", response.data.len());
            print_json(&response)?;
        }
        Command::Archetype { name } => {
            let response = api
                .get_cards_by_archetype(&name, CardInfoParams::default())
                .await
                .with_context(|| format!("Failed to list archetype '{}'", name))?;
            print_json(&response.data)?;
        }
        Command::Random => print_json(&api.get_random_card().await?)?,
        Command::Sets => print_json(&api.get_all_card_sets().await?)?,
        Command::Archetypes => print_json(&api.get_all_archetypes().await?)?,
        Command::DbVersion => print_json(&api.check_database_version().await?)?,
        Command::Cleanup => {
            let entries = api.cleanup_cache().await;
            let images = api.cleanup_image_cache().await;
            log::info!(
                "Removed {} cached response(s) and {} image(s)",
                entries,
                images
            );
        }
    }

    if let Some(queue) = queue {
        queue
            .done_processing(Some(Duration::from_millis(args.timeout_ms)))
            .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging. Set RUST_LOG to control the level, e.g. RUST_LOG=ygo_client=debug
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
