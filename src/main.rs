// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jawala_directory::{
    cache::{CacheController, CacheStore, SqliteCacheStore},
    contact, selection, view, AtomicLoadingFlag, Catalog, CatalogStore, CategoryIndex,
    DirectoryConfig, FilterOutcome, FilterState, HttpFetcher,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jawala", version, about = "Jawala business directory: browse, search, offline cache")]
struct Cli {
    /// JSON config file (defaults apply for missing fields)
    #[arg(long, global = true, env = "JAWALA_CONFIG")]
    config: Option<PathBuf>,

    /// Read the catalog from a local file instead of fetching it
    #[arg(long, global = true)]
    catalog_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal browser (default)
    Browse {
        /// Pre-select a category, as a shared `?cat=` link would
        #[arg(long)]
        cat: Option<String>,
    },
    /// Print the filtered directory
    Search {
        #[arg(long)]
        cat: Option<String>,
        #[arg(default_value = "")]
        query: String,
    },
    /// List categories in grid order
    Categories,
    /// Report data-integrity issues in the catalog
    Check,
    /// Offline cache operations
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Install the manifest into the configured cache version
    Install,
    /// Answer one request through the cache controller
    Fetch { path: String },
    /// Show stores and their entries
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let browsing = matches!(cli.command, None | Some(Command::Browse { .. }));
    init_tracing(browsing);

    let config = match &cli.config {
        Some(path) => DirectoryConfig::from_file(path)?,
        None => DirectoryConfig::default(),
    }
    .apply_env();

    match cli.command.unwrap_or(Command::Browse { cat: None }) {
        Command::Browse { cat } => {
            let catalog = load_catalog(&config, cli.catalog_file.as_ref()).await?;
            run_ui_mode(catalog, cat, &config)
        }
        Command::Search { cat, query } => {
            let catalog = load_catalog(&config, cli.catalog_file.as_ref()).await?;
            print_search(&catalog, cat, &query);
            Ok(())
        }
        Command::Categories => {
            let catalog = load_catalog(&config, cli.catalog_file.as_ref()).await?;
            for entry in CategoryIndex::build(&catalog.categories).entries() {
                let id = entry.category_id().unwrap_or("-");
                println!("{:<20} {}", id, entry.label());
            }
            Ok(())
        }
        Command::Check => {
            let catalog = load_catalog(&config, cli.catalog_file.as_ref()).await?;
            let issues = catalog.integrity_report();
            if issues.is_empty() {
                println!("✓ {} businesses, no issues", catalog.businesses.len());
            }
            for issue in &issues {
                println!("⚠️  {}", issue);
            }
            Ok(())
        }
        Command::Cache { action } => run_cache(&config, action).await,
    }
}

fn init_tracing(browsing: bool) {
    // Keep the alternate screen clean unless logging was asked for
    if browsing && std::env::var("RUST_LOG").is_err() {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

async fn load_catalog(config: &DirectoryConfig, file: Option<&PathBuf>) -> Result<Catalog> {
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;
        return Catalog::from_json(&text).map_err(|e| anyhow::anyhow!(e.user_message()));
    }

    let flag = AtomicLoadingFlag::new();
    CatalogStore::new(HttpFetcher::new(&config.base_url), &config.catalog_path)
        .load(&flag)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
}

fn print_search(catalog: &Catalog, cat: Option<String>, query: &str) {
    // Unknown ids fall back to all categories, same as a stale shared link
    let selected = cat
        .as_deref()
        .and_then(|id| selection::decode(&selection::encode(Some(id)), catalog))
        .map(|c| c.id.as_str());
    let state = FilterState::new(selected, query);

    match view(catalog, &state) {
        FilterOutcome::NoResults { message } => println!("{}", message),
        FilterOutcome::Flat { businesses } => {
            for b in businesses {
                println!(
                    "  {:<30} {:<25} {}",
                    b.shop_name,
                    b.owner_name,
                    contact::format_phone_number(&b.contact_number)
                );
            }
        }
        FilterOutcome::Grouped { groups } => {
            for group in groups {
                println!("\n{}", group.header());
                for b in group.businesses {
                    println!(
                        "  {:<30} {:<25} {}",
                        b.shop_name,
                        b.owner_name,
                        contact::format_phone_number(&b.contact_number)
                    );
                }
            }
        }
    }
}

async fn run_cache(config: &DirectoryConfig, action: CacheAction) -> Result<()> {
    let store: Arc<dyn CacheStore> = Arc::new(
        SqliteCacheStore::open(&config.cache_db)
            .with_context(|| format!("Failed to open cache db: {:?}", config.cache_db))?,
    );
    let fetcher = Arc::new(HttpFetcher::new(&config.base_url));

    match action {
        CacheAction::Install => {
            let mut controller = CacheController::from_config(config, fetcher, store);
            controller.install().await?;
            let evicted = controller.activate()?;

            println!("✓ Installed {} ({} assets)", config.cache_name, config.manifest.len());
            for name in evicted {
                println!("  evicted {}", name);
            }
        }
        CacheAction::Fetch { path } => {
            // Installed by an earlier run? The store survives restarts.
            let mut controller = CacheController::from_config(config, fetcher, store).resume()?;
            controller.activate()?;
            let served = controller.handle_fetch(&path).await?;
            println!(
                "{:?} {} {} bytes",
                served.source,
                served.response.status,
                served.response.body.len()
            );
        }
        CacheAction::List => {
            for name in store.cache_names()? {
                let marker = if name == config.cache_name { "*" } else { " " };
                println!("{} {}", marker, name);
                for path in store.keys(&name)? {
                    println!("    {}", path);
                }
            }
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(catalog: Catalog, cat: Option<String>, config: &DirectoryConfig) -> Result<()> {
    let start_url = format!("/{}", selection::encode(cat.as_deref()));
    let mut app = ui::App::new(catalog, &start_url, &config.site_url);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_catalog: Catalog, _cat: Option<String>, _config: &DirectoryConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: jawala search [QUERY]");
    std::process::exit(1);
}
