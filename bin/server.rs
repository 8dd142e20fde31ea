// Jawala Business Directory - Web Server
// Serves the static site (shell, assets, catalog document) plus a small JSON API

use anyhow::{Context, Result};
use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use jawala_directory::{
    selection, view, Catalog, CategoryEntry, CategoryIndex, DirectoryConfig, FilterState,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jawala-server", version, about = "Serve the Jawala directory site and API")]
struct Args {
    /// Directory holding index.html, assets/ and data/
    #[arg(long, env = "JAWALA_SITE_DIR", default_value = "site")]
    site_dir: PathBuf,

    #[arg(long, env = "JAWALA_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,

    /// JSON config file
    #[arg(long, env = "JAWALA_CONFIG")]
    config: Option<PathBuf>,
}

/// Shared application state: the catalog snapshot, read-only for the process
#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
    index: Arc<CategoryIndex>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

#[derive(Serialize)]
struct CategoryResponse {
    /// `null` for the All entry
    id: Option<String>,
    name: String,
    icon: String,
}

impl From<&CategoryEntry> for CategoryResponse {
    fn from(entry: &CategoryEntry) -> Self {
        Self {
            id: entry.category_id().map(|s| s.to_string()),
            name: entry.label().to_string(),
            icon: entry.icon().to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/categories - Category grid, All first
async fn get_categories(State(state): State<AppState>) -> impl IntoResponse {
    let response: Vec<CategoryResponse> = state.index.entries().iter().map(Into::into).collect();
    (StatusCode::OK, Json(ApiResponse::ok(response)))
}

/// GET /api/businesses?cat=<id>&q=<term> - Filtered view
/// Unknown `cat` values fall back to all categories
async fn get_businesses(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(params): Query<SearchParams>,
) -> Response {
    let raw = raw.unwrap_or_default();
    let selected = selection::decode(&raw, &state.catalog).map(|c| c.id.as_str());
    let filter_state = FilterState::new(selected, &params.q);

    let outcome = view(&state.catalog, &filter_state);
    (StatusCode::OK, Json(ApiResponse::ok(outcome))).into_response()
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DirectoryConfig::from_file(path)?,
        None => DirectoryConfig::default(),
    }
    .apply_env();

    // The catalog document is served as a static asset too; the API reads the same file
    let catalog_file = args
        .site_dir
        .join(config.catalog_path.trim_start_matches('/'));
    let text = std::fs::read_to_string(&catalog_file)
        .with_context(|| format!("Failed to read catalog: {:?}", catalog_file))?;
    let catalog = Catalog::from_json(&text).map_err(|e| anyhow::anyhow!(e.user_message()))?;

    for issue in catalog.integrity_report() {
        tracing::warn!(%issue, "catalog integrity");
    }
    tracing::info!(
        categories = catalog.categories.len(),
        businesses = catalog.businesses.len(),
        "catalog ready"
    );

    let state = AppState {
        index: Arc::new(CategoryIndex::build(&catalog.categories)),
        catalog: Arc::new(catalog),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(get_categories))
        .route("/businesses", get(get_businesses))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new(&args.site_dir))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    tracing::info!(addr = %args.addr, site = ?args.site_dir, "server running");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
