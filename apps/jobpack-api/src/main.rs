//! Job pack document API
//!
//! HTTP service over the document engine. Provides REST endpoints for:
//!
//! - Template listing
//! - Prefill, load, save and regenerate of document drafts
//! - Approval and issuance with the issuer completeness gate
//! - PDF, Word and text exports
//!
//! Drafts, jobs and business profiles live in SQLite. Narrative text comes
//! from an optional HTTP text generator.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::Router;
use clap::Parser;
use document_engine::{DocumentService, EngineConfig, NoopTextGenerator, TextGenerator};
use issuance_policy::PolicySet;
use render_engine::RenderOptions;
use template_engine::TemplateRegistry;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod generator;
mod state;
mod store;

use generator::HttpTextGenerator;
use state::AppState;
use store::SqliteStore;

/// Command-line arguments for the job pack API
#[derive(Parser, Debug)]
#[command(name = "jobpack-api")]
#[command(about = "Job pack document generation and issuance API")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3001", env = "PORT")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// SQLite database URL (defaults to the platform data directory)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Directory of template JSON files (embedded templates otherwise)
    #[arg(long)]
    templates_dir: Option<PathBuf>,

    /// Issuer policy JSON file (built-in policy otherwise)
    #[arg(long)]
    policy_file: Option<PathBuf>,

    /// Render timeout in milliseconds
    #[arg(long, default_value = "10000")]
    render_timeout_ms: u64,

    /// Text generation endpoint; narrative fields stay empty without one
    #[arg(long, env = "GENERATOR_URL")]
    generator_url: Option<String>,

    /// Text generation timeout in milliseconds
    #[arg(long, default_value = "30000")]
    generation_timeout_ms: u64,

    /// JSON file of jobs and business profiles to load at startup
    #[arg(long)]
    seed_file: Option<PathBuf>,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "jobpack_api={level},document_engine={level},render_engine={level},tower_http=debug"
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Initializing job pack API...");

    let templates = match &args.templates_dir {
        Some(dir) => TemplateRegistry::from_dir(dir.clone())?,
        None => TemplateRegistry::embedded()?,
    };
    info!("Loaded {} templates", templates.len());

    let policy = match &args.policy_file {
        Some(path) => PolicySet::from_file(path)?,
        None => PolicySet::default(),
    };

    let database_url = args
        .database_url
        .clone()
        .unwrap_or_else(store::default_database_url);
    let store = Arc::new(SqliteStore::connect(&database_url).await?);
    if let Some(seed) = &args.seed_file {
        store.seed_from_file(seed).await?;
    }

    let generation_timeout = Duration::from_millis(args.generation_timeout_ms);
    let generator: Arc<dyn TextGenerator> = match &args.generator_url {
        Some(url) => {
            info!("Text generation via {}", url);
            Arc::new(HttpTextGenerator::new(url.clone(), generation_timeout))
        }
        None => Arc::new(NoopTextGenerator),
    };

    let service = DocumentService::new(
        Arc::new(templates),
        Arc::new(policy),
        store.clone(),
        store,
        generator,
    )
    .with_config(EngineConfig {
        generation_timeout,
        ..Default::default()
    });

    let state = AppState::new(
        service,
        RenderOptions {
            timeout_ms: args.render_timeout_ms,
        },
    );

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limit: {}", args.rate_limit))?,
    );

    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app: Router = api::routes()
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Render timeout: {}ms", args.render_timeout_ms);

    // The rate limiter keys on the peer address
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
