//! git-desk - a live local git client served over HTTP
//!
//! # Usage
//! ```bash
//! git-desk /path/to/repository          # Start with a repository open
//! git-desk                              # Start empty; open one via the API
//! git-desk . --port 4000 --debounce-ms 250
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_desk::config::{self, SessionConfig};
use git_desk::routes;
use git_desk::session::Workspace;

/// git-desk - Inspect and change a git repository from the browser
#[derive(Parser)]
#[command(name = "git-desk")]
#[command(about = "A live local git client", long_about = None)]
struct Cli {
    /// Path inside the git repository to open at startup
    #[arg(value_name = "REPO_PATH")]
    repo_path: Option<String>,

    /// Port to run the server on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Quiet period after working-tree changes before refreshing
    #[arg(long, default_value_t = config::DEFAULT_DEBOUNCE.as_millis() as u64)]
    debounce_ms: u64,

    /// Number of commits kept in the history list
    #[arg(long, default_value_t = config::DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,

    /// Time limit for local git invocations
    #[arg(long, default_value_t = config::DEFAULT_LOCAL_TIMEOUT.as_secs())]
    local_timeout_secs: u64,

    /// Time limit for fetch, pull, push and clone
    #[arg(long, default_value_t = config::DEFAULT_NETWORK_TIMEOUT.as_secs())]
    network_timeout_secs: u64,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            history_limit: self.history_limit,
            local_timeout: Duration::from_secs(self.local_timeout_secs),
            network_timeout: Duration::from_secs(self.network_timeout_secs),
            ..SessionConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (quieter for production)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let workspace = Arc::new(Workspace::new(cli.session_config()));

    let opened = match &cli.repo_path {
        Some(path) => match workspace.open(path).await {
            Ok(session) => Some(session.root().display().to_string()),
            Err(e) => {
                eprintln!("✗ Failed to open repository: {}", e);
                eprintln!("  Path: {}", path);
                std::process::exit(1);
            }
        },
        None => None,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(workspace.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to port {}: {}", cli.port, e);
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    println!();
    println!("  git-desk");
    println!();
    println!(
        "  Repository: {}",
        opened.as_deref().unwrap_or("(none, POST /api/v1/repository/open)")
    );
    println!("  Server:     http://{}", addr);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown_workspace = workspace.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        println!("\n  Shutting down...");
        shutdown_workspace.close().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
