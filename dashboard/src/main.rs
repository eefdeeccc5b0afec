use axum::{ServiceExt, extract::Request};
use clap::{Parser, Subcommand};
use dashboard::config::{Config, redact_db_url};
use dashboard::provider::{MigrationProvider, MigrationResult, migrator::SeaOrmProvider};
use dashboard::web::{AppState, dashboard_router, paths::Paths, render::Renderer};
use migration::Migrator;
use sea_orm::Database;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "dashboard", about = "Migration dashboard - browse and apply schema migrations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard server (default)
    Serve,
    /// Print every migration and whether it is applied
    Status,
    /// Apply all pending migrations
    Up,
    /// Roll back the most recently applied migration
    Down,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init structured logging (respects RUST_LOG; defaults to info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env();

    tracing::info!(database = %redact_db_url(&config.database_url), "connecting to database");
    let db = Database::connect(&config.database_url).await?;
    let provider: Arc<dyn MigrationProvider> = Arc::new(SeaOrmProvider::<Migrator>::new(db));

    match cli.command {
        None | Some(Commands::Serve) => serve(config, provider).await?,
        Some(Commands::Status) => print_status(provider.as_ref()).await?,
        Some(Commands::Up) => {
            let results = provider.up().await?;
            print_results(&results);
        }
        Some(Commands::Down) => {
            let result = provider.down().await?;
            print_results(std::slice::from_ref(&result));
        }
    }

    Ok(())
}

async fn serve(
    config: Config,
    provider: Arc<dyn MigrationProvider>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Templates are parsed once here and shared read-only afterwards.
    let renderer = Renderer::new(Paths::new(&config.base_path), config.title.clone())?;
    let state = AppState::new(provider, renderer);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        base_path = %state.renderer.paths().status(),
        "Dashboard online"
    );

    let app = dashboard_router(state);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
    Ok(())
}

async fn print_status(provider: &dyn MigrationProvider) -> Result<(), Box<dyn std::error::Error>> {
    let statuses = provider.status().await?;
    if statuses.is_empty() {
        println!("no migrations");
        return Ok(());
    }

    println!("{:<16} {:<8} {:<24} PATH", "VERSION", "STATE", "APPLIED AT");
    for status in statuses {
        let (version, path) = match &status.source {
            Some(s) => (s.version.to_string(), s.path.as_str()),
            None => ("n/a".to_string(), "n/a"),
        };
        let applied_at = status
            .applied_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<8} {:<24} {}",
            version,
            status.state.as_str(),
            applied_at,
            path
        );
    }
    Ok(())
}

fn print_results(results: &[MigrationResult]) {
    if results.is_empty() {
        println!("fully migrated");
        return;
    }
    for result in results {
        let path = result
            .source
            .as_ref()
            .map(|s| s.path.as_str())
            .unwrap_or("n/a");
        println!(
            "{:<4} {:<48} {:?}",
            result.direction.as_str(),
            path,
            result.duration
        );
    }
}
