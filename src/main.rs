//! BiblioTech Server - Library Management System
//!
//! REST API server for small library catalogs, loans and fines.

use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bibliotech_server::{
    api,
    cli::{Cli, Command},
    config::AppConfig,
    repository::Repository,
    services::{
        backup::{BackupScheduler, BackupService},
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("bibliotech_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let connect_options = SqliteConnectOptions::from_str(&config.database.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Snapshot the database actually in use
    config.resolve_backup_source(&connect_options.clone().get_filename());

    match cli.command() {
        Command::Serve => serve(config, connect_options).await,
        Command::Backups => list_backups(&config).await,
        Command::Restore { file } => restore(&config, &file).await,
    }
}

async fn serve(config: AppConfig, connect_options: SqliteConnectOptions) -> anyhow::Result<()> {
    tracing::info!("Starting BiblioTech Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool, creating the file on first run
    if let Some(parent) = Path::new(&*connect_options.clone().get_filename()).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // Create repository and services
    let repository = Repository::new(pool.clone());
    let services = Services::new(repository, &config);

    // Start automatic backups
    let scheduler = BackupScheduler::new(services.backup.clone(), config.backup.schedule);
    if config.backup.enabled {
        match services.backup.backup_info().await {
            Ok(info) => tracing::info!(
                "Existing backups: {} ({:.2} MB), latest: {}",
                info.count,
                info.total_size_bytes as f64 / (1024.0 * 1024.0),
                info.latest.as_deref().unwrap_or("none")
            ),
            Err(e) => tracing::warn!("Could not read backup directory: {}", e),
        }
        if let Err(e) = scheduler.start().await {
            tracing::error!("Backup scheduler not started: {}", e);
        }
    } else {
        tracing::info!("Automatic backups disabled");
    }

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Print the snapshots in the backup directory
async fn list_backups(config: &AppConfig) -> anyhow::Result<()> {
    let service = BackupService::new(config.backup.clone());
    let backups = service.list_backups().await?;

    if backups.is_empty() {
        tracing::info!("No backups in {}", config.backup.directory.display());
        return Ok(());
    }

    tracing::info!("{} backups in {}", backups.len(), config.backup.directory.display());
    for backup in backups {
        tracing::info!(
            "  {} ({:.2} KB, {})",
            backup.name,
            backup.size_bytes as f64 / 1024.0,
            backup.created_at.format("%d/%m/%Y %H:%M:%S")
        );
    }
    Ok(())
}

/// Restore a snapshot while no server holds the database open
async fn restore(config: &AppConfig, file: &str) -> anyhow::Result<()> {
    let service = BackupService::new(config.backup.clone());
    let outcome = service.restore_backup(file).await?;

    if let Some(safety_copy) = outcome.safety_copy {
        tracing::info!("Previous database saved as {}", safety_copy.display());
    }
    tracing::info!("Database restored from {}", outcome.restored_from.display());
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
