use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::app::{self, AppState};
use crate::config::AppConfig;
use crate::database::{MemoryDatabase, PgDatabase};

#[derive(Parser)]
#[command(name = "buyncon-api")]
#[command(about = "Multi-user item and post API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Keep all data in process memory instead of Postgres")]
        in_memory: bool,
    },

    #[command(about = "Create tables and indexes, then exit")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    info!("Starting buyncon-api in {:?} mode", config.environment);

    match cli.command {
        Commands::Serve { in_memory } => serve(config, in_memory).await,
        Commands::Migrate => {
            let db = PgDatabase::connect(&config.database).await?;
            db.apply_schema().await?;
            db.close().await;
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, in_memory: bool) -> anyhow::Result<()> {
    let (state, pg) = if in_memory {
        info!("Using in-memory storage");
        (AppState::in_memory(Arc::new(MemoryDatabase::new()), &config)?, None)
    } else {
        let db = PgDatabase::connect(&config.database).await?;
        db.apply_schema().await?;
        (AppState::postgres(db.clone(), &config)?, Some(db))
    };

    let router = app::router(state, &config);
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(db) = pg {
        db.close().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
