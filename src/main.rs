use anyhow::{Context, Result};
use clap::Parser;
use recipe_api::{
    AppState, RecipeRepository, build_router,
    config::{AppConfig, DatabaseBackend},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "recipe_api")]
#[command(about = "Recipe CRUD service")]
struct Cli {
    /// Address to bind (overrides APP_HOST)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides APP_PORT)
    #[arg(long)]
    port: Option<u16>,
    /// `memory` or `postgres` (overrides DATABASE_BACKEND)
    #[arg(long)]
    backend: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    max_connections: Option<usize>,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) -> Result<()> {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(backend) = self.backend {
            config.database_backend = backend.parse()?;
        }
        if let Some(url) = self.database_url {
            config.database_url = url;
        }
        if let Some(max) = self.max_connections {
            config.db_max_connections = max;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = AppConfig::from_env().context("failed to load application configuration")?;
    cli.apply(&mut config).context("invalid command line argument")?;

    let pool_config = config.pool_config();
    let recipes: Arc<dyn RecipeRepository> = match config.database_backend {
        DatabaseBackend::Postgres => {
            info!("database backend: postgres");
            let engine = recipe_api::postgres_engine(pool_config, config.database_url.clone())
                .await
                .context("failed to connect to PostgreSQL")?;
            Arc::new(engine)
        }
        DatabaseBackend::Memory => {
            info!("database backend: memory");
            let engine = recipe_api::memory_engine(pool_config)
                .await
                .context("failed to start in-memory store")?;
            Arc::new(engine)
        }
    };

    let app = build_router(AppState::new(recipes));

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "recipe api started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("recipe_api=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
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

    info!("shutdown signal received");
}
