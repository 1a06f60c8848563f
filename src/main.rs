use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use movie_rater::auth::{PasswordHasher, TokenService};
use movie_rater::config;
use movie_rater::database::{MemoryStore, PgStore, Store};
use movie_rater::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "movie-rater", version, about = "Movie rating JSON API")]
struct Args {
    /// Listen port (overrides MOVIE_RATER_PORT / PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Keep everything in process memory instead of PostgreSQL
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and the token secrets
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("movie_rater=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting movie-rater in {:?} mode", config.environment);

    let tokens = TokenService::from_config(&config.security).context("invalid token configuration")?;
    let hasher = PasswordHasher::new(config.security.bcrypt_cost).context("invalid BCRYPT_COST")?;

    let store: Arc<dyn Store> = if args.memory {
        tracing::warn!("Using the in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let pg = PgStore::connect(&config.database)
            .await
            .context("failed to connect to PostgreSQL")?;
        if config.database.run_migrations {
            pg.migrate().await.context("failed to run migrations")?;
        }
        Arc::new(pg)
    };

    let app = movie_rater::app_with_config(AppState::new(store, tokens, hasher), config);

    let port = args.port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("movie-rater listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
