use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::{Parser, Subcommand};
use common::db;
use points::{store::PgLedgerStore, PointsEngine, SystemClock};
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    security::{configure_cors, RateLimiter},
};

mod auth;
mod config;
mod errors;
mod metrics;
mod routes;
mod security;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations and serve the HTTP API
    Serve,

    /// Apply pending migrations and exit
    Migrate,

    /// Insert missing points config keys and exit
    Seed,
}

pub struct AppState {
    pub pool: PgPool,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = db::establish_connection(&config.database_url, config.database_max_connections).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, pool).await?,
        Commands::Migrate => db::run_migrations(&pool).await?,
        Commands::Seed => {
            db::run_migrations(&pool).await?;
            db::seed_points_config(&pool).await?;
        }
    }

    Ok(())
}

async fn serve(config: Config, pool: PgPool) -> anyhow::Result<()> {
    db::run_migrations(&pool).await?;
    if config.enable_config_seed {
        db::seed_points_config(&pool).await?;
    }

    let engine = web::Data::new(PointsEngine::new(
        PgLedgerStore::new(pool.clone()),
        SystemClock,
        config.day_policy(),
    ));
    let app_state = web::Data::new(AppState { pool });
    let limiter = RateLimiter::new(config.rate_limit);
    let allowed_origins = config.allowed_origins.clone();

    info!(
        "Points day starts at UTC offset {} minutes",
        config.day_utc_offset_minutes
    );
    info!("Starting HTTP server on {}", config.server_address());
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(engine.clone())
            .app_data(routes::json_config())
            .wrap(limiter.clone())
            .wrap(configure_cors(&allowed_origins))
            .wrap(Logger::default())
            .configure(routes::configure::<PgLedgerStore, SystemClock>)
    })
    .bind(config.server_address())?
    .run()
    .await?;

    Ok(())
}
