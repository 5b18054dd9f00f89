use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use outfit_recipe_api::config::{self, AppConfig};
use outfit_recipe_api::database::{Database, DatabaseManager, MemoryDatabase, PgDatabase};
use outfit_recipe_api::handlers::{router, AppState};

#[derive(Parser)]
#[command(name = "outfit-recipe-api")]
#[command(about = "Owner-scoped outfit and recipe API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Serve from an in-process store instead of Postgres")]
        memory: bool,
    },

    #[command(about = "Apply pending database migrations")]
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting in {:?} mode", config.environment);

    match Cli::parse().command {
        Commands::Serve { port, memory } => {
            if memory {
                tracing::warn!("Using in-memory store; data is lost on exit");
                serve(MemoryDatabase::new(), config, port).await
            } else {
                let db = PgDatabase::connect(&config.database)
                    .await
                    .context("failed to connect to database")?;
                serve(db, config, port).await
            }
        }
        Commands::Migrate => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            DatabaseManager::migrate(&pool).await.context("migration failed")?;
            tracing::info!("Migrations applied");
            Ok(())
        }
    }
}

async fn serve<D: Database>(db: D, config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let app = router(AppState::new(db, config.page_bounds()), config);

    let bind_addr = format!("{}:{}", config.api.host, port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
