//! blog-server: serves the blog API, runs schema migrations and seeds data.
//!
//! Run from repo root: `cargo run -p blog-server -- serve --migrate`

use blog_api::{
    app, connect, ensure_database_exists, migrate_latest, migrate_rollback, migration_status,
    run_seeds, validate, AppConfig, AppState, DatabaseProfile, PgStore, SeedOptions, Store,
    RESOURCES,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "blog-server", version, about = "Blog API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Listen for HTTP requests (default).
    Serve {
        /// Apply pending migrations before listening.
        #[arg(long)]
        migrate: bool,
    },
    /// Manage the database schema.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Replace all users and posts with generated data.
    Seed {
        #[arg(long, default_value_t = blog_api::seed::DEFAULT_USER_COUNT)]
        users: usize,
        #[arg(long, default_value_t = blog_api::seed::DEFAULT_POST_COUNT)]
        posts: usize,
        /// Fixed seed for reproducible data.
        #[arg(long)]
        rng_seed: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
enum MigrateAction {
    Latest,
    Rollback,
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("blog_api=info,blog_server=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();
    validate(&RESOURCES)?;
    let config = AppConfig::from_env()?;
    tracing::info!(environment = %config.environment, database = ?config.database, "configuration loaded");

    match cli.command.unwrap_or(Command::Serve { migrate: false }) {
        Command::Serve { migrate } => serve(&config, migrate).await,
        Command::Migrate { action } => run_migrate(&config, action).await,
        Command::Seed {
            users,
            posts,
            rng_seed,
        } => {
            let store = connect(&config.database).await?;
            let summary = run_seeds(
                store.as_ref(),
                SeedOptions {
                    users,
                    posts,
                    rng_seed,
                },
            )
            .await?;
            tracing::info!(users = summary.users, posts = summary.posts, "seeding complete");
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig, migrate: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn Store> = match &config.database {
        DatabaseProfile::Postgres { .. } if migrate => {
            let pg = open_postgres(&config.database).await?;
            let applied = migrate_latest(pg.pool()).await?;
            tracing::info!(count = applied.len(), "migrations applied");
            Arc::new(pg)
        }
        DatabaseProfile::Memory if migrate => {
            tracing::warn!("--migrate ignored for the in-memory store");
            connect(&config.database).await?
        }
        profile => connect(profile).await?,
    };

    let router = app(AppState::new(store));
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!("server running on http://{}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn run_migrate(config: &AppConfig, action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let pg = open_postgres(&config.database).await?;
    match action {
        MigrateAction::Latest => {
            let applied = migrate_latest(pg.pool()).await?;
            tracing::info!(count = applied.len(), names = ?applied, "migrate latest");
        }
        MigrateAction::Rollback => {
            let reverted = migrate_rollback(pg.pool()).await?;
            tracing::info!(count = reverted.len(), names = ?reverted, "migrate rollback");
        }
        MigrateAction::Status => {
            for status in migration_status(pg.pool()).await? {
                match status.batch {
                    Some(batch) => println!("{}  applied (batch {})", status.name, batch),
                    None => println!("{}  pending", status.name),
                }
            }
        }
    }
    Ok(())
}

async fn open_postgres(profile: &DatabaseProfile) -> Result<PgStore, Box<dyn std::error::Error>> {
    match profile {
        DatabaseProfile::Postgres {
            url,
            max_connections,
        } => {
            ensure_database_exists(url).await?;
            Ok(PgStore::connect(url, *max_connections).await?)
        }
        DatabaseProfile::Memory => Err("migrations need a PostgreSQL DATABASE_URL".into()),
    }
}
