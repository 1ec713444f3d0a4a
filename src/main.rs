mod common;
mod config;
mod external;
mod routes;

#[cfg(test)]
mod test_helpers;

use crate::common::schema::create_tables;
use crate::config::Config;
use crate::routes::lookups::{LookupKind, create_lookup, delete_lookup};
use crate::routes::users::services::create_user;
use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser)]
#[command(version, about = "Delivery tracking API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Register a user able to log in
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Add a transport plate, packaging title, cargo type or service name
    AddLookup { kind: LookupKind, value: String },
    /// Delete a lookup row that no delivery references
    RemoveLookup { kind: LookupKind, id: Uuid },
}

async fn connect(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let url = config
        .db_url
        .as_deref()
        .context("DB_URL or DB_* variables must be set")?;
    let mut options = ConnectOptions::new(url);
    options.sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .context("Could not connect to the database")?;
    db.ping().await.context("Database ping failed")?;
    tracing::info!("Connected to the database");
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up tracing/logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    // Load configuration and environment variables to pass to the application
    let config: Config = Config::from_env();
    let db = connect(&config).await?;
    create_tables(&db).await.context("Schema bootstrap failed")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&db, &config).await,
        Command::CreateUser { username, password } => {
            let user = create_user(&db, &username, &password).await?;
            println!("Created user {} ({})", user.username, user.id);
            Ok(())
        }
        Command::AddLookup { kind, value } => {
            let id = create_lookup(&db, kind, &value).await?;
            println!("Created {kind} {id}");
            Ok(())
        }
        Command::RemoveLookup { kind, id } => {
            delete_lookup(&db, kind, id).await?;
            println!("Deleted {kind} {id}");
            Ok(())
        }
    }
}

async fn serve(db: &DatabaseConnection, config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting server {} ({} deployment) ...",
        config.app_name,
        config.deployment.to_uppercase()
    );

    let addr: std::net::SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN_ADDR {}", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    let router = routes::build_router(db, config);
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
