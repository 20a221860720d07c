//! Yamdb data import tool
//!
//! Creates the schema, bulk-loads the reference CSV data set and
//! bootstraps administrator accounts.

mod errors;
mod loader;
mod superuser;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use yamdb_common::{config::AppConfig, db::DbPool, Repository, VERSION};

#[derive(Parser, Debug)]
#[command(name = "yamdb-import", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create missing tables and indexes.
    Schema,
    /// Load category, genre, users, titles, genre_title, review and comments CSV files.
    Load {
        /// Directory holding the CSV files
        dir: PathBuf,
    },
    /// Create an administrator and print a confirmation code for it.
    CreateSuperuser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Logs go to stderr so stdout carries only command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Yamdb import v{}", VERSION);
    let pool = DbPool::bootstrap(&config.database).await?;

    match cli.command {
        // Bootstrapping the pool already created anything missing
        Commands::Schema => info!("Schema is up to date"),
        Commands::Load { dir } => {
            let report = loader::load_dir(pool.write(), &dir)
                .await
                .with_context(|| format!("Failed to import {}", dir.display()))?;
            for (file, rows) in &report.files {
                match rows {
                    Some(rows) => println!("{file}: {rows} rows"),
                    None => println!("{file}: skipped"),
                }
            }
        }
        Commands::CreateSuperuser { username, email } => {
            let code = superuser::create_superuser(&Repository::new(pool), username, email).await?;
            println!("{code}");
        }
    }

    Ok(())
}
