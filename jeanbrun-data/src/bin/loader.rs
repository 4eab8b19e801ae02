use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jeanbrun_data::{JeanbrunRateLoader, TaxBracketLoader};
use jeanbrun_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TableKind {
    /// Columns: tax_year, min_income, max_income (empty for the top bracket), rate
    Brackets,
    /// Columns: tax_year, zone, duree_detention, niveau_loyer, reduction_rate
    Rates,
}

/// Load a yearly rule table from a CSV file into the database.
#[derive(Parser, Debug)]
#[command(name = "jeanbrun-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file
    #[arg(short, long)]
    file: PathBuf,

    /// Which table the CSV holds
    #[arg(short, long, value_enum, default_value_t = TableKind::Brackets)]
    kind: TableKind,

    /// SQLite database URL (e.g., sqlite:jeanbrun.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:jeanbrun.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let inserted = match args.kind {
        TableKind::Brackets => {
            let records = TaxBracketLoader::parse(file)
                .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;
            println!("Parsed {} bracket records from CSV", records.len());
            TaxBracketLoader::load(&repo, &records)
                .await
                .context("Failed to load tax brackets into database")?
        }
        TableKind::Rates => {
            let records = JeanbrunRateLoader::parse(file)
                .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;
            println!("Parsed {} rate records from CSV", records.len());
            JeanbrunRateLoader::load(&repo, &records)
                .await
                .context("Failed to load Jeanbrun rates into database")?
        }
    };

    println!("Successfully loaded {inserted} rows into the database.");

    Ok(())
}
