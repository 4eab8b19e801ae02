use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use jeanbrun_cli::config::{AppConfig, Overrides};
use jeanbrun_cli::{app, csv_loader, logging, report};
use jeanbrun_core::RuleRepository;
use tracing::{debug, info};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Jeanbrun and LMNP rental investment simulator.
///
/// Reads the six-step wizard input, evaluates the Jeanbrun reduction and both
/// LMNP regimes, and prints the comparison.
#[derive(Debug, Parser)]
#[command(name = "jeanbrun", version, about)]
struct Cli {
    /// Configuration file (defaults to ./jeanbrun.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend to use.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string, e.g. `jeanbrun.db` or `:memory:`.
    /// Without one, built-in rule tables are used.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log filter, e.g. `info` or `jeanbrun_core=debug`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Append log records to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one simulation from a wizard JSON file.
    Simulate {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        tax_year: Option<i32>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Store the simulation in the database.
        #[arg(long)]
        save: bool,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        no_jeanbrun: bool,
        #[arg(long)]
        no_lmnp: bool,
    },
    /// Run every scenario of a CSV file.
    Batch {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        tax_year: Option<i32>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show the rule tables of a tax year.
    Rules {
        #[arg(long)]
        tax_year: Option<i32>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// List saved simulations.
    History {
        #[arg(long)]
        tax_year: Option<i32>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?.apply(Overrides {
        backend: cli.backend,
        db: cli.db,
        log_level: cli.log_level,
        log_file: cli.log_file,
    });

    if let Some(level) = &config.logging.level {
        if !logging::env_filter_is_set() {
            logging::set_log_level(level)?;
        }
    }
    if let Some(path) = &config.logging.file {
        logging::enable_file_logging(path)?;
    }
    debug!(?config, "configuration resolved");

    let db_config = config.db_config();
    let repo = app::open_repository(db_config.as_ref()).await?;
    let repo = repo.as_deref();
    let options = config.features;

    match cli.command {
        Command::Simulate {
            input,
            tax_year,
            format,
            save,
            label,
            no_jeanbrun,
            no_lmnp,
        } => {
            let year = tax_year.unwrap_or(app::default_tax_year(config.default_tax_year));
            let rules = app::resolve_rules(repo, year).await?;
            let wizard = app::read_input(&input)?;

            let mut options = options;
            options.jeanbrun_enabled &= !no_jeanbrun;
            options.lmnp_enabled &= !no_lmnp;

            let result = app::simulate(&wizard, &rules, options)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                Format::Text => print!("{}", report::render_simulation(&result)),
            }

            if save {
                let Some(repo) = repo else {
                    bail!("--save needs a database (use --db or a [database] config section)");
                };
                let record = app::save_simulation(repo, label, &wizard, &result).await?;
                info!(id = record.id, "simulation saved");
                eprintln!("Saved as #{}", record.id);
            }
        }
        Command::Batch {
            file,
            tax_year,
            format,
        } => {
            let year = tax_year.unwrap_or(app::default_tax_year(config.default_tax_year));
            let rules = app::resolve_rules(repo, year).await?;
            let scenarios = csv_loader::load_from_file(&file)?;
            info!(count = scenarios.len(), "scenarios loaded");

            let lines = app::run_batch(&scenarios, &rules, options);
            match format {
                Format::Json => {
                    let json: Vec<_> = lines
                        .iter()
                        .map(|line| match &line.outcome {
                            Ok(result) => serde_json::json!({
                                "label": line.label,
                                "result": result,
                            }),
                            Err(err) => serde_json::json!({
                                "label": line.label,
                                "error": err,
                            }),
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                Format::Text => print!("{}", report::render_batch(&lines)),
            }
        }
        Command::Rules { tax_year, format } => {
            let year = tax_year.unwrap_or(app::default_tax_year(config.default_tax_year));
            let rules = app::resolve_rules(repo, year).await?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&rules)?),
                Format::Text => print!("{}", report::render_rules(&rules)),
            }
        }
        Command::History { tax_year, format } => {
            let Some(repo) = repo else {
                bail!("history needs a database (use --db or a [database] config section)");
            };
            let records = repo
                .list_simulations(tax_year)
                .await
                .context("cannot list simulations")?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                Format::Text => print!("{}", report::render_history(&records)),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_db_flag_after_subcommand() {
        let cli = Cli::parse_from(["jeanbrun", "history", "--db", "x.db"]);

        assert_eq!(cli.db.as_deref(), Some("x.db"));
        assert!(matches!(cli.command, Command::History { tax_year: None, .. }));
    }

    #[test]
    fn simulate_defaults_to_text() {
        let cli = Cli::parse_from(["jeanbrun", "simulate", "--input", "w.json"]);

        let Command::Simulate { format, save, .. } = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(format, Format::Text);
        assert!(!save);
    }
}
