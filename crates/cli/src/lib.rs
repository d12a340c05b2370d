mod output;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tally_core::{ActivityRecordSet, LedgerTransaction};
use tally_import::import::{parse_transaction_activity_file, reconcile};
use tally_import::{ActivitySource, ReconcileConfig, SUPPORTED_INSTITUTIONS};

pub use output::{ActivityOutput, MatchOutput, ReconcileOutput, TransactionOutput};

#[derive(Parser)]
#[command(
    name = "tally",
    about = "Reconcile credit card activity against recorded transactions"
)]
struct Args {
    /// TOML file with staging and near-match settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match an activity export against recorded transactions
    Reconcile {
        /// Activity CSV exported by the card issuer
        #[arg(short, long)]
        activity: PathBuf,

        /// JSON array of recorded transactions
        #[arg(short, long)]
        transactions: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Parse an activity export and print the normalized records
    Parse {
        /// Activity CSV exported by the card issuer
        #[arg(short, long)]
        activity: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

pub fn run(args: impl IntoIterator<Item = String>) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tally=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_from(args);
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Reconcile {
            activity,
            transactions,
            format,
        } => {
            let activities = load_activity(&activity, &config)?;
            let ledger = load_transactions(&transactions)?;
            let report = reconcile(&ledger, &activities, &config);
            let output = ReconcileOutput::from_report(&report);
            match format {
                OutputFormat::Text => print!("{output}"),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
            }
        }
        Commands::Parse { activity, format } => {
            let activities = load_activity(&activity, &config)?;
            let records: Vec<ActivityOutput> = activities.iter().map(ActivityOutput::from).collect();
            match format {
                OutputFormat::Text => {
                    for record in &records {
                        println!("{record}");
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ReconcileConfig> {
    let Some(path) = path else {
        tracing::debug!("no config file given, using defaults");
        return Ok(ReconcileConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = ReconcileConfig::from_toml(&text)
        .with_context(|| format!("Failed to load config file '{}'", path.display()))?;
    tracing::info!(
        path = %path.display(),
        near_match = ?config.near_match,
        "loaded config"
    );
    Ok(config)
}

fn load_activity(path: &Path, config: &ReconcileConfig) -> Result<ActivityRecordSet> {
    let staging_dir = config.resolved_staging_dir();
    let activities =
        parse_transaction_activity_file(ActivitySource::Path(path), &staging_dir)
            .with_context(|| format!("Failed to parse activity file '{}'", path.display()))?;
    match activities {
        Some(activities) => Ok(activities),
        None => bail!(
            "The format of '{}' was not recognized. Currently supported formats include: {}.",
            path.display(),
            SUPPORTED_INSTITUTIONS.join(", ")
        ),
    }
}

fn load_transactions(path: &Path) -> Result<Vec<LedgerTransaction>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transactions file '{}'", path.display()))?;
    let ledger: Vec<LedgerTransaction> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse transactions file '{}'", path.display()))?;
    tracing::info!(path = %path.display(), transactions = ledger.len(), "loaded transactions");
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn reconcile_arguments() {
        let args = parse(&[
            "tally",
            "reconcile",
            "--activity",
            "may.csv",
            "--transactions",
            "ledger.json",
            "--format",
            "json",
            "--config",
            "tally.toml",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("tally.toml")));
        match args.command {
            Commands::Reconcile {
                activity,
                transactions,
                format,
            } => {
                assert_eq!(activity, PathBuf::from("may.csv"));
                assert_eq!(transactions, PathBuf::from("ledger.json"));
                assert_eq!(format, OutputFormat::Json);
            }
            Commands::Parse { .. } => panic!("expected reconcile"),
        }
    }

    #[test]
    fn format_defaults_to_text() {
        let args = parse(&["tally", "parse", "-a", "may.csv"]);
        match args.command {
            Commands::Parse { format, .. } => assert_eq!(format, OutputFormat::Text),
            Commands::Reconcile { .. } => panic!("expected parse"),
        }
        assert!(args.config.is_none());
    }

    #[test]
    fn reconcile_requires_transactions() {
        assert!(Args::try_parse_from(["tally", "reconcile", "--activity", "may.csv"]).is_err());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "[near_match]\ndate_window_days = 3\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.near_match.date_window_days, 3);
        assert_eq!(load_config(None).unwrap(), ReconcileConfig::default());
    }

    #[test]
    fn transactions_are_read_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(
            &path,
            r#"[{"id": 7, "transaction_date": "2020-05-31", "total": "-250.00", "merchant": "Chase"}]"#,
        )
        .unwrap();

        let ledger = load_transactions(&path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].id, 7);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/tally.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tally.toml"));
    }
}
