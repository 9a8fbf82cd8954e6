use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use quire_app::modules::books::maintenance::{import_books, prune_books, PruneRule};
use quire_app::modules::users::accounts::ensure_admin;
use quire_app::AppState;
use quire_db::Database;
use quire_kernel::settings::Settings;

/// Operator commands for the quire bookstore service.
#[derive(Debug, Parser)]
#[command(name = "quire", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,

    /// Create an admin account, or promote an existing account to admin
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Insert books from a JSON array of book records
    Import {
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete books matching every given condition
    Prune {
        /// Publication date cutoff, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        published_before: Option<NaiveDate>,
        /// Exact author name, case-insensitive
        #[arg(long)]
        author: Option<String>,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load quire settings")?;
    quire_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => quire_app::run(settings).await,
        Command::CreateAdmin { email, password } => {
            let state = open_state(&settings).await?;
            let (user, created) = ensure_admin(&state.users, &email, &password)
                .await
                .context("failed to create admin")?;
            let verb = if created { "created" } else { "promoted" };
            println!("{verb} admin {} ({})", user.email, user.id);
            Ok(())
        }
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let records: Vec<serde_json::Value> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array", file.display()))?;

            let state = open_state(&settings).await?;
            let report = import_books(state.books.as_ref(), records)
                .await
                .context("import aborted")?;
            println!("inserted {} books, skipped {}", report.inserted, report.skipped);
            Ok(())
        }
        Command::Prune {
            published_before,
            author,
        } => {
            let rule = PruneRule {
                published_before,
                author,
            };
            if rule.is_empty() {
                bail!("prune needs --published-before and/or --author");
            }

            let state = open_state(&settings).await?;
            let removed = prune_books(state.books.as_ref(), &rule)
                .await
                .context("prune failed")?;
            println!("deleted {removed} books");
            Ok(())
        }
    }
}

/// Maintenance commands only make sense against persisted data.
async fn open_state(settings: &Settings) -> anyhow::Result<AppState> {
    if settings.database.data_dir.is_none() {
        bail!("database.data_dir must be configured (QUIRE_DATABASE__DATA_DIR)");
    }
    let db = Database::connect(&settings.database);
    AppState::open(&db, &settings.auth)
        .await
        .context("failed to open collections")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn prune_arguments_parse() {
        let cli = Cli::try_parse_from([
            "quire",
            "prune",
            "--published-before",
            "2000-01-31",
            "--author",
            "Anon",
        ])
        .unwrap();
        match cli.command {
            Command::Prune {
                published_before,
                author,
            } => {
                assert_eq!(published_before, NaiveDate::from_ymd_opt(2000, 1, 31));
                assert_eq!(author.as_deref(), Some("Anon"));
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["quire", "prune", "--published-before", "31/01/2000"]).is_err());
    }
}
