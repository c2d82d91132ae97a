//! `cmti` command-line binary.
//!
//! Reads `cmti.toml` (or the path given with `--config`), opens the SQLite
//! inventory and moves worksheet rows in and out of it. Row files are JSON
//! arrays of objects keyed by column name.
//!
//! ```text
//! cmti import --source omi omi_rows.json
//! cmti export --output inventory.json --mode append
//! cmti next-id ON
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use cmti_core::{
  identifier::{IdIssuer, SiteId},
  jurisdiction::Jurisdiction,
};
use cmti_store_sqlite::SqliteStore;
use cmti_tabular::{
  ExportMode, IngestContext, Row, SourceKind, apply_export, export, ingest, seed_issuer,
};
use settings::{CmtiConfig, expand_tilde};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Canadian mine tailings inventory tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cmti.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ingest a JSON row file into the inventory.
  Import {
    /// Layout of the input rows.
    #[arg(short, long, default_value = "worksheet")]
    source: SourceKind,

    /// Date used where a row carries no revision date. Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Write the per-row report here instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,

    input: PathBuf,
  },

  /// Flatten the inventory back into worksheet rows.
  Export {
    /// Destination file; rows go to stdout when absent.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::Overwrite)]
    mode: Mode,
  },

  /// Print the identifier the next new site in a jurisdiction would get.
  NextId { jurisdiction: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
  Append,
  Overwrite,
}

impl From<Mode> for ExportMode {
  fn from(mode: Mode) -> Self {
    match mode {
      Mode::Append => ExportMode::Append,
      Mode::Overwrite => ExportMode::Overwrite,
    }
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CmtiConfig::load(&cli.config)?;

  // Open SQLite store.
  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let mut issuer = IdIssuer::canadian();
  seed_issuer(&store, &mut issuer)
    .await
    .context("failed to seed identifier issuer")?;

  match cli.command {
    Command::Import {
      source,
      as_of,
      report,
      input,
    } => {
      let tables = cfg.tables().await?;
      let rows = read_rows(&input).await?;
      let ctx = IngestContext {
        tables:  &tables,
        options: cfg.hydrate_options(),
        as_of:   as_of.unwrap_or_else(|| chrono::Local::now().date_naive()),
      };

      let outcome = ingest(&store, &mut issuer, source, rows, &ctx)
        .await
        .with_context(|| format!("import of {input:?} aborted"))?;
      tracing::info!(summary = %outcome.summary(), "import complete");

      let json = serde_json::to_string_pretty(&outcome)?;
      match report {
        Some(path) => tokio::fs::write(&path, json)
          .await
          .with_context(|| format!("failed to write report to {path:?}"))?,
        None => println!("{json}"),
      }
    }

    Command::Export { output, mode } => {
      let exported = export(&store, &cfg.hydrate_options())
        .await
        .context("export failed")?;

      match output {
        Some(path) => {
          let existing = match mode {
            Mode::Append if path.exists() => read_rows(&path).await?,
            _ => Vec::new(),
          };
          let rows = apply_export(existing, exported, mode.into());
          tokio::fs::write(&path, serde_json::to_string_pretty(&rows)?)
            .await
            .with_context(|| format!("failed to write rows to {path:?}"))?;
          tracing::info!(rows = rows.len(), path = ?path, "rows written");
        }
        None => println!("{}", serde_json::to_string_pretty(&exported)?),
      }
    }

    Command::NextId { jurisdiction } => {
      println!("{}", next_id(&issuer, &jurisdiction)?);
    }
  }

  Ok(())
}

/// The identifier a new site in `jurisdiction` would get, leaving `issuer`
/// where it is.
fn next_id(issuer: &IdIssuer, jurisdiction: &str) -> anyhow::Result<SiteId> {
  let code = Jurisdiction::parse(jurisdiction)?;
  Ok(issuer.upcoming(code)?)
}

/// Read a JSON array of rows.
async fn read_rows(path: &Path) -> anyhow::Result<Vec<Row>> {
  let text = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read {path:?}"))?;
  serde_json::from_str(&text).with_context(|| format!("failed to parse rows in {path:?}"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn next_id_is_one_past_the_last_stored_identifier() {
    let mut issuer = IdIssuer::canadian();
    issuer.seed_from_ids([&"ON000042".parse::<SiteId>().unwrap()]).unwrap();

    assert_eq!(next_id(&issuer, "Ontario").unwrap().to_string(), "ON000043");
    assert_eq!(next_id(&issuer, "ON").unwrap().to_string(), "ON000043");
    assert_eq!(issuer.current(Jurisdiction::Ontario).unwrap(), 42);
    assert!(next_id(&issuer, "Atlantis").is_err());
  }
}
