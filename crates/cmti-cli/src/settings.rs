//! Runtime configuration for the `cmti` binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cmti_core::commodity::CommodityTables;
use cmti_tabular::{
  HydrateOptions, OwnerPolicy,
  columns::{COMMODITY_SLOTS, SOURCE_SLOTS},
};
use serde::Deserialize;

/// Loaded from an optional TOML file layered under `CMTI_*` environment
/// variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CmtiConfig {
  pub store_path:      PathBuf,
  /// JSON file holding the commodity lookup tables.
  pub tables_path:     Option<PathBuf>,
  pub owner_policy:    OwnerPolicy,
  pub commodity_slots: usize,
  pub source_slots:    usize,
}

impl Default for CmtiConfig {
  fn default() -> Self {
    Self {
      store_path:      PathBuf::from("cmti.db"),
      tables_path:     None,
      owner_policy:    OwnerPolicy::default(),
      commodity_slots: COMMODITY_SLOTS,
      source_slots:    SOURCE_SLOTS,
    }
  }
}

impl CmtiConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CMTI"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise CmtiConfig")
  }

  pub fn hydrate_options(&self) -> HydrateOptions {
    HydrateOptions {
      owner_policy:    self.owner_policy,
      commodity_slots: self.commodity_slots,
      source_slots:    self.source_slots,
    }
  }

  /// The commodity tables, or empty ones when no file is configured.
  pub async fn tables(&self) -> anyhow::Result<CommodityTables> {
    let Some(path) = &self.tables_path else {
      tracing::info!("no lookup tables configured; commodities stay unclassified");
      return Ok(CommodityTables::default());
    };
    let path = expand_tilde(path);
    let text = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read lookup tables at {path:?}"))?;
    serde_json::from_str(&text)
      .with_context(|| format!("failed to parse lookup tables at {path:?}"))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
