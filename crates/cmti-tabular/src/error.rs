//! Error types for the row pipeline.

use cmti_core::{identifier::SiteId, jurisdiction::Jurisdiction, store::SiteKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cmti_core::Error),

  #[error("row has no site name")]
  MissingName,

  #[error("row has neither an identifier nor a jurisdiction")]
  MissingJurisdiction,

  #[error("identifier {id} does not belong to jurisdiction {stated}")]
  JurisdictionMismatch { id: SiteId, stated: Jurisdiction },

  #[error("unrecognised site type: {0:?}")]
  UnknownSiteType(String),

  #[error("{kind} row has no usable parent identifier")]
  MissingParentId { kind: SiteKind },

  #[error("parent {id} of {kind} row not found")]
  MissingParent { kind: SiteKind, id: String },

  #[error("facility {0} is already recorded for every listed mine")]
  AlreadyRecorded(SiteId),

  #[error("store error: {0}")]
  Store(Box<dyn std::error::Error + Send + Sync>),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  /// Whether this error must abort a whole batch rather than one row.
  ///
  /// Only issuer misconfiguration qualifies; everything else is dirty data
  /// or a store refusal scoped to the row at hand.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Error::Core(cmti_core::Error::UnknownJurisdiction(_)))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
