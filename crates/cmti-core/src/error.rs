//! Error types for `cmti-core`.

use thiserror::Error;

use crate::{identifier::SiteId, jurisdiction::Jurisdiction};

#[derive(Debug, Error)]
pub enum Error {
  /// The issuer was asked for a jurisdiction outside the set it was built
  /// with. This is a configuration defect, never dirty data.
  #[error("jurisdiction {0} is not configured on this issuer")]
  UnknownJurisdiction(Jurisdiction),

  #[error("unrecognised jurisdiction code: {0:?}")]
  InvalidJurisdiction(String),

  #[error("malformed site identifier: {0:?}")]
  MalformedIdentifier(String),

  #[error("identifier space exhausted for {0}")]
  IdentifierSpaceExhausted(Jurisdiction),

  #[error("mine {0} already has a default tailings facility")]
  DuplicateDefaultFacility(SiteId),

  #[error("facility {0:?} already has a default impoundment")]
  DuplicateDefaultImpoundment(String),

  #[error("mine {mine} already records commodity {symbol:?}")]
  DuplicateCommodity { mine: SiteId, symbol: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
