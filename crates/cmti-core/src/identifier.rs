//! Site identifiers and the per-jurisdiction issuer that hands them out.
//!
//! An identifier is a jurisdiction code followed by a six-digit, zero-padded
//! counter value (`ON000042`). The [`IdIssuer`] keeps one high-water mark per
//! jurisdiction. It performs no locking: callers sharing an issuer across
//! tasks must wrap it themselves.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{Error, Result, jurisdiction::Jurisdiction};

/// Number of digits in the numeric part of a [`SiteId`].
pub const ID_DIGITS: usize = 6;

/// Largest counter value that still fits in [`ID_DIGITS`] digits.
pub const MAX_SITE_NUMBER: u32 = 999_999;

// ─── SiteId ──────────────────────────────────────────────────────────────────

/// A jurisdiction-scoped site identifier such as `BC000317`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct SiteId {
  jurisdiction: Jurisdiction,
  number:       u32,
}

impl SiteId {
  pub fn new(jurisdiction: Jurisdiction, number: u32) -> Result<Self> {
    if number > MAX_SITE_NUMBER {
      return Err(Error::IdentifierSpaceExhausted(jurisdiction));
    }
    Ok(Self { jurisdiction, number })
  }

  pub fn jurisdiction(&self) -> Jurisdiction { self.jurisdiction }

  pub fn number(&self) -> u32 { self.number }
}

impl fmt::Display for SiteId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}{:0width$}",
      self.jurisdiction.code(),
      self.number,
      width = ID_DIGITS
    )
  }
}

impl FromStr for SiteId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    let malformed = || Error::MalformedIdentifier(s.to_owned());

    if s.len() != 2 + ID_DIGITS || !s.is_ascii() {
      return Err(malformed());
    }
    let (code, digits) = s.split_at(2);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
      return Err(malformed());
    }
    let jurisdiction = code
      .parse::<Jurisdiction>()
      .map_err(|_| malformed())?;
    let number = digits.parse::<u32>().map_err(|_| malformed())?;
    Ok(Self { jurisdiction, number })
  }
}

impl From<SiteId> for String {
  fn from(id: SiteId) -> Self { id.to_string() }
}

impl TryFrom<String> for SiteId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

// ─── Issuer ──────────────────────────────────────────────────────────────────

/// Monotonic per-jurisdiction identifier issuer.
///
/// The set of jurisdictions is fixed at construction. Asking for any other
/// jurisdiction yields [`Error::UnknownJurisdiction`].
#[derive(Debug, Clone)]
pub struct IdIssuer {
  counters: BTreeMap<Jurisdiction, u32>,
}

impl IdIssuer {
  /// A fresh issuer over `codes`, every counter at zero.
  pub fn new(codes: impl IntoIterator<Item = Jurisdiction>) -> Self {
    Self {
      counters: codes.into_iter().map(|j| (j, 0)).collect(),
    }
  }

  /// A fresh issuer covering every province and territory.
  pub fn canadian() -> Self { Self::new(Jurisdiction::iter()) }

  pub fn jurisdictions(&self) -> impl Iterator<Item = Jurisdiction> + '_ {
    self.counters.keys().copied()
  }

  /// The current high-water mark for `code`.
  pub fn current(&self, code: Jurisdiction) -> Result<u32> {
    self
      .counters
      .get(&code)
      .copied()
      .ok_or(Error::UnknownJurisdiction(code))
  }

  /// Ratchet the counter for `code` up to `value`. Never lowers it.
  pub fn seed(&mut self, code: Jurisdiction, value: u32) -> Result<()> {
    let counter = self.counter_mut(code)?;
    if value > *counter {
      *counter = value;
    }
    Ok(())
  }

  /// Seed every configured counter from a scan of existing identifiers.
  ///
  /// Identifiers from jurisdictions this issuer does not cover are ignored;
  /// they can never collide with anything it issues.
  pub fn seed_from_ids<'a>(
    &mut self,
    ids: impl IntoIterator<Item = &'a SiteId>,
  ) -> Result<()> {
    for id in ids {
      if self.counters.contains_key(&id.jurisdiction) {
        self.seed(id.jurisdiction, id.number)?;
      }
    }
    Ok(())
  }

  /// Advance the counter for `code` and return the new identifier.
  pub fn next(&mut self, code: Jurisdiction) -> Result<SiteId> {
    let counter = self.counter_mut(code)?;
    if *counter >= MAX_SITE_NUMBER {
      return Err(Error::IdentifierSpaceExhausted(code));
    }
    *counter += 1;
    SiteId::new(code, *counter)
  }

  /// The identifier for the current counter value, without advancing.
  pub fn peek(&self, code: Jurisdiction) -> Result<SiteId> {
    SiteId::new(code, self.current(code)?)
  }

  /// The identifier [`IdIssuer::next`] would return, without advancing.
  /// Seeding the issuer with it afterwards has the same effect as `next`.
  pub fn upcoming(&self, code: Jurisdiction) -> Result<SiteId> {
    SiteId::new(code, self.current(code)? + 1)
  }

  fn counter_mut(&mut self, code: Jurisdiction) -> Result<&mut u32> {
    self
      .counters
      .get_mut(&code)
      .ok_or(Error::UnknownJurisdiction(code))
  }
}

impl Default for IdIssuer {
  fn default() -> Self { Self::canadian() }
}
