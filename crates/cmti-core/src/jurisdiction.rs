//! Provinces and territories: the namespaces under which site identifiers
//! are issued.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::Error;

/// A Canadian province or territory, identified by its two-letter code.
///
/// Parsing accepts the code or the full English name, case-insensitively.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
  Serialize,
  Deserialize,
)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum Jurisdiction {
  #[strum(to_string = "AB", serialize = "Alberta")]
  Alberta,
  #[strum(to_string = "BC", serialize = "British Columbia")]
  BritishColumbia,
  #[strum(to_string = "MB", serialize = "Manitoba")]
  Manitoba,
  #[strum(to_string = "NB", serialize = "New Brunswick")]
  NewBrunswick,
  #[strum(
    to_string = "NL",
    serialize = "Newfoundland and Labrador",
    serialize = "Newfoundland"
  )]
  NewfoundlandAndLabrador,
  #[strum(to_string = "NS", serialize = "Nova Scotia")]
  NovaScotia,
  #[strum(to_string = "ON", serialize = "Ontario")]
  Ontario,
  #[strum(to_string = "PE", serialize = "Prince Edward Island")]
  PrinceEdwardIsland,
  #[strum(to_string = "QC", serialize = "Quebec")]
  Quebec,
  #[strum(to_string = "SK", serialize = "Saskatchewan")]
  Saskatchewan,
  #[strum(to_string = "NT", serialize = "Northwest Territories")]
  NorthwestTerritories,
  #[strum(to_string = "NU", serialize = "Nunavut")]
  Nunavut,
  #[strum(to_string = "YT", serialize = "Yukon")]
  Yukon,
}

impl Jurisdiction {
  /// The two-letter code used as the identifier prefix.
  pub fn code(self) -> &'static str { self.into() }

  /// Parse free text from a row cell, trimming surrounding whitespace.
  pub fn parse(s: &str) -> crate::Result<Self> {
    s.trim()
      .parse()
      .map_err(|_| Error::InvalidJurisdiction(s.to_owned()))
  }
}

impl From<Jurisdiction> for String {
  fn from(j: Jurisdiction) -> Self { j.code().to_owned() }
}

impl TryFrom<String> for Jurisdiction {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(&s) }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn codes_round_trip() {
    for j in Jurisdiction::iter() {
      assert_eq!(Jurisdiction::parse(j.code()).unwrap(), j);
      assert_eq!(j.code().len(), 2);
    }
    assert_eq!(Jurisdiction::iter().count(), 13);
  }

  #[test]
  fn parses_names_and_lowercase() {
    assert_eq!(Jurisdiction::parse("on").unwrap(), Jurisdiction::Ontario);
    assert_eq!(
      Jurisdiction::parse(" British Columbia ").unwrap(),
      Jurisdiction::BritishColumbia
    );
    assert!(matches!(
      Jurisdiction::parse("XX"),
      Err(Error::InvalidJurisdiction(_))
    ));
  }

  #[test]
  fn serde_uses_code() {
    let json = serde_json::to_string(&Jurisdiction::Yukon).unwrap();
    assert_eq!(json, "\"YT\"");
    let back: Jurisdiction = serde_json::from_str("\"QC\"").unwrap();
    assert_eq!(back, Jurisdiction::Quebec);
  }
}
