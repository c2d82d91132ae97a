//! Conversions between domain types and their SQLite column representations.
//!
//! Writes go through `Encoded*` structs built before entering the connection
//! thread; reads come back as `Raw*` structs and are decoded afterwards, so
//! the database closures only ever handle plain strings and integers.

use cmti_core::{
  facility::{Impoundment, TailingsFacility},
  identifier::SiteId,
  jurisdiction::Jurisdiction,
  mine::{Alias, Mine, Orebody, Reference},
  owner::{Owner, OwnerAssociation},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_site_id(s: &str) -> Result<SiteId> {
  s.parse()
    .map_err(|e| Error::Decode(format!("site id {s:?}: {e}")))
}

fn decode_jurisdiction(s: &str) -> Result<Jurisdiction> {
  Jurisdiction::parse(s)
    .map_err(|e| Error::Decode(format!("jurisdiction {s:?}: {e}")))
}

// ─── Write side ──────────────────────────────────────────────────────────────

pub struct EncodedImpoundment {
  pub impoundment_id: String,
  pub site_id:        Option<String>,
  pub name:           String,
  pub is_default:     bool,
  pub attrs_json:     String,
}

impl EncodedImpoundment {
  pub fn new(impoundment: &Impoundment) -> Result<Self> {
    Ok(Self {
      impoundment_id: encode_uuid(impoundment.impoundment_id),
      site_id:        impoundment.site_id.map(|id| id.to_string()),
      name:           impoundment.name.clone(),
      is_default:     impoundment.is_default(),
      attrs_json:     serde_json::to_string(impoundment)?,
    })
  }
}

pub struct EncodedFacility {
  pub facility_id:      String,
  pub site_id:          Option<String>,
  pub name:             String,
  pub is_default:       bool,
  pub attrs_json:       String,
  pub associated_mines: Vec<String>,
  pub impoundments:     Vec<EncodedImpoundment>,
}

impl EncodedFacility {
  /// The facility's own attributes are stored with empty impoundment and
  /// association lists; both live in their own tables.
  pub fn new(facility: &TailingsFacility) -> Result<Self> {
    let mut attrs = serde_json::to_value(facility)?;
    if let Some(obj) = attrs.as_object_mut() {
      obj.insert("impoundments".into(), serde_json::Value::Array(Vec::new()));
      obj.insert(
        "associated_mines".into(),
        serde_json::Value::Array(Vec::new()),
      );
    }
    let impoundments = facility
      .impoundments
      .iter()
      .map(EncodedImpoundment::new)
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      facility_id: encode_uuid(facility.facility_id),
      site_id: facility.site_id.map(|id| id.to_string()),
      name: facility.name.clone(),
      is_default: facility.is_default(),
      attrs_json: attrs.to_string(),
      associated_mines: facility
        .associated_mines
        .iter()
        .map(|id| id.to_string())
        .collect(),
      impoundments,
    })
  }
}

/// An owner association flattened to columns. Used for both directions.
pub struct OwnerRow {
  pub owner_id:   String,
  pub name:       String,
  pub is_current: bool,
  pub start_year: Option<i32>,
  pub end_year:   Option<i32>,
}

impl OwnerRow {
  fn new(association: &OwnerAssociation) -> Self {
    Self {
      owner_id:   encode_uuid(association.owner.owner_id),
      name:       association.owner.name.clone(),
      is_current: association.is_current_owner,
      start_year: association.start_year,
      end_year:   association.end_year,
    }
  }

  fn into_association(self) -> Result<OwnerAssociation> {
    Ok(OwnerAssociation {
      owner:            Owner {
        owner_id: decode_uuid(&self.owner_id)?,
        name:     self.name,
      },
      is_current_owner: self.is_current,
      start_year:       self.start_year,
      end_year:         self.end_year,
    })
  }
}

pub struct EncodedMine {
  pub site_id:       String,
  pub jurisdiction:  String,
  pub name:          String,
  pub location_json: String,
  pub details_json:  String,
  pub facilities:    Vec<EncodedFacility>,
  /// `(symbol, record_json)` pairs.
  pub commodities:   Vec<(String, String)>,
  pub aliases:       Vec<String>,
  pub owners:        Vec<OwnerRow>,
  pub references:    Vec<Reference>,
  pub orebodies:     Vec<Orebody>,
}

impl EncodedMine {
  pub fn new(mine: &Mine) -> Result<Self> {
    let commodities = mine
      .commodities
      .iter()
      .map(|c| Ok((c.symbol.clone(), serde_json::to_string(c)?)))
      .collect::<Result<Vec<_>>>()?;
    let facilities = mine
      .facilities
      .iter()
      .map(EncodedFacility::new)
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      site_id: mine.site_id.to_string(),
      jurisdiction: mine.jurisdiction.code().to_owned(),
      name: mine.name.clone(),
      location_json: serde_json::to_string(&mine.location)?,
      details_json: serde_json::to_string(&mine.details)?,
      facilities,
      commodities,
      aliases: mine.aliases.iter().map(|a| a.name.clone()).collect(),
      owners: mine.owners.iter().map(OwnerRow::new).collect(),
      references: mine.references.clone(),
      orebodies: mine.orebodies.clone(),
    })
  }
}

// ─── Read side ───────────────────────────────────────────────────────────────

pub struct RawFacility {
  pub attrs_json:       String,
  pub associated_mines: Vec<String>,
  pub impoundments:     Vec<String>,
}

impl RawFacility {
  pub fn into_facility(self) -> Result<TailingsFacility> {
    let mut facility: TailingsFacility = serde_json::from_str(&self.attrs_json)?;
    facility.associated_mines = self
      .associated_mines
      .iter()
      .map(|id| decode_site_id(id))
      .collect::<Result<Vec<_>>>()?;
    facility.impoundments = self
      .impoundments
      .iter()
      .map(|json| Ok(serde_json::from_str(json)?))
      .collect::<Result<Vec<_>>>()?;
    Ok(facility)
  }
}

pub struct RawMine {
  pub site_id:       String,
  pub jurisdiction:  String,
  pub name:          String,
  pub location_json: String,
  pub details_json:  String,
  pub facilities:    Vec<RawFacility>,
  pub commodities:   Vec<String>,
  pub aliases:       Vec<String>,
  pub owners:        Vec<OwnerRow>,
  pub references:    Vec<Reference>,
  pub orebodies:     Vec<Orebody>,
}

impl RawMine {
  pub fn into_mine(self) -> Result<Mine> {
    let commodities = self
      .commodities
      .iter()
      .map(|json| Ok(serde_json::from_str(json)?))
      .collect::<Result<Vec<_>>>()?;
    let owners = self
      .owners
      .into_iter()
      .map(OwnerRow::into_association)
      .collect::<Result<Vec<_>>>()?;
    let facilities = self
      .facilities
      .into_iter()
      .map(RawFacility::into_facility)
      .collect::<Result<Vec<_>>>()?;

    Ok(Mine {
      site_id: decode_site_id(&self.site_id)?,
      name: self.name,
      jurisdiction: decode_jurisdiction(&self.jurisdiction)?,
      location: serde_json::from_str(&self.location_json)?,
      details: serde_json::from_str(&self.details_json)?,
      commodities,
      aliases: self.aliases.into_iter().map(|name| Alias { name }).collect(),
      owners,
      references: self.references,
      orebodies: self.orebodies,
      facilities,
    })
  }
}
