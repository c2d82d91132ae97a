//! Resolution of the fixed-width slot groups on a row.
//!
//! A row carries up to [`COMMODITY_SLOTS`](crate::columns::COMMODITY_SLOTS)
//! commodity names, each with sibling quantity columns keyed by symbol, and
//! up to [`SOURCE_SLOTS`](crate::columns::SOURCE_SLOTS) reference triples.
//! Both are read once here into plain records so hydration never has to
//! build column names itself.

use std::collections::BTreeSet;

use cmti_core::{commodity::CommodityTables, mine::Reference};

use crate::{
  columns::{self, UNKNOWN},
  row::Row,
  units,
};

/// Optional quantities reported for one commodity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quantities {
  pub grade:     Option<f64>,
  pub produced:  Option<f64>,
  pub contained: Option<f64>,
}

impl Quantities {
  pub fn is_empty(&self) -> bool {
    self.grade.is_none() && self.produced.is_none() && self.contained.is_none()
  }
}

/// One resolved commodity slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CommodityEntry {
  pub symbol:     String,
  pub quantities: Quantities,
}

fn is_sentinel(value: &str) -> bool { value.eq_ignore_ascii_case(UNKNOWN) }

/// A numeric cell, tolerating dirty text the normaliser never saw (quantity
/// columns of commodities outside the worksheet catalogue).
fn quantity(row: &Row, column: &str) -> Option<f64> {
  row
    .float(column)
    .or_else(|| row.text(column).as_deref().and_then(units::extract_number))
}

fn quantities(row: &Row, key: &str) -> Quantities {
  Quantities {
    grade:     quantity(row, &columns::grade(key)),
    produced:  quantity(row, &columns::produced(key)),
    contained: quantity(row, &columns::contained(key)),
  }
}

/// Read the first `slots` commodity columns.
///
/// Blank and `"Unknown"` slots are skipped, names are translated to symbols,
/// and a symbol already seen in an earlier slot is dropped. Quantities are
/// looked up under the symbol first and the raw slot text second.
pub fn commodity_entries(
  row: &Row,
  tables: &CommodityTables,
  slots: usize,
) -> Vec<CommodityEntry> {
  let mut seen = BTreeSet::new();
  let mut entries = Vec::new();

  for slot in 1..=slots {
    let Some(raw) = row.text(&columns::commodity(slot)) else {
      continue;
    };
    if is_sentinel(&raw) {
      continue;
    }
    let symbol = tables.to_symbol(&raw);
    if !seen.insert(symbol.clone()) {
      continue;
    }
    let mut q = quantities(row, &symbol);
    if q.is_empty() && raw != symbol {
      q = quantities(row, &raw);
    }
    entries.push(CommodityEntry {
      symbol,
      quantities: q,
    });
  }
  entries
}

/// Read the first `slots` source triples, skipping blank and `"Unknown"`
/// sources.
pub fn reference_entries(row: &Row, slots: usize) -> Vec<Reference> {
  (1..=slots)
    .filter_map(|slot| {
      let source = row.text(&columns::source(slot))?;
      if is_sentinel(&source) {
        return None;
      }
      Some(Reference {
        source,
        source_id: row.text(&columns::source_id(slot)),
        link: row.text(&columns::source_link(slot)),
      })
    })
    .collect()
}
