//! Physical units and quantity parsing.
//!
//! A small fixed registry covering the dimensions the worksheet records:
//! length, area, volume and mass. Each unit is a factor onto the dimension's
//! base unit (m, m², m³, kg).

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
  Length,
  Area,
  Volume,
  Mass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
  pub symbol:    &'static str,
  pub dimension: Dimension,
  /// Multiplier onto the dimension's base unit.
  pub factor:    f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum UnitError {
  #[error("unrecognised unit {0:?}")]
  Unknown(String),

  #[error("cannot convert {from} to {to}")]
  Incompatible {
    from: &'static str,
    to:   &'static str,
  },
}

const fn unit(symbol: &'static str, dimension: Dimension, factor: f64) -> Unit {
  Unit {
    symbol,
    dimension,
    factor,
  }
}

/// Registry entries with every spelling accepted for them. Order matters for
/// case-insensitive lookups: the first match wins, so `"MT"` reads as tonnes.
const UNITS: &[(Unit, &[&str])] = &[
  // length
  (unit("m", Dimension::Length, 1.0), &["m", "meter", "meters", "metre", "metres"]),
  (unit("km", Dimension::Length, 1e3), &["km", "kilometer", "kilometers", "kilometre", "kilometres"]),
  (unit("cm", Dimension::Length, 1e-2), &["cm"]),
  (unit("mm", Dimension::Length, 1e-3), &["mm"]),
  (unit("ft", Dimension::Length, 0.3048), &["ft", "foot", "feet"]),
  // area
  (unit("m2", Dimension::Area, 1.0), &["m2", "sqm", "sq.m"]),
  (unit("km2", Dimension::Area, 1e6), &["km2", "sqkm", "sq.km"]),
  (unit("ha", Dimension::Area, 1e4), &["ha", "hectare", "hectares"]),
  (unit("ft2", Dimension::Area, 0.092_903_04), &["ft2", "sqft", "sq.ft"]),
  (unit("acre", Dimension::Area, 4_046.856_422_4), &["acre", "acres", "ac"]),
  // volume
  (unit("m3", Dimension::Volume, 1.0), &["m3", "cum"]),
  (unit("km3", Dimension::Volume, 1e9), &["km3"]),
  (unit("Mm3", Dimension::Volume, 1e6), &["Mm3"]),
  (unit("L", Dimension::Volume, 1e-3), &["L", "l", "litre", "litres", "liter", "liters"]),
  (unit("ft3", Dimension::Volume, 0.028_316_846_592), &["ft3", "cuft"]),
  (unit("yd3", Dimension::Volume, 0.764_554_857_984), &["yd3", "cuyd"]),
  // mass
  (unit("kg", Dimension::Mass, 1.0), &["kg", "kilogram", "kilograms"]),
  (unit("g", Dimension::Mass, 1e-3), &["g", "gram", "grams"]),
  (unit("t", Dimension::Mass, 1e3), &["t", "mt", "tonne", "tonnes", "ton", "tons"]),
  (unit("kt", Dimension::Mass, 1e6), &["kt", "kilotonne", "kilotonnes"]),
  (unit("Mt", Dimension::Mass, 1e9), &["Mt", "megatonne", "megatonnes"]),
  (unit("lb", Dimension::Mass, 0.453_592_37), &["lb", "lbs", "pound", "pounds"]),
  (unit("oz", Dimension::Mass, 0.031_103_476_8), &["oz", "ozt", "troyoz"]),
];

/// Normalise superscripts and exponent markers: `m²`, `m^2`, `m**2` → `m2`.
fn canonical_token(token: &str) -> String {
  token
    .trim()
    .replace('²', "2")
    .replace('³', "3")
    .replace("**", "")
    .replace('^', "")
    .replace(' ', "")
}

/// Find a unit by symbol or spelled-out name.
pub fn lookup(token: &str) -> Option<Unit> {
  let token = canonical_token(token);
  UNITS
    .iter()
    .find(|(_, names)| names.contains(&token.as_str()))
    .or_else(|| {
      UNITS.iter().find(|(_, names)| {
        names.iter().any(|n| n.eq_ignore_ascii_case(&token))
      })
    })
    .map(|(u, _)| *u)
}

/// Convert `magnitude` from one unit to another.
pub fn convert(magnitude: f64, from: &str, to: &str) -> Result<f64, UnitError> {
  let from_unit = lookup(from).ok_or_else(|| UnitError::Unknown(from.to_owned()))?;
  let to_unit = lookup(to).ok_or_else(|| UnitError::Unknown(to.to_owned()))?;
  if from_unit.dimension != to_unit.dimension {
    return Err(UnitError::Incompatible {
      from: from_unit.symbol,
      to:   to_unit.symbol,
    });
  }
  Ok(magnitude * from_unit.factor / to_unit.factor)
}

// ─── Quantity parsing ────────────────────────────────────────────────────────

/// A magnitude with an optional, not yet validated, unit token.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
  pub magnitude: f64,
  pub unit:      Option<String>,
}

fn quantity_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)(.*)$")
      .expect("quantity regex must compile")
  })
}

fn number_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"[+-]?(?:\d+\.?\d*|\.\d+)").expect("number regex must compile")
  })
}

/// Drop digit-group separators so `"1 000 000"` and `"1,000,000"` read as
/// one number. A separator only counts when it sits between two digits.
fn compact(s: &str) -> String {
  let chars: Vec<char> = s.trim().chars().collect();
  let mut out = String::with_capacity(s.len());
  for (i, &c) in chars.iter().enumerate() {
    let separator = c == ' ' || c == ',' || c == '_';
    let between_digits = i > 0
      && chars[i - 1].is_ascii_digit()
      && chars.get(i + 1).is_some_and(char::is_ascii_digit);
    if !(separator && between_digits) {
      out.push(c);
    }
  }
  out
}

/// Parse `"<number><unit>"`. The unit part may be absent.
///
/// Returns `None` when the text does not start with a number.
pub fn parse_quantity(s: &str) -> Option<Quantity> {
  let compacted = compact(s);
  let caps = quantity_re().captures(&compacted)?;
  let magnitude = caps.get(1)?.as_str().parse::<f64>().ok()?;
  let unit = caps
    .get(2)
    .map(|m| m.as_str().trim())
    .filter(|u| !u.is_empty())
    .map(str::to_owned);
  Some(Quantity { magnitude, unit })
}

/// The first number appearing anywhere in `s`, ignoring everything around
/// it. Used as the last resort on dirty cells such as `"approx. 250 (est)"`.
pub fn extract_number(s: &str) -> Option<f64> {
  let compacted = compact(s);
  number_re()
    .find(&compacted)
    .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: f64, b: f64) -> bool { (a - b).abs() <= 1e-9 * b.abs().max(1.0) }

  #[test]
  fn converts_within_a_dimension() {
    assert!(close(convert(1.0, "km2", "m2").unwrap(), 1e6));
    assert!(close(convert(1e6, "m2", "km2").unwrap(), 1.0));
    assert!(close(convert(50.0, "ha", "km2").unwrap(), 0.5));
    assert!(close(convert(2.0, "Mt", "t").unwrap(), 2e6));
    assert!(close(convert(1.0, "t", "kg").unwrap(), 1000.0));
    assert!(close(convert(1.0, "kg", "oz").unwrap(), 32.150_746_568_627_98));
  }

  #[test]
  fn refuses_cross_dimension_and_unknown_units() {
    assert!(matches!(
      convert(1.0, "m", "kg"),
      Err(UnitError::Incompatible { .. })
    ));
    assert_eq!(
      convert(1.0, "furlong", "m"),
      Err(UnitError::Unknown("furlong".into()))
    );
  }

  #[test]
  fn lookup_accepts_spellings() {
    assert_eq!(lookup("m²").unwrap().symbol, "m2");
    assert_eq!(lookup("m^3").unwrap().symbol, "m3");
    assert_eq!(lookup("Hectares").unwrap().symbol, "ha");
    assert_eq!(lookup("Mt").unwrap().symbol, "Mt");
    assert_eq!(lookup("MT").unwrap().symbol, "t");
    assert_eq!(lookup("KM2").unwrap().symbol, "km2");
  }

  #[test]
  fn parses_quantities() {
    assert_eq!(
      parse_quantity("1km2"),
      Some(Quantity {
        magnitude: 1.0,
        unit:      Some("km2".into()),
      })
    );
    assert_eq!(
      parse_quantity("1 000 000"),
      Some(Quantity {
        magnitude: 1e6,
        unit:      None,
      })
    );
    assert_eq!(parse_quantity("2.5 Mt").unwrap().unit.as_deref(), Some("Mt"));
    assert_eq!(parse_quantity("1e3 m3").unwrap().magnitude, 1000.0);
    assert_eq!(parse_quantity("about 5 ha"), None);
  }

  #[test]
  fn extracts_first_number() {
    assert_eq!(extract_number("approx. 250 (est)"), Some(250.0));
    assert_eq!(extract_number("100m"), Some(100.0));
    assert_eq!(extract_number("50g/L"), Some(50.0));
    assert_eq!(extract_number("1,200.5 tonnes"), Some(1200.5));
    assert_eq!(extract_number("none"), None);
  }
}
