//! DDL for the SQLite mine inventory.

/// Full schema applied on every open. All statements are idempotent.
///
/// Child collections carry a `position` column so lists come back in the
/// order they were written. At most one default facility per mine and one
/// default impoundment per facility is enforced by partial unique indexes, as
/// is the uniqueness of named facility and impoundment identifiers. A default
/// facility shares its mine's identifier and is left out of that rule.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS mines (
  site_id       TEXT PRIMARY KEY NOT NULL,
  jurisdiction  TEXT NOT NULL,
  name          TEXT NOT NULL,
  location_json TEXT NOT NULL,
  details_json  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS facilities (
  facility_id  TEXT PRIMARY KEY NOT NULL,
  mine_site_id TEXT NOT NULL REFERENCES mines(site_id),
  site_id      TEXT,
  name         TEXT NOT NULL,
  is_default   INTEGER NOT NULL,
  position     INTEGER NOT NULL,
  attrs_json   TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS facilities_one_default
  ON facilities(mine_site_id) WHERE is_default = 1;
CREATE INDEX IF NOT EXISTS facilities_site_id ON facilities(site_id);
CREATE UNIQUE INDEX IF NOT EXISTS facilities_named_site_id
  ON facilities(site_id) WHERE is_default = 0 AND site_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS mine_facilities (
  mine_site_id TEXT NOT NULL REFERENCES mines(site_id),
  facility_id  TEXT NOT NULL REFERENCES facilities(facility_id),
  position     INTEGER NOT NULL,
  PRIMARY KEY (mine_site_id, facility_id)
);

CREATE TABLE IF NOT EXISTS impoundments (
  impoundment_id TEXT PRIMARY KEY NOT NULL,
  facility_id    TEXT NOT NULL REFERENCES facilities(facility_id),
  site_id        TEXT,
  name           TEXT NOT NULL,
  is_default     INTEGER NOT NULL,
  position       INTEGER NOT NULL,
  attrs_json     TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS impoundments_one_default
  ON impoundments(facility_id) WHERE is_default = 1;
CREATE UNIQUE INDEX IF NOT EXISTS impoundments_site_id
  ON impoundments(site_id) WHERE site_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS commodities (
  mine_site_id TEXT NOT NULL REFERENCES mines(site_id),
  position     INTEGER NOT NULL,
  symbol       TEXT NOT NULL,
  record_json  TEXT NOT NULL,
  UNIQUE (mine_site_id, symbol)
);

CREATE TABLE IF NOT EXISTS aliases (
  mine_site_id TEXT NOT NULL REFERENCES mines(site_id),
  position     INTEGER NOT NULL,
  name         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS owners (
  owner_id TEXT PRIMARY KEY NOT NULL,
  name     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS owner_associations (
  mine_site_id TEXT NOT NULL REFERENCES mines(site_id),
  position     INTEGER NOT NULL,
  owner_id     TEXT NOT NULL REFERENCES owners(owner_id),
  is_current   INTEGER NOT NULL,
  start_year   INTEGER,
  end_year     INTEGER
);

CREATE TABLE IF NOT EXISTS site_references (
  mine_site_id TEXT NOT NULL REFERENCES mines(site_id),
  position     INTEGER NOT NULL,
  source       TEXT NOT NULL,
  source_id    TEXT,
  link         TEXT
);

CREATE TABLE IF NOT EXISTS orebodies (
  mine_site_id TEXT NOT NULL REFERENCES mines(site_id),
  position     INTEGER NOT NULL,
  ore_type     TEXT,
  ore_class    TEXT,
  minerals     TEXT
);

PRAGMA user_version = 1;
";
