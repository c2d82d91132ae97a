//! [`SqliteStore`]: the SQLite implementation of [`MineStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use cmti_core::{
  facility::{Designation, Impoundment, TailingsFacility},
  identifier::SiteId,
  mine::{Mine, Orebody, Reference},
  store::{FacilityRef, MineStore},
};

use crate::{
  Error, Result,
  encode::{
    EncodedFacility, EncodedImpoundment, EncodedMine, OwnerRow, RawFacility,
    RawMine, decode_site_id, decode_uuid, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A mine inventory backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// Next free `position` among the children of `key` in `table`.
fn next_position(
  conn: &rusqlite::Connection,
  table: &str,
  parent_column: &str,
  key: &str,
) -> rusqlite::Result<i64> {
  conn.query_row(
    &format!(
      "SELECT COALESCE(MAX(position) + 1, 0) FROM {table} WHERE {parent_column} = ?1"
    ),
    [key],
    |row| row.get(0),
  )
}

fn write_impoundment(
  conn: &rusqlite::Connection,
  facility_id: &str,
  position: i64,
  imp: &EncodedImpoundment,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO impoundments
       (impoundment_id, facility_id, site_id, name, is_default, position, attrs_json)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      imp.impoundment_id,
      facility_id,
      imp.site_id,
      imp.name,
      imp.is_default,
      position,
      imp.attrs_json,
    ],
  )?;
  Ok(())
}

fn write_facility(
  conn: &rusqlite::Connection,
  mine_site_id: &str,
  position: i64,
  facility: &EncodedFacility,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO facilities
       (facility_id, mine_site_id, site_id, name, is_default, position, attrs_json)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      facility.facility_id,
      mine_site_id,
      facility.site_id,
      facility.name,
      facility.is_default,
      position,
      facility.attrs_json,
    ],
  )?;
  for (i, imp) in facility.impoundments.iter().enumerate() {
    write_impoundment(conn, &facility.facility_id, i as i64, imp)?;
  }
  for (i, mine) in facility.associated_mines.iter().enumerate() {
    write_association(conn, mine, &facility.facility_id, i as i64)?;
  }
  Ok(())
}

fn write_association(
  conn: &rusqlite::Connection,
  mine_site_id: &str,
  facility_id: &str,
  position: i64,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO mine_facilities (mine_site_id, facility_id, position)
     VALUES (?1, ?2, ?3)",
    rusqlite::params![mine_site_id, facility_id, position],
  )?;
  Ok(())
}

fn associations_of(
  conn: &rusqlite::Connection,
  facility_id: &str,
) -> rusqlite::Result<Vec<String>> {
  collect_rows(
    conn,
    "SELECT mine_site_id FROM mine_facilities
     WHERE facility_id = ?1 ORDER BY position",
    facility_id,
    |row| row.get(0),
  )
}

fn write_mine(conn: &rusqlite::Connection, mine: &EncodedMine) -> rusqlite::Result<()> {
  let key = mine.site_id.as_str();

  conn.execute(
    "INSERT INTO mines (site_id, jurisdiction, name, location_json, details_json)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      key,
      mine.jurisdiction,
      mine.name,
      mine.location_json,
      mine.details_json,
    ],
  )?;

  for (i, facility) in mine.facilities.iter().enumerate() {
    write_facility(conn, key, i as i64, facility)?;
  }

  for (i, (symbol, record_json)) in mine.commodities.iter().enumerate() {
    conn.execute(
      "INSERT INTO commodities (mine_site_id, position, symbol, record_json)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![key, i as i64, symbol, record_json],
    )?;
  }

  for (i, name) in mine.aliases.iter().enumerate() {
    conn.execute(
      "INSERT INTO aliases (mine_site_id, position, name) VALUES (?1, ?2, ?3)",
      rusqlite::params![key, i as i64, name],
    )?;
  }

  for (i, owner) in mine.owners.iter().enumerate() {
    // Owners resolved by name are shared between mines.
    conn.execute(
      "INSERT OR IGNORE INTO owners (owner_id, name) VALUES (?1, ?2)",
      rusqlite::params![owner.owner_id, owner.name],
    )?;
    conn.execute(
      "INSERT INTO owner_associations
         (mine_site_id, position, owner_id, is_current, start_year, end_year)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      rusqlite::params![
        key,
        i as i64,
        owner.owner_id,
        owner.is_current,
        owner.start_year,
        owner.end_year,
      ],
    )?;
  }

  for (i, reference) in mine.references.iter().enumerate() {
    conn.execute(
      "INSERT INTO site_references (mine_site_id, position, source, source_id, link)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        key,
        i as i64,
        reference.source,
        reference.source_id,
        reference.link,
      ],
    )?;
  }

  for (i, orebody) in mine.orebodies.iter().enumerate() {
    conn.execute(
      "INSERT INTO orebodies (mine_site_id, position, ore_type, ore_class, minerals)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        key,
        i as i64,
        orebody.ore_type,
        orebody.ore_class,
        orebody.minerals,
      ],
    )?;
  }

  Ok(())
}

fn mine_exists(conn: &rusqlite::Connection, site_id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM mines WHERE site_id = ?1", [site_id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

/// Run `sql` with a single key parameter and collect every mapped row.
fn collect_rows<T>(
  conn: &rusqlite::Connection,
  sql: &str,
  key: &str,
  map: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map([key], map)?.collect::<rusqlite::Result<Vec<_>>>();
  rows
}

fn load_mine(
  conn: &rusqlite::Connection,
  site_id: &str,
) -> rusqlite::Result<Option<RawMine>> {
  let head = conn
    .query_row(
      "SELECT site_id, jurisdiction, name, location_json, details_json
       FROM mines WHERE site_id = ?1",
      [site_id],
      |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, String>(3)?,
          row.get::<_, String>(4)?,
        ))
      },
    )
    .optional()?;
  let Some((site_id, jurisdiction, name, location_json, details_json)) = head
  else {
    return Ok(None);
  };

  let facility_rows = collect_rows(
    conn,
    "SELECT facility_id, attrs_json FROM facilities
     WHERE mine_site_id = ?1 ORDER BY is_default DESC, position",
    &site_id,
    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
  )?;
  let mut facilities = Vec::with_capacity(facility_rows.len());
  for (facility_id, attrs_json) in facility_rows {
    let impoundments = collect_rows(
      conn,
      "SELECT attrs_json FROM impoundments
       WHERE facility_id = ?1 ORDER BY is_default DESC, position",
      &facility_id,
      |row| row.get(0),
    )?;
    let associated_mines = associations_of(conn, &facility_id)?;
    facilities.push(RawFacility {
      attrs_json,
      associated_mines,
      impoundments,
    });
  }

  let commodities = collect_rows(
    conn,
    "SELECT record_json FROM commodities WHERE mine_site_id = ?1 ORDER BY position",
    &site_id,
    |row| row.get(0),
  )?;

  let aliases = collect_rows(
    conn,
    "SELECT name FROM aliases WHERE mine_site_id = ?1 ORDER BY position",
    &site_id,
    |row| row.get(0),
  )?;

  let owners = collect_rows(
    conn,
    "SELECT o.owner_id, o.name, a.is_current, a.start_year, a.end_year
     FROM owner_associations a JOIN owners o ON o.owner_id = a.owner_id
     WHERE a.mine_site_id = ?1 ORDER BY a.position",
    &site_id,
    |row| {
      Ok(OwnerRow {
        owner_id:   row.get(0)?,
        name:       row.get(1)?,
        is_current: row.get(2)?,
        start_year: row.get(3)?,
        end_year:   row.get(4)?,
      })
    },
  )?;

  let references = collect_rows(
    conn,
    "SELECT source, source_id, link FROM site_references
     WHERE mine_site_id = ?1 ORDER BY position",
    &site_id,
    |row| {
      Ok(Reference {
        source:    row.get(0)?,
        source_id: row.get(1)?,
        link:      row.get(2)?,
      })
    },
  )?;

  let orebodies = collect_rows(
    conn,
    "SELECT ore_type, ore_class, minerals FROM orebodies
     WHERE mine_site_id = ?1 ORDER BY position",
    &site_id,
    |row| {
      Ok(Orebody {
        ore_type:  row.get(0)?,
        ore_class: row.get(1)?,
        minerals:  row.get(2)?,
      })
    },
  )?;

  Ok(Some(RawMine {
    site_id,
    jurisdiction,
    name,
    location_json,
    details_json,
    facilities,
    commodities,
    aliases,
    owners,
    references,
    orebodies,
  }))
}

/// What an association attempt found inside its transaction.
enum Link {
  Added,
  NoMine,
  NoFacility,
  Owned,
}

// ─── MineStore impl ──────────────────────────────────────────────────────────

impl MineStore for SqliteStore {
  type Error = Error;

  async fn insert_mine(&self, mine: Mine) -> Result<()> {
    let encoded = EncodedMine::new(&mine)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        write_mine(&tx, &encoded)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      site_id = %mine.site_id,
      facilities = mine.facilities.len(),
      "inserted mine"
    );
    Ok(())
  }

  async fn attach_facility(
    &self,
    mine_id: SiteId,
    facility: TailingsFacility,
  ) -> Result<()> {
    let encoded = EncodedFacility::new(&facility)?;
    let mine_key = mine_id.to_string();

    // Index into [owner, associated...] of the first mine that is missing.
    let missing = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let wanted = std::iter::once(&mine_key).chain(&encoded.associated_mines);
        for (i, key) in wanted.enumerate() {
          if !mine_exists(&tx, key)? {
            return Ok(Some(i));
          }
        }
        let position = next_position(&tx, "facilities", "mine_site_id", &mine_key)?;
        write_facility(&tx, &mine_key, position, &encoded)?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    if let Some(i) = missing {
      let absent = match i {
        0 => mine_id,
        i => facility.associated_mines[i - 1],
      };
      return Err(Error::MineNotFound(absent));
    }
    tracing::debug!(mine = %mine_id, facility = %facility.name, "attached facility");
    Ok(())
  }

  async fn associate_facility(&self, mine_id: SiteId, facility_id: Uuid) -> Result<()> {
    let mine_key = mine_id.to_string();
    let facility_key = encode_uuid(facility_id);

    let link = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !mine_exists(&tx, &mine_key)? {
          return Ok(Link::NoMine);
        }
        let owner: Option<String> = tx
          .query_row(
            "SELECT mine_site_id FROM facilities WHERE facility_id = ?1",
            [&facility_key],
            |row| row.get(0),
          )
          .optional()?;
        match owner {
          None => return Ok(Link::NoFacility),
          Some(owner) if owner == mine_key => return Ok(Link::Owned),
          Some(_) => {}
        }
        let position =
          next_position(&tx, "mine_facilities", "facility_id", &facility_key)?;
        write_association(&tx, &mine_key, &facility_key, position)?;
        tx.commit()?;
        Ok(Link::Added)
      })
      .await?;

    match link {
      Link::Added => {
        tracing::debug!(mine = %mine_id, %facility_id, "associated facility");
        Ok(())
      }
      Link::NoMine => Err(Error::MineNotFound(mine_id)),
      Link::NoFacility => Err(Error::FacilityNotFound(facility_id)),
      Link::Owned => Err(Error::Integrity(format!(
        "facility {facility_id} already belongs to mine {mine_id}"
      ))),
    }
  }

  async fn attach_impoundment(
    &self,
    facility_id: Uuid,
    impoundment: Impoundment,
  ) -> Result<()> {
    let encoded = EncodedImpoundment::new(&impoundment)?;
    let facility_key = encode_uuid(facility_id);

    let attached = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM facilities WHERE facility_id = ?1",
            [&facility_key],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(false);
        }
        let position =
          next_position(&tx, "impoundments", "facility_id", &facility_key)?;
        write_impoundment(&tx, &facility_key, position, &encoded)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !attached {
      return Err(Error::FacilityNotFound(facility_id));
    }
    tracing::debug!(
      %facility_id,
      impoundment = %impoundment.name,
      "attached impoundment"
    );
    Ok(())
  }

  async fn get_mine(&self, id: SiteId) -> Result<Option<Mine>> {
    let key = id.to_string();
    let raw = self.conn.call(move |conn| Ok(load_mine(conn, &key)?)).await?;
    raw.map(RawMine::into_mine).transpose()
  }

  async fn find_facility(&self, id: SiteId) -> Result<Option<FacilityRef>> {
    let key = id.to_string();

    let raw: Option<(String, String, String, bool, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let head: Option<(String, String, String, bool)> = conn
          .query_row(
            "SELECT facility_id, mine_site_id, name, is_default FROM facilities
             WHERE site_id = ?1 ORDER BY is_default ASC, position LIMIT 1",
            [&key],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
          )
          .optional()?;
        let Some((facility_id, mine_id, name, is_default)) = head else {
          return Ok(None);
        };
        let associated = associations_of(conn, &facility_id)?;
        Ok(Some((facility_id, mine_id, name, is_default, associated)))
      })
      .await?;

    raw
      .map(|(facility_id, mine_id, name, is_default, associated)| {
        Ok(FacilityRef {
          facility_id: decode_uuid(&facility_id)?,
          mine_id: decode_site_id(&mine_id)?,
          associated_mines: associated
            .iter()
            .map(|id| decode_site_id(id))
            .collect::<Result<Vec<_>>>()?,
          name,
          designation: if is_default {
            Designation::Default
          } else {
            Designation::Named
          },
        })
      })
      .transpose()
  }

  async fn list_mines(&self) -> Result<Vec<Mine>> {
    let raws: Vec<RawMine> = self
      .conn
      .call(|conn| {
        let keys = {
          let mut stmt = conn.prepare("SELECT site_id FROM mines ORDER BY site_id")?;
          let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          keys
        };
        let mut raws = Vec::with_capacity(keys.len());
        for key in keys {
          if let Some(raw) = load_mine(conn, &key)? {
            raws.push(raw);
          }
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawMine::into_mine).collect()
  }

  async fn site_ids(&self) -> Result<Vec<SiteId>> {
    let keys: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT site_id FROM mines
           UNION SELECT site_id FROM facilities WHERE site_id IS NOT NULL
           UNION SELECT site_id FROM impoundments WHERE site_id IS NOT NULL
           ORDER BY 1",
        )?;
        let keys = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
      })
      .await?;

    keys.iter().map(|k| decode_site_id(k)).collect()
  }
}
