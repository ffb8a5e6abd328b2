use anyhow::anyhow;
use rusqlite::{Connection, params};

use crate::{
    config,
    domain::{entry::GpxEntry, id::EntryId},
    storage::{
        db,
        error::StoreError,
        schema::{columns::*, tables::*},
    },
};

/// Ordered list of loaded GPX entries; insertion order is display order.
///
/// The list itself is always held in memory. When a database connection is
/// attached every mutation is written through to it, and the list is
/// restored from it on startup.
pub struct TrackStore {
    entries: Vec<GpxEntry>,
    pub(crate) db: Option<Connection>,
}

impl TrackStore {
    pub fn new_in_memory() -> Self {
        Self {
            entries: Vec::new(),
            db: None,
        }
    }

    pub fn open(config: &config::Database) -> Result<Self, StoreError> {
        if config.in_memory {
            return Ok(Self::new_in_memory());
        }
        let conn = db::open(config)?;
        Self::from_existing_conn(conn)
    }

    /// Attaches to an initialized connection and loads the entries it holds
    pub fn from_existing_conn(db: Connection) -> Result<Self, StoreError> {
        let entries = Self::load_entries(&db)?;
        log::debug!("restored {} entries from database", entries.len());
        Ok(Self {
            entries,
            db: Some(db),
        })
    }

    fn load_entries(db: &Connection) -> Result<Vec<GpxEntry>, StoreError> {
        let mut stmt = db.prepare(&format!(
            "SELECT {ENTRY_ID}, {NAME}, {CONTENT}, {ADDED_AT} FROM {ENTRIES} ORDER BY {SEQ}"
        ))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, content, added_at)| -> Result<GpxEntry, StoreError> {
                let id = EntryId::from_hex(&id)
                    .map_err(|e| anyhow!("table {ENTRIES} contains invalid id {id}: {e}"))?;
                Ok(GpxEntry {
                    id,
                    name,
                    content,
                    added_at,
                })
            })
            .collect()
    }

    pub fn push(&mut self, entry: GpxEntry) -> Result<(), StoreError> {
        if let Some(db) = &self.db {
            db.execute(
                &format!(
                    "INSERT INTO {ENTRIES} ({ENTRY_ID}, {NAME}, {CONTENT}, {ADDED_AT}) VALUES (?1, ?2, ?3, ?4)"
                ),
                params![entry.id.to_hex(), entry.name, entry.content, entry.added_at],
            )?;
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Removes the entry at `index`. Returns `Ok(None)` if there is none.
    pub fn remove(&mut self, index: usize) -> Result<Option<GpxEntry>, StoreError> {
        let Some(entry) = self.entries.get(index) else {
            return Ok(None);
        };

        if let Some(db) = &self.db {
            // ids may collide, so delete a single row: the one at the same position
            db.execute(
                &format!(
                    "DELETE FROM {ENTRIES} WHERE {SEQ} = (
                        SELECT {SEQ} FROM {ENTRIES} ORDER BY {SEQ} LIMIT 1 OFFSET ?1
                    ) AND {ENTRY_ID} = ?2"
                ),
                params![index as i64, entry.id.to_hex()],
            )?;
        }
        Ok(Some(self.entries.remove(index)))
    }

    pub fn get(&self, index: usize) -> Option<&GpxEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GpxEntry> {
        self.entries.iter()
    }
}
