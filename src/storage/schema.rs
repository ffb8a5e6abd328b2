use rusqlite::Connection;

pub mod tables {
    pub const ENTRIES: &str = "entries";

    pub const ALL_TABLES: &[&str] = &[ENTRIES];
}

pub mod columns {
    pub const SEQ: &str = "seq";
    pub const ENTRY_ID: &str = "entry_id";
    pub const NAME: &str = "name";
    pub const CONTENT: &str = "content";
    pub const ADDED_AT: &str = "added_at";
}

pub use columns::*;
pub use tables::*;

// seq keeps insertion order, which is also display order
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL,
    name TEXT NOT NULL,
    content TEXT NOT NULL,
    added_at INTEGER NOT NULL
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
