use std::fmt::Display;

use serde::Serialize;

use crate::storage::{db::i64_seconds_to_local_time, track_store::TrackStore};

pub const EMPTY_STATE: &str = "No GPX files loaded yet";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub added_at: i64,
}

/// What the user sees as the list of loaded files.
///
/// Always rebuilt from the whole store, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListView {
    pub items: Vec<ListItem>,
    pub empty_state: Option<String>,
}

impl ListView {
    pub fn build(store: &TrackStore) -> Self {
        let items = store
            .iter()
            .enumerate()
            .map(|(index, entry)| ListItem {
                index,
                id: entry.id.to_hex(),
                name: entry.name.clone(),
                added_at: entry.added_at,
            })
            .collect::<Vec<_>>();
        let empty_state = items.is_empty().then(|| EMPTY_STATE.to_string());
        Self { items, empty_state }
    }
}

impl Display for ListView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(empty) = &self.empty_state {
            return writeln!(f, "{empty}");
        }
        for item in &self.items {
            match i64_seconds_to_local_time(item.added_at) {
                Ok(added) => writeln!(
                    f,
                    "[{}] {} (added {})",
                    item.index,
                    item.name,
                    added.format("%Y-%m-%d %H:%M")
                )?,
                Err(_) => writeln!(f, "[{}] {}", item.index, item.name)?,
            }
        }
        Ok(())
    }
}
