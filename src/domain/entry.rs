use super::id::EntryId;

/// A validated GPX file held by the track store
#[derive(Debug, Clone, PartialEq)]
pub struct GpxEntry {
    pub id: EntryId,
    /// original file name
    pub name: String,
    /// raw XML text, kept as uploaded
    pub content: String,
    /// seconds since unix epoch
    pub added_at: i64,
}

impl GpxEntry {
    pub fn new(name: impl Into<String>, content: impl Into<String>, added_at: i64) -> Self {
        let name = name.into();
        let content = content.into();
        Self {
            id: EntryId::generate(&name, &content),
            name,
            content,
            added_at,
        }
    }
}
