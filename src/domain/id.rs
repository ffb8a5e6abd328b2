use std::{
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use blake3::Hash;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier of a stored GPX entry.
///
/// Generated from the current time, a process-wide counter and the file
/// itself. Uniqueness is not checked anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub Hash);

impl EntryId {
    pub fn generate(name: &str, content: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);

        let mut hasher = blake3::Hasher::new();
        hasher.update(&nanos.to_le_bytes());
        hasher.update(&seq.to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(content.as_bytes());
        Self(hasher.finalize())
    }

    #[cfg(test)]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    pub fn from_hex(hex: &str) -> anyhow::Result<Self> {
        Ok(Self(Hash::from_hex(hex)?))
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
