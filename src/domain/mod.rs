pub mod entry;
pub mod geo;
pub mod id;
