//! Persisted data model and its storage adapter.
//! The basic idea is:
//!  - The whole store is one JSON document, a mapping from local day keys
//!    (`YYYY-MM-DD`) to day records.
//!  - A day record carries the accumulated total and the chronological list of
//!    focus sessions for that day.
//!  - The document is reloaded before and written back after every mutation,
//!    so a second uncoordinated instance sees last-write-wins behavior.

pub mod adapter;
pub mod entities;

/// File the store is persisted under, inside the application state directory.
/// The `v2` suffix versions the serialized layout.
pub const STORE_FILE_NAME: &str = "st_data_v2.json";
