//! SQLite record store for favicons.
//!
//! Two entity types live here:
//! - **Favicons**: one row per creation request, carrying the generation
//!   status (`PENDING` → `SUCCESS` | `FAILED`) and the content fingerprint
//!   of the source image used for duplicate lookups.
//! - **Assets**: one row per generated variant, pointing at the storage key
//!   that holds its bytes. Deleted together with their favicon.
//!
//! Blob bytes are never stored here; see `aicon-storage`.

mod db;
pub mod error;
pub mod models;
mod repo;

pub use crate::db::{Database, Location};
pub use crate::repo::Repository;
