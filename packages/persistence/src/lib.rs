#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Durable storage for the explore ledger.
//!
//! The ledger is stored under a single key as a JSON array of
//! `{latitude, longitude}` records. [`KeyValueStore`] abstracts the backing
//! store, [`PersistenceWriter`] coalesces foreground writes and handles
//! deletes, and [`load_ledger`] hydrates at startup.

pub mod codec;
pub mod store;
pub mod writer;

use fog_map_geography_models::Coordinate;

pub use codec::{decode_ledger, encode_ledger, encode_snapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use writer::PersistenceWriter;

/// Key the explore ledger is stored under.
pub const EXPLORE_LEDGER_KEY: &str = "visitedLocations";

/// Errors from the durable store or the ledger codec.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Stored bytes are not a valid ledger.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Key cannot be mapped onto the backing store.
    #[error("Invalid store key {key:?}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },
}

/// Reads the persisted explore ledger.
///
/// A missing record hydrates to an empty ledger. So does a record that
/// cannot be read or decoded; the failure is logged and the stored bytes
/// are left alone until the next successful write replaces them.
#[must_use]
pub fn load_ledger(store: &dyn KeyValueStore) -> Vec<Coordinate> {
    let bytes = match store.get(EXPLORE_LEDGER_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            log::debug!("No persisted explore ledger, starting empty");
            return Vec::new();
        }
        Err(e) => {
            log::warn!("Failed to read persisted explore ledger, starting empty: {e}");
            return Vec::new();
        }
    };

    match decode_ledger(&bytes) {
        Ok(points) => {
            log::info!("Loaded {} persisted explore points", points.len());
            points
        }
        Err(e) => {
            log::warn!(
                "Persisted explore ledger is corrupt ({} bytes), starting empty: {e}",
                bytes.len()
            );
            Vec::new()
        }
    }
}
