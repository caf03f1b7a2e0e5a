//! Store snapshot persistence
//!
//! Lets a host warm-start the engine from the last in-memory state. This is
//! an export of the store, not the history backend.

use crate::{storage::conversation_store::StoreSnapshot, Error, Result};
use std::path::Path;

impl StoreSnapshot {
    /// Save the snapshot as pretty-printed JSON
    ///
    /// # Errors
    /// Returns an error if serialization or the file write fails
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| Error::Storage(format!("Failed to write snapshot file: {}", e)))?;
        Ok(())
    }

    /// Load a JSON snapshot
    ///
    /// # Returns
    /// The loaded snapshot, or an empty one if the file doesn't exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path_ref)
            .map_err(|e| Error::Storage(format!("Failed to read snapshot file: {}", e)))?;

        let snapshot: StoreSnapshot = serde_json::from_str(&json)?;
        Ok(snapshot)
    }

    /// Save the snapshot in CBOR format (more compact)
    pub fn save_cbor<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let cbor = serde_cbor::to_vec(self)
            .map_err(|e| Error::CborSerialization(format!("Failed to serialize snapshot: {}", e)))?;
        std::fs::write(path, cbor)
            .map_err(|e| Error::Storage(format!("Failed to write snapshot file: {}", e)))?;
        Ok(())
    }

    /// Load a CBOR snapshot, or an empty one if the file doesn't exist
    pub fn load_cbor<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Ok(Self::default());
        }

        let cbor = std::fs::read(path_ref)
            .map_err(|e| Error::Storage(format!("Failed to read snapshot file: {}", e)))?;

        serde_cbor::from_slice(&cbor).map_err(|e| {
            Error::CborSerialization(format!("Failed to deserialize snapshot: {}", e))
        })
    }
}
