//! Persistent configuration store for NetCam.
//!
//! This crate provides the storage layer shared by every NetCam process: a
//! hierarchical key/value tree on disk (`Node`), the `CameraStore` holding one
//! node per camera definition, the `DefinitionSource` read seam consumed by the
//! registration index and the lifecycle manager, and the `ClassRegistry` that
//! records which class identities are registered with which module.
//!
//! The store carries no locking or versioning between processes. Readers must
//! tolerate entries that disappear or are half-written while an editor saves.

pub mod cameras;
pub mod classes;
pub mod layout;
pub mod node;

pub use cameras::{CameraStore, DefinitionSource};
pub use classes::{ClassRegistration, ClassRegistry, THREADING_MODEL};
pub use layout::{StoreLayout, STORE_FORMAT_VERSION};
pub use node::{Node, Value, Values};

use netcam_schema::SchemaError;
use std::path::Path;
use thiserror::Error;

/// Hint shown to operators whenever the store cannot be written or read.
pub const ELEVATION_HINT: &str = "run with elevated privileges";

/// Fsync a directory so a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("camera not found: {0}")]
    CameraNotFound(String),
    #[error("duplicate camera id: {0}")]
    DuplicateCameraId(String),
    #[error("failed to save camera '{id}': {source}")]
    SaveFailed {
        id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to clear camera definitions: {0}")]
    ClearFailed(#[source] std::io::Error),
    #[error("class not registered: {0}")]
    ClassNotRegistered(String),
    #[error("store format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

impl StoreError {
    /// Actionable advice for errors an operator can fix by changing privileges.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            StoreError::SaveFailed { .. } | StoreError::ClearFailed(_) => Some(ELEVATION_HINT),
            StoreError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Some(ELEVATION_HINT)
            }
            _ => None,
        }
    }
}
