use crate::StoreError;
use netcam_schema::ClassIdentity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Current store format version. Incremented on incompatible layout changes.
pub const STORE_FORMAT_VERSION: u32 = 1;
const VERSION_FILE: &str = "version";

/// Directory layout of the NetCam configuration store.
///
/// `Cameras/<id>` holds one node per camera definition, `Classes/{GUID}` one
/// node per registered class identity, and `Sessions/{GUID}` the cameras a
/// session backend currently has active.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreVersion {
    format_version: u32,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn cameras_dir(&self) -> PathBuf {
        self.root.join("Cameras")
    }

    #[inline]
    pub fn camera_node(&self, camera_id: &str) -> PathBuf {
        self.cameras_dir().join(camera_id)
    }

    #[inline]
    pub fn classes_dir(&self) -> PathBuf {
        self.root.join("Classes")
    }

    #[inline]
    pub fn class_node(&self, identity: &ClassIdentity) -> PathBuf {
        self.classes_dir().join(identity.to_string())
    }

    #[inline]
    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("Sessions")
    }

    #[inline]
    pub fn version_file(&self) -> PathBuf {
        self.root.join(VERSION_FILE)
    }

    /// Create the store root and write the format marker if it is missing.
    ///
    /// Container directories are created lazily by the writers that need them.
    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;

        let version_path = self.version_file();
        if version_path.exists() {
            return self.verify_version();
        }

        let ver = StoreVersion {
            format_version: STORE_FORMAT_VERSION,
        };
        let content = serde_json::to_string_pretty(&ver)?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&version_path)
            .map_err(|e| StoreError::Io(e.error))?;
        crate::fsync_dir(&self.root)?;
        Ok(())
    }

    pub fn verify_version(&self) -> Result<(), StoreError> {
        let content = fs::read_to_string(self.version_file())?;
        let ver: StoreVersion = serde_json::from_str(&content)?;

        if ver.format_version != STORE_FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_FORMAT_VERSION,
                found: ver.format_version,
            });
        }
        Ok(())
    }
}
