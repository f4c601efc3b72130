use crate::layout::StoreLayout;
use crate::node::{Node, Values};
use crate::StoreError;
use netcam_schema::{default_friendly_name, validate_camera_id, CameraDefinition, CameraId, Resolution};
use std::collections::HashSet;
use std::io;
use tracing::{debug, info, warn};

pub const URL_VALUE: &str = "URL";
pub const WIDTH_VALUE: &str = "Width";
pub const HEIGHT_VALUE: &str = "Height";
pub const FRIENDLY_NAME_VALUE: &str = "FriendlyName";
pub const ENABLED_VALUE: &str = "Enabled";

/// Read access to camera definitions.
///
/// The registration index, the activation handler and the lifecycle manager
/// only ever read; they take this trait so tests can substitute the store.
pub trait DefinitionSource: Send + Sync {
    /// Every stored definition, in store enumeration order.
    fn list_all(&self) -> Result<Vec<CameraDefinition>, StoreError>;

    fn get(&self, camera_id: &str) -> Result<CameraDefinition, StoreError>;
}

/// Camera definitions persisted as one node per camera under `Cameras/`.
pub struct CameraStore {
    layout: StoreLayout,
}

impl CameraStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    fn root(&self) -> Node {
        Node::open(self.layout.cameras_dir())
    }

    /// Replace every stored definition with `definitions`.
    ///
    /// Ids are validated before anything is touched. After that the whole
    /// `Cameras/` tree is deleted and one node per definition is recreated in
    /// order. A failure part way leaves only the definitions written before it,
    /// plus the node that failed, and is reported as [`StoreError::SaveFailed`].
    pub fn save_all(&self, definitions: &[CameraDefinition]) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for def in definitions {
            validate_camera_id(&def.id)?;
            if !seen.insert(def.id.as_str()) {
                return Err(StoreError::DuplicateCameraId(def.id.to_string()));
            }
        }

        self.layout.initialize()?;

        let root = self.root();
        root.delete_tree().map_err(StoreError::ClearFailed)?;
        if definitions.is_empty() {
            info!("all camera definitions removed");
            return Ok(());
        }

        for def in definitions {
            let node = root.child(&def.id);
            let save_failed = |source: io::Error| StoreError::SaveFailed {
                id: def.id.to_string(),
                source,
            };
            node.create().map_err(save_failed)?;
            node.write_values(&encode(def)).map_err(save_failed)?;
            debug!("saved camera '{}'", def.id);
        }

        info!("saved {} camera definitions", definitions.len());
        Ok(())
    }

    /// Ids of all stored definitions.
    pub fn ids(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .map(|d| d.id.into_inner())
            .collect())
    }

    pub fn exists(&self, camera_id: &str) -> bool {
        self.root().child(camera_id).exists()
    }

    /// Like [`DefinitionSource::list_all`], also returning the names of the
    /// nodes that could not be read. A following [`save_all`](Self::save_all)
    /// built from the listing drops those nodes.
    pub fn list_with_skipped(&self) -> Result<(Vec<CameraDefinition>, Vec<String>), StoreError> {
        let root = self.root();
        let names = match root.children() {
            Ok(names) => names,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), Vec::new())),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut results = Vec::with_capacity(names.len());
        let mut skipped = Vec::new();
        for name in names {
            match root.child(&name).values() {
                Ok(values) => results.push(decode(CameraId::new(name), &values)),
                Err(e) => {
                    warn!("skipping unreadable camera node '{name}': {e}");
                    skipped.push(name);
                }
            }
        }
        Ok((results, skipped))
    }
}

impl DefinitionSource for CameraStore {
    /// A missing `Cameras/` container reads as no cameras. Nodes that vanish or
    /// cannot be read during enumeration are skipped.
    fn list_all(&self) -> Result<Vec<CameraDefinition>, StoreError> {
        self.list_with_skipped().map(|(defs, _)| defs)
    }

    fn get(&self, camera_id: &str) -> Result<CameraDefinition, StoreError> {
        let node = self.root().child(camera_id);
        if !node.exists() {
            return Err(StoreError::CameraNotFound(camera_id.to_owned()));
        }
        let values = node.values()?;
        Ok(decode(CameraId::new(camera_id), &values))
    }
}

fn encode(def: &CameraDefinition) -> Values {
    let mut values = Values::new();
    values
        .set_sz(URL_VALUE, def.url.as_str())
        .set_dword(WIDTH_VALUE, def.width)
        .set_dword(HEIGHT_VALUE, def.height)
        .set_sz(FRIENDLY_NAME_VALUE, def.friendly_name.as_str())
        .set_dword(ENABLED_VALUE, u32::from(def.enabled));
    values
}

/// Build a definition from node values, substituting defaults for anything missing.
fn decode(id: CameraId, values: &Values) -> CameraDefinition {
    let (default_width, default_height) = Resolution::default().dimensions();
    CameraDefinition {
        url: values.sz(URL_VALUE).unwrap_or_default().to_owned(),
        width: values.dword(WIDTH_VALUE).unwrap_or(default_width),
        height: values.dword(HEIGHT_VALUE).unwrap_or(default_height),
        friendly_name: values
            .sz(FRIENDLY_NAME_VALUE)
            .map_or_else(|| default_friendly_name(&id), str::to_owned),
        enabled: values.dword(ENABLED_VALUE).map_or(true, |v| v != 0),
        id,
    }
}
