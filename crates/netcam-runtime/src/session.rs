use crate::backend::{ActiveCamera, CameraSpec, CameraStatus, VirtualCameraBackend};
use crate::RuntimeError;
use netcam_schema::ClassIdentity;
use netcam_store::{ClassRegistry, Node, StoreLayout, Values};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

const CAMERA_ID_VALUE: &str = "CameraId";
const FRIENDLY_NAME_VALUE: &str = "FriendlyName";
const PID_VALUE: &str = "Pid";
const STATE_VALUE: &str = "State";
const REGISTERED_AT_VALUE: &str = "RegisteredAt";
const STARTED_AT_VALUE: &str = "StartedAt";

const STATE_REGISTERED: &str = "registered";
const STATE_RUNNING: &str = "running";

/// Session registrations recorded as `Sessions/{GUID}` nodes in the store.
///
/// A camera can only be registered once its class identity has been
/// registered with `netcam register`. The session lasts until `remove` or
/// until the owning process dies; nodes left behind by a dead process are
/// treated as stale and replaced.
pub struct SessionBackend {
    layout: StoreLayout,
    registry: ClassRegistry,
    next_token: AtomicU64,
}

impl SessionBackend {
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            registry: ClassRegistry::new(layout.clone()),
            layout,
            next_token: AtomicU64::new(1),
        }
    }

    fn session_node(&self, identity: &ClassIdentity) -> Node {
        Node::open(self.layout.sessions_dir().join(identity.to_string()))
    }

    fn owner_alive(values: &Values) -> bool {
        match values.dword(PID_VALUE) {
            Some(pid) if pid == std::process::id() => true,
            Some(pid) => Path::new(&format!("/proc/{pid}")).exists(),
            None => false,
        }
    }
}

impl VirtualCameraBackend for SessionBackend {
    fn name(&self) -> &'static str {
        "session"
    }

    fn available(&self) -> bool {
        self.layout.root().exists()
    }

    fn register(&self, spec: &CameraSpec) -> Result<ActiveCamera, RuntimeError> {
        if !self.registry.is_registered(&spec.identity) {
            return Err(RuntimeError::ClassNotRegistered(spec.identity.to_string()));
        }

        let node = self.session_node(&spec.identity);
        if node.exists() {
            let existing = node.values()?;
            if Self::owner_alive(&existing) {
                return Err(RuntimeError::AlreadyActive(spec.camera_id.to_string()));
            }
            warn!(
                "replacing stale session for camera '{}' ({})",
                spec.camera_id, spec.identity
            );
        }

        node.create()?;
        let mut values = Values::new();
        values
            .set_sz(CAMERA_ID_VALUE, spec.camera_id.as_str())
            .set_sz(FRIENDLY_NAME_VALUE, spec.friendly_name.as_str())
            .set_dword(PID_VALUE, std::process::id())
            .set_sz(STATE_VALUE, STATE_REGISTERED)
            .set_sz(REGISTERED_AT_VALUE, chrono::Utc::now().to_rfc3339());
        node.write_values(&values)
            .map_err(|e| RuntimeError::RegistrationFailed {
                camera_id: spec.camera_id.to_string(),
                reason: e.to_string(),
            })?;

        debug!("session registered for '{}' at {}", spec.camera_id, node.path().display());
        Ok(ActiveCamera {
            camera_id: spec.camera_id.clone(),
            identity: spec.identity,
            friendly_name: spec.friendly_name.clone(),
            backend: self.name().to_owned(),
            token: self.next_token.fetch_add(1, Ordering::Relaxed),
        })
    }

    fn start(&self, camera: &ActiveCamera) -> Result<(), RuntimeError> {
        let node = self.session_node(&camera.identity);
        if !node.exists() {
            return Err(RuntimeError::NotActive(camera.camera_id.to_string()));
        }

        let mut values = node.values()?;
        values
            .set_sz(STATE_VALUE, STATE_RUNNING)
            .set_sz(STARTED_AT_VALUE, chrono::Utc::now().to_rfc3339());
        node.write_values(&values)
            .map_err(|e| RuntimeError::StartFailed {
                camera_id: camera.camera_id.to_string(),
                reason: e.to_string(),
            })?;

        info!("camera '{}' started", camera.camera_id);
        Ok(())
    }

    fn remove(&self, camera: &ActiveCamera) -> Result<(), RuntimeError> {
        let node = self.session_node(&camera.identity);
        if !node.exists() {
            return Err(RuntimeError::NotActive(camera.camera_id.to_string()));
        }
        node.delete_tree()
            .map_err(|e| RuntimeError::RemoveFailed {
                camera_id: camera.camera_id.to_string(),
                reason: e.to_string(),
            })?;
        info!("camera '{}' removed", camera.camera_id);
        Ok(())
    }

    fn status(&self, identity: &ClassIdentity) -> Result<CameraStatus, RuntimeError> {
        let node = self.session_node(identity);
        let running = if node.exists() {
            let values = node.values()?;
            Self::owner_alive(&values) && values.sz(STATE_VALUE) == Some(STATE_RUNNING)
        } else {
            false
        };
        Ok(CameraStatus {
            identity: *identity,
            registered: self.registry.is_registered(identity),
            running,
        })
    }
}
