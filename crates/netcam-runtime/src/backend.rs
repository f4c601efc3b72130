use crate::RuntimeError;
use netcam_schema::{derive_identity, CameraDefinition, CameraId, ClassIdentity};
use netcam_store::StoreLayout;
use serde::{Deserialize, Serialize};

/// Everything the activation subsystem is given when a camera is registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraSpec {
    pub camera_id: CameraId,
    pub identity: ClassIdentity,
    pub friendly_name: String,
    pub definition: CameraDefinition,
}

impl CameraSpec {
    pub fn for_definition(definition: &CameraDefinition) -> Self {
        Self {
            camera_id: definition.id.clone(),
            identity: derive_identity(&definition.id),
            friendly_name: definition.friendly_name.clone(),
            definition: definition.clone(),
        }
    }
}

/// Handle for a camera the backend has registered.
///
/// Owned by whoever registered it and handed back to
/// [`VirtualCameraBackend::remove`] when the camera is torn down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveCamera {
    pub camera_id: CameraId,
    pub identity: ClassIdentity,
    pub friendly_name: String,
    pub backend: String,
    pub token: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraStatus {
    pub identity: ClassIdentity,
    pub registered: bool,
    pub running: bool,
}

/// Contract of the external device-activation subsystem.
///
/// Calls block until the subsystem answers; there is no timeout or
/// cancellation.
pub trait VirtualCameraBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn available(&self) -> bool;

    /// Create a session registration for the camera keyed by its identity.
    fn register(&self, spec: &CameraSpec) -> Result<ActiveCamera, RuntimeError>;

    fn start(&self, camera: &ActiveCamera) -> Result<(), RuntimeError>;

    /// Stop the camera and drop its registration.
    fn remove(&self, camera: &ActiveCamera) -> Result<(), RuntimeError>;

    fn status(&self, identity: &ClassIdentity) -> Result<CameraStatus, RuntimeError>;
}

pub fn select_backend(
    name: &str,
    layout: &StoreLayout,
) -> Result<Box<dyn VirtualCameraBackend>, RuntimeError> {
    match name {
        "session" => Ok(Box::new(crate::session::SessionBackend::new(layout.clone()))),
        "mock" => Ok(Box::new(crate::mock::MockBackend::new())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_valid_backends() {
        let layout = StoreLayout::new("/tmp/netcam-test-store");
        assert_eq!(select_backend("session", &layout).unwrap().name(), "session");
        assert_eq!(select_backend("mock", &layout).unwrap().name(), "mock");
    }

    #[test]
    fn select_invalid_backend_fails() {
        let layout = StoreLayout::new("/tmp/netcam-test-store");
        assert!(matches!(
            select_backend("mediafoundation", &layout),
            Err(RuntimeError::BackendUnavailable(name)) if name == "mediafoundation"
        ));
    }

    #[test]
    fn spec_uses_derived_identity() {
        let def = CameraDefinition::with_defaults("Camera1");
        let spec = CameraSpec::for_definition(&def);
        assert_eq!(spec.identity, derive_identity("Camera1"));
        assert_eq!(spec.friendly_name, "NetCam Virtual Camera Camera1");
        assert_eq!(spec.camera_id, "Camera1");
    }
}
