//! Device-activation backends for NetCam.
//!
//! The subsystem that actually exposes virtual cameras to applications is a
//! black box to NetCam. This crate models its contract as the
//! `VirtualCameraBackend` trait (register, start, remove, status) and ships two
//! implementations: `SessionBackend`, which records session registrations in
//! the configuration store and requires the camera's class to be registered,
//! and `MockBackend`, an in-process backend with failure injection for tests.

pub mod backend;
pub mod mock;
pub mod session;

pub use backend::{select_backend, ActiveCamera, CameraSpec, CameraStatus, VirtualCameraBackend};
pub use mock::{MockBackend, MockCall};
pub use session::SessionBackend;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] netcam_store::StoreError),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("class {0} is not registered (run `netcam register` with elevated privileges)")]
    ClassNotRegistered(String),
    #[error("camera '{0}' is already active")]
    AlreadyActive(String),
    #[error("camera '{0}' is not active")]
    NotActive(String),
    #[error("failed to register camera '{camera_id}': {reason}")]
    RegistrationFailed { camera_id: String, reason: String },
    #[error("failed to start camera '{camera_id}': {reason}")]
    StartFailed { camera_id: String, reason: String },
    #[error("failed to remove camera '{camera_id}': {reason}")]
    RemoveFailed { camera_id: String, reason: String },
    #[error("backend state poisoned: {0}")]
    Poisoned(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_display_start_failed() {
        let e = RuntimeError::StartFailed {
            camera_id: "Camera2".to_owned(),
            reason: "device busy".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Camera2"));
        assert!(msg.contains("device busy"));
    }

    #[test]
    fn runtime_error_display_class_not_registered() {
        let e = RuntimeError::ClassNotRegistered("{X}".to_owned());
        let msg = e.to_string();
        assert!(msg.contains("{X}"));
        assert!(msg.contains("netcam register"));
    }
}
