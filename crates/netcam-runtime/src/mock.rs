use crate::backend::{ActiveCamera, CameraSpec, CameraStatus, VirtualCameraBackend};
use crate::RuntimeError;
use netcam_schema::{CameraId, ClassIdentity};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// One call observed by [`MockBackend`], in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Register(CameraId),
    Start(CameraId),
    Remove(CameraId),
}

#[derive(Default)]
struct MockState {
    // identity -> running
    cameras: HashMap<ClassIdentity, bool>,
    calls: Vec<MockCall>,
    next_token: u64,
    fail_register: HashSet<String>,
    fail_start: HashSet<String>,
    fail_remove: HashSet<String>,
}

/// In-process backend. Records every call and can be told to fail
/// register, start or remove for specific camera ids.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::Poisoned(format!("mutex poisoned: {e}")))
    }

    pub fn fail_register_for(&self, camera_id: &str) {
        if let Ok(mut state) = self.lock() {
            state.fail_register.insert(camera_id.to_owned());
        }
    }

    pub fn fail_start_for(&self, camera_id: &str) {
        if let Ok(mut state) = self.lock() {
            state.fail_start.insert(camera_id.to_owned());
        }
    }

    pub fn fail_remove_for(&self, camera_id: &str) {
        if let Ok(mut state) = self.lock() {
            state.fail_remove.insert(camera_id.to_owned());
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    /// Number of cameras currently registered (running or not).
    pub fn active_count(&self) -> usize {
        self.lock().map(|s| s.cameras.len()).unwrap_or_default()
    }
}

impl VirtualCameraBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn register(&self, spec: &CameraSpec) -> Result<ActiveCamera, RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(MockCall::Register(spec.camera_id.clone()));

        if state.fail_register.contains(spec.camera_id.as_str()) {
            return Err(RuntimeError::RegistrationFailed {
                camera_id: spec.camera_id.to_string(),
                reason: "injected failure".to_owned(),
            });
        }
        if state.cameras.contains_key(&spec.identity) {
            return Err(RuntimeError::AlreadyActive(spec.camera_id.to_string()));
        }

        state.cameras.insert(spec.identity, false);
        state.next_token += 1;
        Ok(ActiveCamera {
            camera_id: spec.camera_id.clone(),
            identity: spec.identity,
            friendly_name: spec.friendly_name.clone(),
            backend: self.name().to_owned(),
            token: state.next_token,
        })
    }

    fn start(&self, camera: &ActiveCamera) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(MockCall::Start(camera.camera_id.clone()));

        if state.fail_start.contains(camera.camera_id.as_str()) {
            return Err(RuntimeError::StartFailed {
                camera_id: camera.camera_id.to_string(),
                reason: "injected failure".to_owned(),
            });
        }
        match state.cameras.get_mut(&camera.identity) {
            Some(running) => {
                *running = true;
                Ok(())
            }
            None => Err(RuntimeError::NotActive(camera.camera_id.to_string())),
        }
    }

    fn remove(&self, camera: &ActiveCamera) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(MockCall::Remove(camera.camera_id.clone()));

        if state.fail_remove.contains(camera.camera_id.as_str()) {
            return Err(RuntimeError::RemoveFailed {
                camera_id: camera.camera_id.to_string(),
                reason: "injected failure".to_owned(),
            });
        }
        if state.cameras.remove(&camera.identity).is_none() {
            return Err(RuntimeError::NotActive(camera.camera_id.to_string()));
        }
        Ok(())
    }

    fn status(&self, identity: &ClassIdentity) -> Result<CameraStatus, RuntimeError> {
        let state = self.lock()?;
        let running = state.cameras.get(identity).copied();
        Ok(CameraStatus {
            identity: *identity,
            registered: running.is_some(),
            running: running.unwrap_or(false),
        })
    }
}
