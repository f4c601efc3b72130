use crate::CoreError;
use netcam_runtime::{ActiveCamera, CameraSpec, VirtualCameraBackend};
use netcam_schema::CameraId;
use netcam_store::DefinitionSource;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerStatus {
    Idle,
    Active,
    Degraded,
    Stopped,
}

impl fmt::Display for ManagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ManagerStatus::Idle => "idle",
            ManagerStatus::Active => "active",
            ManagerStatus::Degraded => "degraded",
            ManagerStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraFailure {
    pub camera_id: CameraId,
    pub cause: String,
}

/// Outcome of [`CameraManager::startup`].
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub status: ManagerStatus,
    pub started: Vec<CameraId>,
    /// The camera that aborted startup, if any.
    pub failure: Option<CameraFailure>,
    /// Enabled cameras never attempted because of the failure.
    pub skipped: Vec<CameraId>,
    pub disabled: Vec<CameraId>,
}

impl StartupReport {
    pub fn is_degraded(&self) -> bool {
        self.status == ManagerStatus::Degraded
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    pub stopped: Vec<CameraId>,
    pub failures: Vec<CameraFailure>,
}

/// Registers, starts and later removes every enabled camera in one process.
///
/// Startup is sequential and aborts at the first failing camera without
/// rolling back the ones already running. Shutdown is best-effort and visits
/// every started camera.
pub struct CameraManager {
    backend: Arc<dyn VirtualCameraBackend>,
    source: Arc<dyn DefinitionSource>,
    active: Vec<ActiveCamera>,
    status: ManagerStatus,
}

impl CameraManager {
    pub fn new(backend: Arc<dyn VirtualCameraBackend>, source: Arc<dyn DefinitionSource>) -> Self {
        Self {
            backend,
            source,
            active: Vec::new(),
            status: ManagerStatus::Idle,
        }
    }

    pub fn status(&self) -> ManagerStatus {
        self.status
    }

    pub fn active_cameras(&self) -> &[ActiveCamera] {
        &self.active
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn startup(&mut self) -> Result<StartupReport, CoreError> {
        if matches!(self.status, ManagerStatus::Active | ManagerStatus::Degraded) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: ManagerStatus::Active.to_string(),
            });
        }

        let definitions = self.source.list_all()?;
        let (enabled, disabled): (Vec<_>, Vec<_>) =
            definitions.into_iter().partition(|d| d.enabled);
        if enabled.is_empty() {
            error!("no enabled cameras configured; nothing to start");
            return Err(CoreError::NoCamerasConfigured);
        }

        info!(
            "starting {} cameras on backend '{}'",
            enabled.len(),
            self.backend.name()
        );

        let mut started = Vec::new();
        let mut failure = None;
        let mut remaining = enabled.iter();

        for def in remaining.by_ref() {
            let spec = CameraSpec::for_definition(def);
            debug!("registering '{}' as {}", spec.camera_id, spec.identity);

            let camera = match self.backend.register(&spec) {
                Ok(camera) => camera,
                Err(e) => {
                    failure = Some(CameraFailure {
                        camera_id: def.id.clone(),
                        cause: e.to_string(),
                    });
                    break;
                }
            };

            if let Err(e) = self.backend.start(&camera) {
                if let Err(remove_err) = self.backend.remove(&camera) {
                    warn!(
                        "could not remove half-registered camera '{}': {remove_err}",
                        camera.camera_id
                    );
                }
                failure = Some(CameraFailure {
                    camera_id: def.id.clone(),
                    cause: e.to_string(),
                });
                break;
            }

            info!("camera '{}' is running", camera.camera_id);
            started.push(camera.camera_id.clone());
            self.active.push(camera);
        }

        let skipped: Vec<CameraId> = remaining.map(|d| d.id.clone()).collect();
        self.status = if let Some(f) = &failure {
            error!(
                "startup aborted at camera '{}': {}; {} started, {} skipped",
                f.camera_id,
                f.cause,
                started.len(),
                skipped.len()
            );
            ManagerStatus::Degraded
        } else {
            ManagerStatus::Active
        };

        Ok(StartupReport {
            status: self.status,
            started,
            failure,
            skipped,
            disabled: disabled.into_iter().map(|d| d.id).collect(),
        })
    }

    /// Remove every started camera in start order, continuing past failures.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        for camera in self.active.drain(..) {
            match self.backend.remove(&camera) {
                Ok(()) => report.stopped.push(camera.camera_id),
                Err(e) => {
                    warn!("failed to stop camera '{}': {e}", camera.camera_id);
                    report.failures.push(CameraFailure {
                        camera_id: camera.camera_id,
                        cause: e.to_string(),
                    });
                }
            }
        }
        if self.status != ManagerStatus::Idle {
            self.status = ManagerStatus::Stopped;
        }
        report
    }
}
