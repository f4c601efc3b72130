//! Identity resolution and lifecycle coordination for NetCam.
//!
//! Three actors share nothing but the configuration store: the editor that
//! writes camera definitions, the `CameraManager` that registers and starts
//! every enabled camera against a backend, and the activation path
//! (`Provider`, `ClassFactory`, `Activator`) that receives only a class
//! identity and must find its way back to a definition through the
//! `RegistrationIndex`.

pub mod activation;
pub mod concurrency;
pub mod config;
pub mod index;
pub mod lifecycle;
pub mod manager;

pub use activation::{
    Activator, CameraSource, Capability, ClassFactory, ClientContext, ConfiguredSource,
    DefaultSourceFactory, Provider, SourceFactory,
};
pub use concurrency::{install_signal_handler, request_shutdown, shutdown_requested};
pub use config::{Overrides, Settings};
pub use index::RegistrationIndex;
pub use lifecycle::{validate_transition, ActivationState};
pub use manager::{CameraFailure, CameraManager, ManagerStatus, ShutdownReport, StartupReport};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("schema error: {0}")]
    Schema(#[from] netcam_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] netcam_store::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] netcam_runtime::RuntimeError),
    #[error("class {0} is not available")]
    ClassNotAvailable(String),
    #[error("interface '{0}' is not supported")]
    NoInterface(String),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("failed to create source for camera '{camera_id}': {reason}")]
    SourceCreation { camera_id: String, reason: String },
    #[error("no cameras configured; add one with `netcam add` before starting")]
    NoCamerasConfigured,
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Operator-facing remediation, when one is known.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            CoreError::Store(e) => e.remediation(),
            CoreError::Runtime(netcam_runtime::RuntimeError::Store(e)) => e.remediation(),
            _ => None,
        }
    }
}
