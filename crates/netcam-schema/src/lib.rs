//! Camera definitions and class identity derivation for NetCam.
//!
//! This crate defines the schema layer shared by the editor, the lifecycle
//! manager and the activation handler: the persisted `CameraDefinition`, the
//! enumerated `Resolution` set, camera id validation and generation, and the
//! single implementation of class identity derivation (`derive_identity`).
//! Every process that maps camera ids to class identities must go through this
//! crate so the derivation stays byte-identical everywhere.

pub mod camera;
pub mod identity;
pub mod types;

pub use camera::{
    default_friendly_name, generate_unique_id, validate_camera_id, CameraDefinition, Resolution,
    DEFAULT_CAMERA_ID, PRODUCT_NAME,
};
pub use identity::{derive_identity, ClassIdentity, BASE_IDENTITY, IDENTITY_ALGORITHM_VERSION};
pub use types::CameraId;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid class identity '{0}': expected {{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}}")]
    InvalidIdentity(String),
    #[error("invalid camera id '{id}': {reason}")]
    InvalidCameraId { id: String, reason: String },
    #[error("unsupported resolution '{0}' (expected one of 640x480, 800x600, 1024x768, 1280x720, 1920x1080)")]
    UnsupportedResolution(String),
}
