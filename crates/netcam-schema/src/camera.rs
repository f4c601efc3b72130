use crate::types::CameraId;
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Product name used in default friendly names and registration labels.
pub const PRODUCT_NAME: &str = "NetCam";

/// Camera that unresolved activation requests are routed to.
pub const DEFAULT_CAMERA_ID: &str = "Camera1";

/// Maximum camera id length in UTF-16 code units (a registry key name limit).
const MAX_CAMERA_ID_UNITS: usize = 255;

/// The fixed set of frame sizes a camera can be configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "640x480")]
    Vga,
    #[serde(rename = "800x600")]
    Svga,
    #[serde(rename = "1024x768")]
    Xga,
    #[serde(rename = "1280x720")]
    Hd,
    #[serde(rename = "1920x1080")]
    FullHd,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::Vga,
        Resolution::Svga,
        Resolution::Xga,
        Resolution::Hd,
        Resolution::FullHd,
    ];

    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Vga => (640, 480),
            Resolution::Svga => (800, 600),
            Resolution::Xga => (1024, 768),
            Resolution::Hd => (1280, 720),
            Resolution::FullHd => (1920, 1080),
        }
    }

    /// Map stored dimensions back to a supported resolution, if they are one.
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.dimensions() == (width, height))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{w}x{h}")
    }
}

impl FromStr for Resolution {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase()
            .replace('×', "x");
        let parsed = normalized
            .split_once('x')
            .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)));
        parsed
            .and_then(|(w, h)| Self::from_dimensions(w, h))
            .ok_or_else(|| SchemaError::UnsupportedResolution(s.to_owned()))
    }
}

/// One persisted virtual camera.
///
/// Written only by the editor. The lifecycle manager and the activation
/// handler treat definitions as read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraDefinition {
    pub id: CameraId,
    pub url: String,
    pub friendly_name: String,
    pub width: u32,
    pub height: u32,
    pub enabled: bool,
}

impl CameraDefinition {
    /// A definition with every field at its documented default.
    pub fn with_defaults(id: impl Into<CameraId>) -> Self {
        let id = id.into();
        let (width, height) = Resolution::default().dimensions();
        Self {
            friendly_name: default_friendly_name(&id),
            id,
            url: String::new(),
            width,
            height,
            enabled: true,
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        Resolution::from_dimensions(self.width, self.height)
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        (self.width, self.height) = resolution.dimensions();
    }
}

/// Friendly name used when none was stored: `"NetCam Virtual Camera <id>"`.
pub fn default_friendly_name(id: &str) -> String {
    format!("{PRODUCT_NAME} Virtual Camera {id}")
}

/// Lowest-numbered `CameraN` (N >= 1) not present in `existing`.
pub fn generate_unique_id<S: std::hash::BuildHasher>(
    existing: &HashSet<String, S>,
) -> CameraId {
    (1u32..)
        .map(|n| format!("Camera{n}"))
        .find(|candidate| !existing.contains(candidate))
        .map(CameraId::new)
        .unwrap_or_else(|| CameraId::new(DEFAULT_CAMERA_ID))
}

/// Camera ids name store nodes, so they must be usable as a single path component.
pub fn validate_camera_id(id: &str) -> Result<(), SchemaError> {
    let reject = |reason: &str| {
        Err(SchemaError::InvalidCameraId {
            id: id.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if id.is_empty() {
        return reject("must not be empty");
    }
    if id.encode_utf16().count() > MAX_CAMERA_ID_UNITS {
        return reject("must be at most 255 characters");
    }
    if id == "." || id == ".." {
        return reject("must not be a relative path component");
    }
    if id.contains(['/', '\\']) {
        return reject("contains a path separator");
    }
    if id.chars().any(char::is_control) {
        return reject("contains a control character");
    }
    Ok(())
}
