use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Stable, human-assigned camera handle (e.g. `Camera1`). Unique within the store.
///
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(String);

impl CameraId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for CameraId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl PartialEq<&str> for CameraId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<String> for CameraId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CameraId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_id_display_pads() {
        let id = CameraId::new("Camera1");
        assert_eq!(id.to_string(), "Camera1");
        assert_eq!(format!("{id:<9}|"), "Camera1  |");
    }

    #[test]
    fn camera_id_serde_is_plain_string() {
        let id = CameraId::new("Camera7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Camera7\"");
        let back: CameraId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn camera_id_compares_with_str() {
        let id = CameraId::from("Lobby");
        assert_eq!(id, "Lobby");
        assert_ne!(id, "lobby");
        assert_eq!(&*id, "Lobby");
    }

    #[test]
    fn camera_id_into_inner() {
        let id = CameraId::new(String::from("Desk"));
        assert_eq!(id.into_inner(), "Desk");
    }
}
