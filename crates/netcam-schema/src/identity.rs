use crate::SchemaError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Version of the derivation implemented by [`derive_identity`].
///
/// Recorded next to every class registration. Any change to the hash, the
/// base constant or the byte placement is a compatibility break for every
/// external registration made with an earlier version and must bump this.
pub const IDENTITY_ALGORITHM_VERSION: u32 = 1;

/// `{3CAD447D-F283-4AF4-A3B2-6F5363309F52}`, the identity all cameras are derived from.
///
/// Also the synthetic identity the registration index maps to the default
/// camera when the store holds no definitions.
pub const BASE_IDENTITY: ClassIdentity = ClassIdentity([
    0x3c, 0xad, 0x44, 0x7d, 0xf2, 0x83, 0x4a, 0xf4, 0xa3, 0xb2, 0x6f, 0x53, 0x63, 0x30, 0x9f, 0x52,
]);

/// 128-bit class identifier an external host uses to request a camera instance.
///
/// Bytes are kept in textual order, i.e. the order the hex digits appear in
/// `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassIdentity([u8; 16]);

impl ClassIdentity {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Derive the class identity for a camera id.
///
/// Rolling `hash * 31 + unit` over the UTF-16 code units of `camera_id`,
/// seeded at zero with wrapping 32-bit arithmetic, written little-endian over
/// the last four bytes of [`BASE_IDENTITY`].
///
/// Only 32 bits vary, so distinct ids can collide (`"Aa"` and `"BB"` do).
/// Collisions are not resolved here.
pub fn derive_identity(camera_id: &str) -> ClassIdentity {
    let hash = camera_id
        .encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)));

    let mut bytes = BASE_IDENTITY.0;
    bytes[12..].copy_from_slice(&hash.to_le_bytes());
    ClassIdentity(bytes)
}

impl fmt::Display for ClassIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{{{:02X}{:02X}{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13],
            b[14], b[15]
        )
    }
}

impl FromStr for ClassIdentity {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemaError::InvalidIdentity(s.to_owned());
        let trimmed = s.trim();
        let inner = if let Some(rest) = trimmed.strip_prefix('{') {
            rest.strip_suffix('}').ok_or_else(invalid)?
        } else if trimmed.ends_with('}') {
            return Err(invalid());
        } else {
            trimmed
        };

        let groups: Vec<&str> = inner.split('-').collect();
        let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        if lengths != [8, 4, 4, 4, 12] {
            return Err(invalid());
        }

        let hex: String = groups.concat();
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(invalid)?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for ClassIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClassIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varying_bits(id: &ClassIdentity) -> u32 {
        let b = id.as_bytes();
        u32::from_le_bytes([b[12], b[13], b[14], b[15]])
    }

    #[test]
    fn derivation_is_deterministic() {
        for id in ["Camera1", "Lobby", "", "カメラ", "😀 cam"] {
            assert_eq!(derive_identity(id), derive_identity(id));
        }
    }

    #[test]
    fn known_vector_camera1() {
        assert_eq!(
            derive_identity("Camera1").to_string(),
            "{3CAD447D-F283-4AF4-A3B2-6F538C39F783}"
        );
        assert_eq!(
            derive_identity("Camera2").to_string(),
            "{3CAD447D-F283-4AF4-A3B2-6F538D39F783}"
        );
    }

    #[test]
    fn only_last_four_bytes_vary() {
        let id = derive_identity("some camera with a long name");
        assert_eq!(id.as_bytes()[..12], BASE_IDENTITY.as_bytes()[..12]);
    }

    #[test]
    fn empty_id_zeroes_hash_bytes() {
        let id = derive_identity("");
        assert_eq!(varying_bits(&id), 0);
        assert_ne!(id, BASE_IDENTITY);
    }

    #[test]
    fn hashes_utf16_code_units() {
        // U+1F600 is the surrogate pair D83D DE00.
        let expected = 0xD83Du32.wrapping_mul(31).wrapping_add(0xDE00);
        assert_eq!(varying_bits(&derive_identity("😀")), expected);
    }

    #[test]
    fn known_collision_is_preserved() {
        assert_eq!(derive_identity("Aa"), derive_identity("BB"));
    }

    #[test]
    fn display_parse_roundtrip() {
        let id = derive_identity("Camera3");
        let parsed: ClassIdentity = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_accepts_lowercase_and_bare() {
        let parsed: ClassIdentity = "3cad447d-f283-4af4-a3b2-6f5363309f52".parse().unwrap();
        assert_eq!(parsed, BASE_IDENTITY);
        let braced: ClassIdentity = "{3cad447d-f283-4af4-a3b2-6f5363309f52}".parse().unwrap();
        assert_eq!(braced, BASE_IDENTITY);
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in [
            "",
            "{3CAD447D-F283-4AF4-A3B2-6F5363309F52",
            "3CAD447DF2834AF4A3B26F5363309F52",
            "{3CAD447D-F283-4AF4-A3B2-6F5363309F5Z}",
            "{3CAD447D-F283-4AF4-A3B26-F5363309F52}",
        ] {
            assert!(bad.parse::<ClassIdentity>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&BASE_IDENTITY).unwrap();
        assert_eq!(json, "\"{3CAD447D-F283-4AF4-A3B2-6F5363309F52}\"");
        let back: ClassIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BASE_IDENTITY);
    }
}
