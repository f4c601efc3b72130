use crate::layout::StoreLayout;
use crate::node::{Node, Values};
use crate::StoreError;
use netcam_schema::{ClassIdentity, IDENTITY_ALGORITHM_VERSION, PRODUCT_NAME};
use serde::Serialize;
use std::io;
use tracing::{debug, info, warn};

/// Threading model tag recorded for every registered class.
pub const THREADING_MODEL: &str = "Both";

const SERVER_NODE: &str = "InprocServer32";
const MODULE_VALUE: &str = "";
const THREADING_MODEL_VALUE: &str = "ThreadingModel";
const FRIENDLY_NAME_VALUE: &str = "FriendlyName";
const IDENTITY_VERSION_VALUE: &str = "IdentityVersion";

/// What the activation subsystem is told about one class identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRegistration {
    pub identity: ClassIdentity,
    pub module_path: String,
    pub threading_model: String,
    pub friendly_name: String,
    pub identity_version: u32,
}

/// Class registrations stored as `Classes/{GUID}/InprocServer32`.
pub struct ClassRegistry {
    layout: StoreLayout,
}

impl ClassRegistry {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    fn node(&self, identity: &ClassIdentity) -> Node {
        Node::open(self.layout.class_node(identity))
    }

    /// Label recorded for a camera's class: `"<id> (NetCam)"`.
    pub fn registration_name(camera_id: &str) -> String {
        format!("{camera_id} ({PRODUCT_NAME})")
    }

    /// Record `identity` as served by `module_path`, overwriting any previous entry.
    pub fn register(
        &self,
        identity: &ClassIdentity,
        camera_id: &str,
        module_path: &str,
    ) -> Result<(), StoreError> {
        let server = self.node(identity).child(SERVER_NODE);
        server.create()?;

        let mut values = Values::new();
        values
            .set_sz(MODULE_VALUE, module_path)
            .set_sz(THREADING_MODEL_VALUE, THREADING_MODEL)
            .set_sz(FRIENDLY_NAME_VALUE, Self::registration_name(camera_id))
            .set_dword(IDENTITY_VERSION_VALUE, IDENTITY_ALGORITHM_VERSION);
        server.write_values(&values)?;

        info!("registered class {identity} for camera '{camera_id}'");
        Ok(())
    }

    /// Remove the whole entry for `identity`. Unknown identities are a no-op.
    pub fn unregister(&self, identity: &ClassIdentity) -> Result<(), StoreError> {
        let node = self.node(identity);
        if !node.exists() {
            debug!("class {identity} was not registered");
            return Ok(());
        }
        node.delete_tree()?;
        info!("unregistered class {identity}");
        Ok(())
    }

    pub fn is_registered(&self, identity: &ClassIdentity) -> bool {
        self.node(identity).child(SERVER_NODE).exists()
    }

    pub fn get(&self, identity: &ClassIdentity) -> Result<ClassRegistration, StoreError> {
        let server = self.node(identity).child(SERVER_NODE);
        if !server.exists() {
            return Err(StoreError::ClassNotRegistered(identity.to_string()));
        }
        let values = server.values()?;
        Ok(ClassRegistration {
            identity: *identity,
            module_path: values.sz(MODULE_VALUE).unwrap_or_default().to_owned(),
            threading_model: values
                .sz(THREADING_MODEL_VALUE)
                .unwrap_or_default()
                .to_owned(),
            friendly_name: values.sz(FRIENDLY_NAME_VALUE).unwrap_or_default().to_owned(),
            identity_version: values.dword(IDENTITY_VERSION_VALUE).unwrap_or(0),
        })
    }

    /// All readable registrations. Entries that are not identities are skipped.
    pub fn list(&self) -> Result<Vec<ClassRegistration>, StoreError> {
        let root = Node::open(self.layout.classes_dir());
        let names = match root.children() {
            Ok(names) => names,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut results = Vec::new();
        for name in names {
            let Ok(identity) = name.parse::<ClassIdentity>() else {
                warn!("skipping foreign class node '{name}'");
                continue;
            };
            match self.get(&identity) {
                Ok(reg) => results.push(reg),
                Err(e) => warn!("skipping unreadable class node '{name}': {e}"),
            }
        }
        results.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcam_schema::derive_identity;

    fn test_registry() -> (tempfile::TempDir, ClassRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = ClassRegistry::new(StoreLayout::new(dir.path()));
        (dir, registry)
    }

    #[test]
    fn register_records_side_effects() {
        let (_dir, registry) = test_registry();
        let identity = derive_identity("Camera1");
        registry
            .register(&identity, "Camera1", "/opt/netcam/libnetcam_source.so")
            .unwrap();

        let reg = registry.get(&identity).unwrap();
        assert_eq!(reg.module_path, "/opt/netcam/libnetcam_source.so");
        assert_eq!(reg.threading_model, "Both");
        assert_eq!(reg.friendly_name, "Camera1 (NetCam)");
        assert_eq!(reg.identity_version, IDENTITY_ALGORITHM_VERSION);
        assert!(registry.is_registered(&identity));
    }

    #[test]
    fn unregister_removes_entire_entry() {
        let (dir, registry) = test_registry();
        let identity = derive_identity("Camera1");
        registry.register(&identity, "Camera1", "/m.so").unwrap();
        registry.unregister(&identity).unwrap();

        assert!(!registry.is_registered(&identity));
        assert!(!StoreLayout::new(dir.path()).class_node(&identity).exists());
        assert!(matches!(
            registry.get(&identity),
            Err(StoreError::ClassNotRegistered(_))
        ));
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let (_dir, registry) = test_registry();
        registry.unregister(&derive_identity("Ghost")).unwrap();
    }

    #[test]
    fn register_overwrites() {
        let (_dir, registry) = test_registry();
        let identity = derive_identity("Camera2");
        registry.register(&identity, "Camera2", "/old.so").unwrap();
        registry.register(&identity, "Camera2", "/new.so").unwrap();
        assert_eq!(registry.get(&identity).unwrap().module_path, "/new.so");
    }

    #[test]
    fn list_skips_foreign_nodes() {
        let (dir, registry) = test_registry();
        registry
            .register(&derive_identity("Camera1"), "Camera1", "/m.so")
            .unwrap();
        registry
            .register(&derive_identity("Camera2"), "Camera2", "/m.so")
            .unwrap();
        std::fs::create_dir_all(StoreLayout::new(dir.path()).classes_dir().join("junk")).unwrap();

        let list = registry.list().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].identity < list[1].identity);
    }

    #[test]
    fn list_without_classes_is_empty() {
        let (_dir, registry) = test_registry();
        assert!(registry.list().unwrap().is_empty());
    }
}
