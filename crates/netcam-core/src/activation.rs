//! Activation path: the host hands over a class identity and gets back a
//! configured camera source.
//!
//! [`Provider::get_class_object`] is the registration-facing entry point and
//! refuses identities the index does not know. [`ClassFactory::create_instance`]
//! and [`Activator`] form the instance path, which never fails on an unknown
//! identity and falls back to the default camera instead.

use crate::index::RegistrationIndex;
use crate::lifecycle::{validate_transition, ActivationState};
use crate::CoreError;
use netcam_schema::{CameraDefinition, CameraId, ClassIdentity};
use netcam_store::{ClassRegistry, DefinitionSource};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Interfaces a host may ask an activated instance for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    MediaSource,
    MediaSourceEx,
    KsControl,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::MediaSource,
        Capability::MediaSourceEx,
        Capability::KsControl,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::MediaSource => "media-source",
            Capability::MediaSourceEx => "media-source-ex",
            Capability::KsControl => "ks-control",
        };
        f.write_str(s)
    }
}

impl FromStr for Capability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::NoInterface(s.to_owned()))
    }
}

/// Metadata about the process asking for activation. Diagnostics only.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub pid: Option<u32>,
}

impl ClientContext {
    pub fn for_pid(pid: u32) -> Self {
        Self { pid: Some(pid) }
    }

    pub fn process_name(&self) -> Option<String> {
        let pid = self.pid?;
        let comm = std::fs::read_to_string(Path::new("/proc").join(pid.to_string()).join("comm"))
            .ok()?;
        Some(comm.trim_end().to_owned())
    }
}

/// The instance object bound to one camera definition.
pub trait CameraSource: Send + Sync + fmt::Debug {
    fn definition(&self) -> &CameraDefinition;

    fn supports(&self, capability: Capability) -> bool;
}

/// Builds the instance object for a resolved definition.
pub trait SourceFactory: Send + Sync {
    fn create(&self, definition: &CameraDefinition) -> Result<Arc<dyn CameraSource>, CoreError>;
}

#[derive(Debug)]
pub struct ConfiguredSource {
    definition: CameraDefinition,
}

impl CameraSource for ConfiguredSource {
    fn definition(&self) -> &CameraDefinition {
        &self.definition
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::MediaSource | Capability::MediaSourceEx
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSourceFactory;

impl SourceFactory for DefaultSourceFactory {
    fn create(&self, definition: &CameraDefinition) -> Result<Arc<dyn CameraSource>, CoreError> {
        Ok(Arc::new(ConfiguredSource {
            definition: definition.clone(),
        }))
    }
}

/// One activation request, from creation to detach.
pub struct Activator {
    identity: Option<ClassIdentity>,
    state: ActivationState,
    camera_id: Option<CameraId>,
    instance: Option<Arc<dyn CameraSource>>,
    index: Arc<RegistrationIndex>,
    source: Arc<dyn DefinitionSource>,
    factory: Arc<dyn SourceFactory>,
}

impl fmt::Debug for Activator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activator")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .field("camera_id", &self.camera_id)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl Activator {
    fn new(
        identity: Option<ClassIdentity>,
        index: Arc<RegistrationIndex>,
        source: Arc<dyn DefinitionSource>,
        factory: Arc<dyn SourceFactory>,
    ) -> Self {
        Self {
            identity,
            state: ActivationState::Created,
            camera_id: None,
            instance: None,
            index,
            source,
            factory,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn identity(&self) -> Option<&ClassIdentity> {
        self.identity.as_ref()
    }

    pub fn camera_id(&self) -> Option<&CameraId> {
        self.camera_id.as_ref()
    }

    pub fn definition(&self) -> Option<&CameraDefinition> {
        self.instance.as_deref().map(CameraSource::definition)
    }

    /// Resolve the identity and bind its definition to a new instance.
    ///
    /// An unreadable definition is replaced by the defaults for the resolved
    /// id; only a failure to build the instance is an error.
    pub fn initialize(&mut self) -> Result<(), CoreError> {
        validate_transition(self.state, ActivationState::Initialized)?;

        let camera_id = self.index.resolve_optional(self.identity.as_ref());
        let definition = match self.source.get(&camera_id) {
            Ok(def) => def,
            Err(e) => {
                warn!("using default configuration for '{camera_id}': {e}");
                CameraDefinition::with_defaults(camera_id.clone())
            }
        };

        let instance = self.factory.create(&definition)?;
        debug!("activator initialized for '{camera_id}'");
        self.camera_id = Some(camera_id);
        self.instance = Some(instance);
        self.state = ActivationState::Initialized;
        Ok(())
    }

    /// Hand out the instance for `capability`.
    pub fn activate(
        &mut self,
        capability: Capability,
        client: &ClientContext,
    ) -> Result<Arc<dyn CameraSource>, CoreError> {
        validate_transition(self.state, ActivationState::Activated)?;
        let Some(instance) = self.instance.as_ref() else {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: ActivationState::Activated.to_string(),
            });
        };

        if let Some(pid) = client.pid {
            let name = client.process_name().unwrap_or_else(|| "unknown".to_owned());
            debug!("activation of {capability} requested by pid {pid} ({name})");
        }

        if !instance.supports(capability) {
            return Err(CoreError::NoInterface(capability.to_string()));
        }

        let instance = Arc::clone(instance);
        self.state = ActivationState::Activated;
        Ok(instance)
    }

    /// Release the instance. Detaching again is a no-op.
    pub fn detach(&mut self) -> Result<(), CoreError> {
        if self.state == ActivationState::Detached {
            return Ok(());
        }
        validate_transition(self.state, ActivationState::Detached)?;
        self.instance = None;
        self.state = ActivationState::Detached;
        Ok(())
    }

    /// Acknowledge host shutdown. Takes no action on the instance.
    pub fn shutdown(&mut self) -> Result<(), CoreError> {
        validate_transition(self.state, ActivationState::ShutdownOnly)?;
        if self.state != ActivationState::Detached {
            self.state = ActivationState::ShutdownOnly;
        }
        Ok(())
    }
}

/// Factory handed out for a known class identity.
pub struct ClassFactory {
    identity: ClassIdentity,
    camera_id: CameraId,
    index: Arc<RegistrationIndex>,
    source: Arc<dyn DefinitionSource>,
    factory: Arc<dyn SourceFactory>,
}

impl std::fmt::Debug for ClassFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassFactory")
            .field("identity", &self.identity)
            .field("camera_id", &self.camera_id)
            .finish_non_exhaustive()
    }
}

impl ClassFactory {
    pub fn identity(&self) -> &ClassIdentity {
        &self.identity
    }

    pub fn camera_id(&self) -> &CameraId {
        &self.camera_id
    }

    /// Create an activator and run its initialization.
    pub fn create_instance(&self) -> Result<Activator, CoreError> {
        let mut activator = Activator::new(
            Some(self.identity),
            Arc::clone(&self.index),
            Arc::clone(&self.source),
            Arc::clone(&self.factory),
        );
        activator.initialize()?;
        Ok(activator)
    }
}

/// Process-wide entry point for the activation host.
pub struct Provider {
    index: Arc<RegistrationIndex>,
    source: Arc<dyn DefinitionSource>,
    factory: Arc<dyn SourceFactory>,
}

impl Provider {
    pub fn new(source: Arc<dyn DefinitionSource>) -> Self {
        Self::with_factory(source, Arc::new(DefaultSourceFactory))
    }

    pub fn with_factory(source: Arc<dyn DefinitionSource>, factory: Arc<dyn SourceFactory>) -> Self {
        Self {
            index: Arc::new(RegistrationIndex::new(Arc::clone(&source))),
            source,
            factory,
        }
    }

    pub fn index(&self) -> &RegistrationIndex {
        &self.index
    }

    /// Factory for `identity`, or [`CoreError::ClassNotAvailable`] if the
    /// index cannot resolve it even after a rebuild.
    pub fn get_class_object(&self, identity: &ClassIdentity) -> Result<ClassFactory, CoreError> {
        let camera_id = self
            .index
            .lookup(identity)
            .ok_or_else(|| CoreError::ClassNotAvailable(identity.to_string()))?;
        Ok(ClassFactory {
            identity: *identity,
            camera_id,
            index: Arc::clone(&self.index),
            source: Arc::clone(&self.source),
            factory: Arc::clone(&self.factory),
        })
    }

    /// Activator for a host that supplies no identity.
    pub fn create_anonymous_instance(&self) -> Result<Activator, CoreError> {
        let mut activator = Activator::new(
            None,
            Arc::clone(&self.index),
            Arc::clone(&self.source),
            Arc::clone(&self.factory),
        );
        activator.initialize()?;
        Ok(activator)
    }

    /// Record a class registration for every index entry. Stops at the first failure.
    pub fn register_server(
        &self,
        registry: &ClassRegistry,
        module_path: &str,
    ) -> Result<Vec<(ClassIdentity, CameraId)>, CoreError> {
        let entries = self.index.entries();
        for (identity, camera_id) in &entries {
            registry.register(identity, camera_id, module_path)?;
        }
        info!("registered {} classes served by {module_path}", entries.len());
        Ok(entries)
    }

    /// Remove the class registration for every index entry. Stops at the first failure.
    pub fn unregister_server(
        &self,
        registry: &ClassRegistry,
    ) -> Result<Vec<(ClassIdentity, CameraId)>, CoreError> {
        let entries = self.index.entries();
        for (identity, _) in &entries {
            registry.unregister(identity)?;
        }
        info!("unregistered {} classes", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcam_schema::{derive_identity, BASE_IDENTITY};
    use netcam_store::{CameraStore, StoreError, StoreLayout};

    /// Source that lists definitions but fails every individual read.
    struct ListOnlySource(Vec<CameraDefinition>);

    impl DefinitionSource for ListOnlySource {
        fn list_all(&self) -> Result<Vec<CameraDefinition>, StoreError> {
            Ok(self.0.clone())
        }

        fn get(&self, _camera_id: &str) -> Result<CameraDefinition, StoreError> {
            Err(StoreError::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )))
        }
    }

    struct FailingFactory;

    impl SourceFactory for FailingFactory {
        fn create(&self, definition: &CameraDefinition) -> Result<Arc<dyn CameraSource>, CoreError> {
            Err(CoreError::SourceCreation {
                camera_id: definition.id.to_string(),
                reason: "out of memory".to_owned(),
            })
        }
    }

    fn store_with(ids: &[&str]) -> (tempfile::TempDir, Arc<CameraStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = CameraStore::new(StoreLayout::new(dir.path()));
        let defs: Vec<_> = ids
            .iter()
            .map(|id| {
                let mut d = CameraDefinition::with_defaults(*id);
                d.url = format!("rtsp://cams/{id}");
                d
            })
            .collect();
        store.save_all(&defs).unwrap();
        (dir, Arc::new(store))
    }

    #[test]
    fn full_activation_cycle() {
        let (_dir, store) = store_with(&["Camera1", "Camera2"]);
        let provider = Provider::new(store);

        let factory = provider
            .get_class_object(&derive_identity("Camera2"))
            .unwrap();
        assert_eq!(factory.camera_id(), &CameraId::new("Camera2"));

        let mut activator = factory.create_instance().unwrap();
        assert_eq!(activator.state(), ActivationState::Initialized);
        assert_eq!(activator.definition().unwrap().url, "rtsp://cams/Camera2");

        let instance = activator
            .activate(Capability::MediaSource, &ClientContext::for_pid(std::process::id()))
            .unwrap();
        assert_eq!(instance.definition().id, "Camera2");
        assert_eq!(activator.state(), ActivationState::Activated);

        activator.detach().unwrap();
        activator.detach().unwrap();
        assert_eq!(activator.state(), ActivationState::Detached);
        assert!(activator.definition().is_none());
    }

    #[test]
    fn class_object_for_unknown_identity_is_not_available() {
        let (_dir, store) = store_with(&["Camera1"]);
        let provider = Provider::new(store);
        let err = provider
            .get_class_object(&derive_identity("Unknown"))
            .unwrap_err();
        assert!(matches!(err, CoreError::ClassNotAvailable(_)));
    }

    #[test]
    fn unsupported_capability_is_no_interface() {
        let (_dir, store) = store_with(&["Camera1"]);
        let provider = Provider::new(store);
        let mut activator = provider
            .get_class_object(&derive_identity("Camera1"))
            .unwrap()
            .create_instance()
            .unwrap();

        let err = activator
            .activate(Capability::KsControl, &ClientContext::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::NoInterface(ref c) if c == "ks-control"));
        assert_eq!(activator.state(), ActivationState::Initialized);

        activator
            .activate(Capability::MediaSourceEx, &ClientContext::default())
            .unwrap();
    }

    #[test]
    fn unreadable_definition_uses_defaults() {
        let provider = Provider::new(Arc::new(ListOnlySource(vec![
            CameraDefinition::with_defaults("Camera7"),
        ])));
        let activator = provider
            .get_class_object(&derive_identity("Camera7"))
            .unwrap()
            .create_instance()
            .unwrap();

        let def = activator.definition().unwrap();
        assert_eq!(def.id, "Camera7");
        assert!(def.enabled);
        assert!(def.url.is_empty());
        assert_eq!((def.width, def.height), (640, 480));
    }

    #[test]
    fn anonymous_activation_falls_back_to_camera1() {
        let (_dir, store) = store_with(&["Camera1", "Camera2"]);
        let provider = Provider::new(store);
        let activator = provider.create_anonymous_instance().unwrap();
        assert_eq!(activator.camera_id(), Some(&CameraId::new("Camera1")));
        assert!(activator.identity().is_none());
    }

    #[test]
    fn instance_creation_failure_is_fatal() {
        let (_dir, store) = store_with(&["Camera1"]);
        let provider = Provider::with_factory(store, Arc::new(FailingFactory));
        let factory = provider
            .get_class_object(&derive_identity("Camera1"))
            .unwrap();
        assert!(matches!(
            factory.create_instance(),
            Err(CoreError::SourceCreation { .. })
        ));
    }

    #[test]
    fn shutdown_without_detach_is_acknowledged() {
        let (_dir, store) = store_with(&["Camera1"]);
        let provider = Provider::new(store);
        let mut activator = provider.create_anonymous_instance().unwrap();
        activator
            .activate(Capability::MediaSource, &ClientContext::default())
            .unwrap();
        activator.shutdown().unwrap();
        activator.shutdown().unwrap();
        assert_eq!(activator.state(), ActivationState::ShutdownOnly);

        activator.detach().unwrap();
        activator.shutdown().unwrap();
        assert_eq!(activator.state(), ActivationState::Detached);
    }

    #[test]
    fn activate_after_detach_is_invalid() {
        let (_dir, store) = store_with(&["Camera1"]);
        let provider = Provider::new(store);
        let mut activator = provider.create_anonymous_instance().unwrap();
        activator.detach().unwrap();
        assert!(matches!(
            activator.activate(Capability::MediaSource, &ClientContext::default()),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn register_and_unregister_server() {
        let (dir, store) = store_with(&["Camera1", "Camera2"]);
        let registry = ClassRegistry::new(StoreLayout::new(dir.path()));
        let provider = Provider::new(store);

        let registered = provider
            .register_server(&registry, "/usr/lib/netcam/libnetcam_source.so")
            .unwrap();
        assert_eq!(registered.len(), 2);
        let reg = registry.get(&derive_identity("Camera2")).unwrap();
        assert_eq!(reg.friendly_name, "Camera2 (NetCam)");
        assert_eq!(reg.threading_model, "Both");

        provider.unregister_server(&registry).unwrap();
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn register_server_on_empty_store_registers_seed() {
        let (dir, store) = store_with(&[]);
        let registry = ClassRegistry::new(StoreLayout::new(dir.path()));
        let provider = Provider::new(store);
        provider.register_server(&registry, "/m.so").unwrap();
        assert!(registry.is_registered(&BASE_IDENTITY));
    }

    #[test]
    fn capability_parsing() {
        assert_eq!("media-source".parse::<Capability>().unwrap(), Capability::MediaSource);
        assert_eq!(" MEDIA-SOURCE-EX ".parse::<Capability>().unwrap(), Capability::MediaSourceEx);
        assert!("camera-control".parse::<Capability>().is_err());
    }

    #[test]
    fn client_process_name_reads_proc() {
        let ctx = ClientContext::for_pid(std::process::id());
        if Path::new("/proc/self/comm").exists() {
            assert!(ctx.process_name().is_some());
        }
        assert!(ClientContext::default().process_name().is_none());
    }
}
