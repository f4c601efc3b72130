use netcam_schema::{derive_identity, CameraId, ClassIdentity, BASE_IDENTITY, DEFAULT_CAMERA_ID};
use netcam_store::DefinitionSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

type IdentityMap = HashMap<ClassIdentity, CameraId>;

/// In-memory reverse mapping from class identity to camera id.
///
/// Built lazily from the injected [`DefinitionSource`] and rebuilt only when a
/// lookup misses. Entries for cameras removed from the store stay resolvable
/// until some other miss forces a rebuild.
///
/// Safe to share between threads: lookups hold the read lock, builds hold the
/// write lock, so a partially built map is never visible.
pub struct RegistrationIndex {
    source: Arc<dyn DefinitionSource>,
    map: RwLock<Option<IdentityMap>>,
    rebuilds: AtomicUsize,
}

impl RegistrationIndex {
    pub fn new(source: Arc<dyn DefinitionSource>) -> Self {
        Self {
            source,
            map: RwLock::new(None),
            rebuilds: AtomicUsize::new(0),
        }
    }

    /// Scan the source and derive every identity.
    ///
    /// An empty or unreadable source yields a single entry mapping the base
    /// identity to `Camera1`. On collision the id enumerated last wins.
    fn scan(&self) -> IdentityMap {
        let definitions = match self.source.list_all() {
            Ok(defs) => defs,
            Err(e) => {
                warn!("camera store unreadable while building index: {e}");
                Vec::new()
            }
        };

        let mut map = HashMap::with_capacity(definitions.len().max(1));
        if definitions.is_empty() {
            map.insert(BASE_IDENTITY, CameraId::new(DEFAULT_CAMERA_ID));
            return map;
        }

        for def in definitions {
            let identity = derive_identity(&def.id);
            if let Some(previous) = map.insert(identity, def.id.clone()) {
                if previous != def.id {
                    warn!(
                        "identity collision on {identity}: '{previous}' replaced by '{}'",
                        def.id
                    );
                }
            }
        }
        map
    }

    /// Replace the whole map with a fresh scan.
    pub fn rebuild(&self) {
        let mut guard = self.map.write().unwrap_or_else(PoisonError::into_inner);
        let map = self.scan();
        debug!("registration index rebuilt with {} entries", map.len());
        *guard = Some(map);
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
    }

    /// Build on first use. Returns true if this call did the build.
    fn ensure_built(&self) -> bool {
        if self
            .map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
        {
            return false;
        }
        let mut guard = self.map.write().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return false;
        }
        let map = self.scan();
        debug!("registration index built with {} entries", map.len());
        *guard = Some(map);
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn get(&self, identity: &ClassIdentity) -> Option<CameraId> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|map| map.get(identity).cloned())
    }

    /// Resolve without the fallback. A miss against a map that was not built
    /// by this call triggers exactly one rebuild and a retry.
    pub fn lookup(&self, identity: &ClassIdentity) -> Option<CameraId> {
        let built_now = self.ensure_built();
        if let Some(id) = self.get(identity) {
            return Some(id);
        }
        if built_now {
            return None;
        }
        debug!("index miss for {identity}, rebuilding");
        self.rebuild();
        self.get(identity)
    }

    /// Resolve, routing unknown identities to `Camera1`.
    pub fn resolve(&self, identity: &ClassIdentity) -> CameraId {
        self.lookup(identity).unwrap_or_else(|| {
            warn!("identity {identity} not found, falling back to '{DEFAULT_CAMERA_ID}'");
            CameraId::new(DEFAULT_CAMERA_ID)
        })
    }

    /// Resolve an identity the host may not have supplied.
    pub fn resolve_optional(&self, identity: Option<&ClassIdentity>) -> CameraId {
        if let Some(identity) = identity {
            return self.resolve(identity);
        }
        if !self.ensure_built() {
            self.rebuild();
        }
        warn!("activation without identity, falling back to '{DEFAULT_CAMERA_ID}'");
        CameraId::new(DEFAULT_CAMERA_ID)
    }

    /// Snapshot of all entries, sorted by identity.
    pub fn entries(&self) -> Vec<(ClassIdentity, CameraId)> {
        self.ensure_built();
        let guard = self.map.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = guard
            .iter()
            .flat_map(|map| map.iter().map(|(k, v)| (*k, v.clone())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// How many times the map has been built, including the first build.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcam_schema::CameraDefinition;
    use netcam_store::StoreError;
    use std::sync::Mutex;

    /// Definition source whose contents can change between calls.
    #[derive(Default)]
    struct MemorySource {
        defs: Mutex<Vec<CameraDefinition>>,
        unreadable: Mutex<bool>,
        reads: AtomicUsize,
    }

    impl MemorySource {
        fn with(ids: &[&str]) -> Arc<Self> {
            let source = Self::default();
            source.set(ids);
            Arc::new(source)
        }

        fn set(&self, ids: &[&str]) {
            *self.defs.lock().unwrap() = ids
                .iter()
                .map(|id| CameraDefinition::with_defaults(*id))
                .collect();
        }
    }

    impl DefinitionSource for MemorySource {
        fn list_all(&self) -> Result<Vec<CameraDefinition>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if *self.unreadable.lock().unwrap() {
                return Err(StoreError::Io(std::io::Error::from(
                    std::io::ErrorKind::PermissionDenied,
                )));
            }
            Ok(self.defs.lock().unwrap().clone())
        }

        fn get(&self, camera_id: &str) -> Result<CameraDefinition, StoreError> {
            self.defs
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.id == camera_id)
                .cloned()
                .ok_or_else(|| StoreError::CameraNotFound(camera_id.to_owned()))
        }
    }

    #[test]
    fn resolves_stored_ids() {
        let source = MemorySource::with(&["Camera1", "Camera2", "Porch"]);
        let index = RegistrationIndex::new(source);
        for id in ["Camera1", "Camera2", "Porch"] {
            assert_eq!(index.resolve(&derive_identity(id)), id);
        }
        assert_eq!(index.rebuild_count(), 1);
    }

    #[test]
    fn unknown_identity_falls_back_to_camera1() {
        let index = RegistrationIndex::new(MemorySource::with(&["Camera2", "Camera3"]));
        assert_eq!(index.resolve(&derive_identity("Nope")), "Camera1");
        assert_eq!(index.lookup(&derive_identity("Nope")), None);
    }

    #[test]
    fn build_is_lazy() {
        let source = MemorySource::with(&["Camera1"]);
        let index = RegistrationIndex::new(source.clone());
        assert_eq!(source.reads.load(Ordering::SeqCst), 0);
        index.resolve(&derive_identity("Camera1"));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn miss_rebuilds_exactly_once() {
        let source = MemorySource::with(&["Camera1"]);
        let index = RegistrationIndex::new(source.clone());
        index.resolve(&derive_identity("Camera1"));
        assert_eq!(index.rebuild_count(), 1);

        source.set(&["Camera1", "Camera2"]);
        assert_eq!(index.resolve(&derive_identity("Camera2")), "Camera2");
        assert_eq!(index.rebuild_count(), 2);

        // Hits do not rebuild.
        index.resolve(&derive_identity("Camera2"));
        assert_eq!(index.rebuild_count(), 2);

        // A permanent miss rebuilds once per lookup, never loops.
        index.resolve(&derive_identity("Ghost"));
        assert_eq!(index.rebuild_count(), 3);
    }

    #[test]
    fn deleted_id_stays_resolvable_until_a_miss() {
        let source = MemorySource::with(&["Camera1", "Camera2"]);
        let index = RegistrationIndex::new(source.clone());
        index.resolve(&derive_identity("Camera1"));

        source.set(&["Camera1"]);
        assert_eq!(index.resolve(&derive_identity("Camera2")), "Camera2");

        index.resolve(&derive_identity("Ghost"));
        assert_eq!(index.resolve(&derive_identity("Camera2")), "Camera1");
    }

    #[test]
    fn empty_store_seeds_base_identity() {
        let index = RegistrationIndex::new(MemorySource::with(&[]));
        let entries = index.entries();
        assert_eq!(entries, vec![(BASE_IDENTITY, CameraId::new("Camera1"))]);
        assert_eq!(index.lookup(&BASE_IDENTITY), Some(CameraId::new("Camera1")));
    }

    #[test]
    fn unreadable_store_seeds_base_identity() {
        let source = MemorySource::with(&["Camera5"]);
        *source.unreadable.lock().unwrap() = true;
        let index = RegistrationIndex::new(source);
        assert_eq!(index.entries().len(), 1);
        assert_eq!(index.resolve(&derive_identity("Camera5")), "Camera1");
    }

    #[test]
    fn collision_last_enumerated_wins() {
        // "Aa" and "BB" share a 32-bit hash.
        assert_eq!(derive_identity("Aa"), derive_identity("BB"));

        let index = RegistrationIndex::new(MemorySource::with(&["Aa", "BB"]));
        assert_eq!(index.resolve(&derive_identity("Aa")), "BB");

        let index = RegistrationIndex::new(MemorySource::with(&["BB", "Aa"]));
        assert_eq!(index.resolve(&derive_identity("BB")), "Aa");
        assert_eq!(index.entries().len(), 1);
    }

    #[test]
    fn absent_identity_rebuilds_then_falls_back() {
        let index = RegistrationIndex::new(MemorySource::with(&["Camera2"]));
        index.entries();
        assert_eq!(index.rebuild_count(), 1);
        assert_eq!(index.resolve_optional(None), "Camera1");
        assert_eq!(index.rebuild_count(), 2);

        let id = derive_identity("Camera2");
        assert_eq!(index.resolve_optional(Some(&id)), "Camera2");
    }

    #[test]
    fn concurrent_resolves_agree() {
        let ids: Vec<String> = (1..=20).map(|n| format!("Camera{n}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let index = Arc::new(RegistrationIndex::new(MemorySource::with(&refs)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let index = Arc::clone(&index);
                let ids = ids.clone();
                std::thread::spawn(move || {
                    for (i, id) in ids.iter().enumerate() {
                        if (i + t) % 5 == 0 {
                            index.rebuild();
                        }
                        assert_eq!(index.resolve(&derive_identity(id)), id.as_str());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
