//! Replace-all save behaviour under OS-level failures.
#![allow(unsafe_code)]

use netcam_schema::CameraDefinition;
use netcam_store::{CameraStore, DefinitionSource, StoreError, StoreLayout, ELEVATION_HINT};
use std::fs;
use std::os::unix::fs::PermissionsExt;

/// Root bypasses permission checks, so permission tests are meaningless as uid 0.
fn skip_if_root() -> bool {
    // SAFETY: getuid() has no preconditions and cannot fail.
    unsafe {
        libc::getuid() == 0
    }
}

fn def(id: &str) -> CameraDefinition {
    let mut d = CameraDefinition::with_defaults(id);
    d.url = format!("http://cams.local/{id}");
    d
}

#[test]
fn failure_midway_keeps_only_earlier_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let store = CameraStore::new(StoreLayout::new(dir.path()));
    store
        .save_all(&[def("Camera1"), def("Camera2"), def("Camera3")])
        .unwrap();

    // 200 two-byte characters pass id validation but exceed the filesystem's
    // file name limit, so the OS refuses to create the node.
    let too_long = "é".repeat(200);
    let result = store.save_all(&[def("Camera1"), def(&too_long), def("Camera3")]);

    match result {
        Err(StoreError::SaveFailed { id, .. }) => assert_eq!(id, too_long),
        other => panic!("expected SaveFailed, got {other:?}"),
    }

    let ids: Vec<String> = store
        .list_all()
        .unwrap()
        .into_iter()
        .map(|d| d.id.into_inner())
        .collect();
    assert_eq!(ids, vec!["Camera1".to_owned()]);
}

#[test]
fn permission_denied_surfaces_id_and_remediation() {
    if skip_if_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    let store = CameraStore::new(StoreLayout::new(&root));
    store.save_all(&[]).unwrap();

    fs::set_permissions(&root, fs::Permissions::from_mode(0o555)).unwrap();
    let result = store.save_all(&[def("Camera1")]);
    fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

    let err = result.unwrap_err();
    assert!(
        matches!(&err, StoreError::SaveFailed { id, source }
            if id == "Camera1" && source.kind() == std::io::ErrorKind::PermissionDenied),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.remediation(), Some(ELEVATION_HINT));
}

#[test]
fn unreadable_container_is_an_error_not_empty() {
    if skip_if_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let store = CameraStore::new(StoreLayout::new(dir.path()));
    store.save_all(&[def("Camera1")]).unwrap();

    let cameras = store.layout().cameras_dir();
    fs::set_permissions(&cameras, fs::Permissions::from_mode(0o000)).unwrap();
    let result = store.list_all();
    fs::set_permissions(&cameras, fs::Permissions::from_mode(0o755)).unwrap();

    let err = result.unwrap_err();
    assert_eq!(err.remediation(), Some(ELEVATION_HINT));
}

#[test]
fn reader_sees_fresh_state_after_save_from_other_handle() {
    let dir = tempfile::tempdir().unwrap();
    let editor = CameraStore::new(StoreLayout::new(dir.path()));
    let reader = CameraStore::new(StoreLayout::new(dir.path()));

    editor.save_all(&[def("Camera1")]).unwrap();
    assert_eq!(reader.list_all().unwrap().len(), 1);

    editor.save_all(&[def("Camera1"), def("Camera2")]).unwrap();
    assert_eq!(reader.list_all().unwrap().len(), 2);
    assert_eq!(reader.get("Camera2").unwrap().url, "http://cams.local/Camera2");
}
