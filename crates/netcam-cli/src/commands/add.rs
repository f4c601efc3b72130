use super::{
    camera_store, json_pretty, load_for_save, maybe_spinner, spin_fail, spin_ok, store_failure,
    CameraRow, EXIT_SUCCESS,
};
use netcam_core::Settings;
use netcam_schema::{generate_unique_id, validate_camera_id, CameraDefinition, CameraId, Resolution};
use std::collections::HashSet;

pub struct NewCamera {
    pub id: Option<String>,
    pub url: String,
    pub name: Option<String>,
    pub resolution: Resolution,
    pub enabled: bool,
}

impl NewCamera {
    fn into_definition(self, id: CameraId) -> CameraDefinition {
        let mut def = CameraDefinition::with_defaults(id);
        def.url = self.url;
        if let Some(name) = self.name {
            def.friendly_name = name;
        }
        def.set_resolution(self.resolution);
        def.enabled = self.enabled;
        def
    }
}

pub fn run(settings: &Settings, camera: NewCamera, json: bool) -> Result<u8, String> {
    let store = camera_store(settings);
    let mut defs = load_for_save(&store)?;

    let id = match camera.id.as_deref() {
        Some(id) => {
            validate_camera_id(id).map_err(|e| e.to_string())?;
            if defs.iter().any(|d| d.id == id) {
                return Err(format!("camera '{id}' already exists"));
            }
            CameraId::new(id)
        }
        None => {
            let existing: HashSet<String> = defs.iter().map(|d| d.id.to_string()).collect();
            generate_unique_id(&existing)
        }
    };

    let def = camera.into_definition(id);
    defs.push(def.clone());

    let pb = maybe_spinner(json, &format!("saving camera '{}'...", def.id));
    if let Err(e) = store.save_all(&defs) {
        if let Some(pb) = &pb {
            spin_fail(pb, "save failed");
        }
        return Err(store_failure(&e));
    }
    if let Some(pb) = &pb {
        spin_ok(pb, &format!("added camera '{}'", def.id));
    }

    if json {
        let payload = serde_json::json!({
            "status": "added",
            "camera": CameraRow::new(&def),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("identity: {}", CameraRow::new(&def).identity);
    }
    Ok(EXIT_SUCCESS)
}
