use super::{
    camera_store, json_pretty, load_for_save, store_failure, CameraRow, EXIT_SUCCESS,
};
use netcam_core::Settings;
use netcam_schema::Resolution;

#[derive(Debug, Default)]
pub struct Changes {
    pub url: Option<String>,
    pub name: Option<String>,
    pub resolution: Option<Resolution>,
    pub enabled: Option<bool>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.name.is_none()
            && self.resolution.is_none()
            && self.enabled.is_none()
    }
}

pub fn run(settings: &Settings, camera_id: &str, changes: Changes, json: bool) -> Result<u8, String> {
    if changes.is_empty() {
        return Err("nothing to change (pass --url, --name, --resolution, --enable or --disable)".to_owned());
    }

    let store = camera_store(settings);
    let mut defs = load_for_save(&store)?;
    let def = defs
        .iter_mut()
        .find(|d| d.id == camera_id)
        .ok_or_else(|| format!("camera '{camera_id}' not found"))?;

    if let Some(url) = changes.url {
        def.url = url;
    }
    if let Some(name) = changes.name {
        def.friendly_name = name;
    }
    if let Some(resolution) = changes.resolution {
        def.set_resolution(resolution);
    }
    if let Some(enabled) = changes.enabled {
        def.enabled = enabled;
    }
    let updated = def.clone();

    store.save_all(&defs).map_err(|e| store_failure(&e))?;

    if json {
        let payload = serde_json::json!({
            "status": "updated",
            "camera": CameraRow::new(&updated),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("updated camera '{camera_id}'");
    }
    Ok(EXIT_SUCCESS)
}
