use super::{
    camera_store, class_registry, core_failure, json_pretty, maybe_spinner, spin_fail, spin_ok,
    EXIT_SUCCESS,
};
use netcam_core::{Provider, Settings};
use std::path::PathBuf;

pub fn run(settings: &Settings, module: Option<PathBuf>, json: bool) -> Result<u8, String> {
    let module = module.unwrap_or_else(|| settings.module_path.clone());
    let module = module.to_string_lossy();
    let registry = class_registry(settings);
    let provider = Provider::new(camera_store(settings));

    let pb = maybe_spinner(json, "registering classes...");
    let registered = match provider.register_server(&registry, &module) {
        Ok(entries) => entries,
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "registration failed");
            }
            return Err(core_failure(&e));
        }
    };
    if let Some(pb) = &pb {
        spin_ok(pb, &format!("registered {} classes", registered.len()));
    }

    if json {
        let entries: Vec<_> = registered
            .iter()
            .map(|(identity, camera_id)| {
                serde_json::json!({ "identity": identity, "camera_id": camera_id })
            })
            .collect();
        let payload = serde_json::json!({
            "status": "registered",
            "module_path": module,
            "classes": entries,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for (identity, camera_id) in &registered {
            println!("  {identity}  {camera_id}");
        }
    }
    Ok(EXIT_SUCCESS)
}
