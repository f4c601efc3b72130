use super::{camera_store, class_registry, core_failure, json_pretty, EXIT_SUCCESS};
use netcam_core::{Provider, Settings};

pub fn run(settings: &Settings, json: bool) -> Result<u8, String> {
    let registry = class_registry(settings);
    let removed = Provider::new(camera_store(settings))
        .unregister_server(&registry)
        .map_err(|e| core_failure(&e))?;

    if json {
        let ids: Vec<_> = removed.iter().map(|(identity, _)| identity).collect();
        let payload = serde_json::json!({
            "status": "unregistered",
            "classes": ids,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("unregistered {} classes", removed.len());
    }
    Ok(EXIT_SUCCESS)
}
