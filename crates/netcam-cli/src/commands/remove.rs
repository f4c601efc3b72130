use super::{
    camera_store, json_pretty, load_for_save, store_failure, EXIT_FAILURE, EXIT_SUCCESS,
};
use dialoguer::Confirm;
use netcam_core::Settings;
use std::io::{stderr, stdin, IsTerminal};

fn confirmed(camera_id: &str, yes: bool) -> Result<bool, String> {
    if yes {
        return Ok(true);
    }
    if !(stdin().is_terminal() && stderr().is_terminal()) {
        return Err(format!("refusing to remove '{camera_id}' without confirmation (pass --yes)"));
    }
    Confirm::new()
        .with_prompt(format!("remove camera '{camera_id}'?"))
        .default(false)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))
}

pub fn run(settings: &Settings, camera_id: &str, yes: bool, json: bool) -> Result<u8, String> {
    let store = camera_store(settings);
    let mut defs = load_for_save(&store)?;
    let before = defs.len();
    defs.retain(|d| d.id != camera_id);
    if defs.len() == before {
        return Err(format!("camera '{camera_id}' not found"));
    }

    if !confirmed(camera_id, yes)? {
        println!("aborted");
        return Ok(EXIT_FAILURE);
    }

    store.save_all(&defs).map_err(|e| store_failure(&e))?;

    if json {
        let payload = serde_json::json!({
            "status": "removed",
            "camera_id": camera_id,
            "remaining": defs.len(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("removed camera '{camera_id}'");
    }
    Ok(EXIT_SUCCESS)
}
