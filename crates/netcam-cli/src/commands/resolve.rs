use super::{camera_store, json_pretty, parse_identity, EXIT_SUCCESS};
use netcam_core::{Provider, Settings};
use netcam_schema::{CameraId, DEFAULT_CAMERA_ID};

pub fn run(settings: &Settings, input: &str, json: bool) -> Result<u8, String> {
    let identity = parse_identity(input)?;
    let provider = Provider::new(camera_store(settings));
    let index = provider.index();

    let found = index.lookup(&identity);
    let fallback = found.is_none();
    let camera_id = found.unwrap_or_else(|| CameraId::new(DEFAULT_CAMERA_ID));

    if json {
        let payload = serde_json::json!({
            "identity": identity,
            "camera_id": camera_id,
            "fallback": fallback,
            "index_builds": index.rebuild_count(),
        });
        println!("{}", json_pretty(&payload)?);
    } else if fallback {
        println!("{camera_id} (fallback: {identity} is not in the store)");
    } else {
        println!("{camera_id}");
    }
    Ok(EXIT_SUCCESS)
}
