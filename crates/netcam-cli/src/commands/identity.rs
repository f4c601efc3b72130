use super::{json_pretty, EXIT_SUCCESS};
use netcam_schema::{derive_identity, IDENTITY_ALGORITHM_VERSION};

pub fn run(camera_id: &str, json: bool) -> Result<u8, String> {
    let identity = derive_identity(camera_id);
    if json {
        let payload = serde_json::json!({
            "camera_id": camera_id,
            "identity": identity,
            "algorithm_version": IDENTITY_ALGORITHM_VERSION,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{identity}");
    }
    Ok(EXIT_SUCCESS)
}
