use super::{camera_store, colorize_state, core_failure, json_pretty, parse_identity, CameraRow, EXIT_SUCCESS};
use netcam_core::{Capability, ClientContext, Provider, Settings};

pub fn run(
    settings: &Settings,
    identity: Option<&str>,
    capability: Capability,
    pid: Option<u32>,
    json: bool,
) -> Result<u8, String> {
    let provider = Provider::new(camera_store(settings));

    let mut activator = match identity {
        Some(input) => {
            let identity = parse_identity(input)?;
            provider
                .get_class_object(&identity)
                .and_then(|factory| factory.create_instance())
                .map_err(|e| core_failure(&e))?
        }
        None => provider
            .create_anonymous_instance()
            .map_err(|e| core_failure(&e))?,
    };

    let client = ClientContext { pid };
    let instance = activator
        .activate(capability, &client)
        .map_err(|e| core_failure(&e))?;
    let state = activator.state();
    let definition = instance.definition().clone();
    drop(instance);
    activator.detach().map_err(|e| core_failure(&e))?;

    if json {
        let payload = serde_json::json!({
            "capability": capability,
            "state": state,
            "client": client.process_name(),
            "camera": CameraRow::new(&definition),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{} {} via {capability}",
            colorize_state(&state.to_string()),
            definition.id
        );
        println!("  name: {}", definition.friendly_name);
        println!("  url:  {}", definition.url);
        println!("  size: {}x{}", definition.width, definition.height);
    }
    Ok(EXIT_SUCCESS)
}
