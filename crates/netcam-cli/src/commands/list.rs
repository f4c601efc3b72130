use super::{camera_store, colorize_state, json_pretty, sort_by_id, store_failure, CameraRow, EXIT_SUCCESS};
use netcam_core::Settings;
use netcam_store::DefinitionSource;

pub fn run(settings: &Settings, json: bool) -> Result<u8, String> {
    let mut defs = camera_store(settings)
        .list_all()
        .map_err(|e| store_failure(&e))?;
    sort_by_id(&mut defs);

    if json {
        let rows: Vec<_> = defs.iter().map(CameraRow::new).collect();
        println!("{}", json_pretty(&rows)?);
    } else if defs.is_empty() {
        println!("no cameras configured");
    } else {
        println!(
            "{:<12} {:<9} {:<10} {:<40} URL",
            "ID", "STATE", "SIZE", "IDENTITY"
        );
        for def in &defs {
            let row = CameraRow::new(def);
            let state = if def.enabled { "enabled" } else { "disabled" };
            let size = row
                .resolution
                .unwrap_or_else(|| format!("{}x{}?", def.width, def.height));
            println!(
                "{:<12} {:<9} {:<10} {:<40} {}",
                def.id,
                colorize_state(state),
                size,
                row.identity,
                def.url
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
