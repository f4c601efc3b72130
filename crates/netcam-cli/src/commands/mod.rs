pub mod activate;
pub mod add;
pub mod completions;
pub mod doctor;
pub mod edit;
pub mod identity;
pub mod list;
pub mod man_pages;
pub mod register;
pub mod remove;
pub mod resolve;
pub mod run;
pub mod unregister;

use indicatif::{ProgressBar, ProgressStyle};
use netcam_core::{CoreError, Settings};
use netcam_schema::{derive_identity, CameraDefinition, ClassIdentity};
use netcam_store::{CameraStore, ClassRegistry, StoreError, StoreLayout};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Spinner on a terminal, nothing when printing JSON.
pub fn maybe_spinner(json: bool, msg: &str) -> Option<ProgressBar> {
    (!json).then(|| spinner(msg))
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "enabled" | "active" => Style::new().green().apply_to(state).to_string(),
        "running" => Style::new().cyan().bold().apply_to(state).to_string(),
        "disabled" | "stopped" => Style::new().dim().apply_to(state).to_string(),
        "degraded" => Style::new().yellow().bold().apply_to(state).to_string(),
        "failed" => Style::new().red().bold().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

/// Store failures as `store error: ...`, with the remediation hint when one applies.
pub fn store_failure(e: &StoreError) -> String {
    match e.remediation() {
        Some(hint) => format!("store error: {e} (hint: {hint})"),
        None => format!("store error: {e}"),
    }
}

pub fn core_failure(e: &CoreError) -> String {
    match e.remediation() {
        Some(hint) => format!("{e} (hint: {hint})"),
        None => e.to_string(),
    }
}

pub fn layout(settings: &Settings) -> StoreLayout {
    StoreLayout::new(&settings.store)
}

pub fn camera_store(settings: &Settings) -> Arc<CameraStore> {
    Arc::new(CameraStore::new(layout(settings)))
}

pub fn class_registry(settings: &Settings) -> ClassRegistry {
    ClassRegistry::new(layout(settings))
}

/// Definitions an editor command will write back. Nodes the store could not
/// read are reported, since the replace-all save deletes them.
pub fn load_for_save(store: &CameraStore) -> Result<Vec<CameraDefinition>, String> {
    let (defs, skipped) = store.list_with_skipped().map_err(|e| store_failure(&e))?;
    for name in &skipped {
        eprintln!(
            "{} camera '{name}' is unreadable and will be removed by this save",
            console::style("warning:").yellow().bold()
        );
    }
    Ok(defs)
}

pub fn parse_identity(input: &str) -> Result<ClassIdentity, String> {
    input.parse().map_err(|e| format!("{e}"))
}

/// A definition together with its derived identity, as printed by `list` and friends.
#[derive(Debug, Serialize)]
pub struct CameraRow<'a> {
    #[serde(flatten)]
    pub definition: &'a CameraDefinition,
    pub identity: ClassIdentity,
    pub resolution: Option<String>,
}

impl<'a> CameraRow<'a> {
    pub fn new(definition: &'a CameraDefinition) -> Self {
        Self {
            definition,
            identity: derive_identity(&definition.id),
            resolution: definition.resolution().map(|r| r.to_string()),
        }
    }
}

pub fn sort_by_id(defs: &mut [CameraDefinition]) {
    defs.sort_by(|a, b| a.id.cmp(&b.id));
}
