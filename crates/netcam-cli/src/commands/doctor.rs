use super::{camera_store, class_registry, layout, EXIT_FAILURE, EXIT_SUCCESS};
use netcam_core::Settings;
use netcam_runtime::select_backend;
use netcam_schema::{derive_identity, ClassIdentity};
use netcam_store::{DefinitionSource, StoreError, StoreLayout, ELEVATION_HINT};
use std::collections::BTreeMap;

pub fn run(settings: &Settings, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_privileges(&mut checks);
    match &settings.config_file {
        Some(path) => checks.push(Check::info(
            "config_file",
            &format!("Using config file {}", path.display()),
        )),
        None => checks.push(Check::info("config_file", "No config file, using defaults")),
    }

    let layout = layout(settings);
    if layout.root().exists() {
        checks.push(Check::pass(
            "store_exists",
            &format!("Store found at {}", settings.store.display()),
        ));
        check_store(&layout, &mut checks, &mut all_pass);
        check_cameras(settings, &mut checks, &mut all_pass);
    } else {
        checks.push(Check::info(
            "store_exists",
            &format!(
                "Store not initialized at {} (created by the first `netcam add`)",
                settings.store.display()
            ),
        ));
    }

    check_backend(settings, &layout, &mut checks, &mut all_pass);
    print_results(&checks, all_pass, json_output)
}

fn check_privileges(checks: &mut Vec<Check>) {
    // SAFETY: geteuid() has no preconditions and cannot fail.
    #[allow(unsafe_code)]
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        checks.push(Check::pass("privileges", "Running with elevated privileges"));
    } else {
        checks.push(Check::info(
            "privileges",
            &format!("Running as uid {euid}; writes to a system store may need elevation"),
        ));
    }
}

fn check_store(layout: &StoreLayout, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match layout.verify_version() {
        Ok(()) => checks.push(Check::pass("store_version", "Store format version valid")),
        Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            checks.push(Check::warn(
                "store_version",
                "Store has no version marker (written on next save)",
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "store_version",
                &format!("Store version check failed: {e}"),
            ));
        }
    }
}

fn check_cameras(settings: &Settings, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let defs = match camera_store(settings).list_all() {
        Ok(defs) => defs,
        Err(e) => {
            *all_pass = false;
            let hint = e.remediation().unwrap_or(ELEVATION_HINT);
            checks.push(Check::fail(
                "cameras",
                &format!("Cannot read camera definitions: {e} ({hint})"),
            ));
            return;
        }
    };

    let enabled: Vec<_> = defs.iter().filter(|d| d.enabled).collect();
    if enabled.is_empty() {
        checks.push(Check::warn(
            "cameras",
            &format!("{} cameras, none enabled; `netcam run` will refuse to start", defs.len()),
        ));
    } else {
        checks.push(Check::pass(
            "cameras",
            &format!("{} cameras ({} enabled)", defs.len(), enabled.len()),
        ));
    }

    let mut by_identity: BTreeMap<ClassIdentity, Vec<&str>> = BTreeMap::new();
    for def in &defs {
        by_identity
            .entry(derive_identity(&def.id))
            .or_default()
            .push(def.id.as_str());
    }
    let collisions: Vec<_> = by_identity
        .iter()
        .filter(|(_, ids)| ids.len() > 1)
        .collect();
    if collisions.is_empty() {
        checks.push(Check::pass("identities", "All camera identities are distinct"));
    } else {
        for (identity, ids) in collisions {
            checks.push(Check::warn(
                "identities",
                &format!("Identity {identity} is shared by {}; only one is reachable", ids.join(", ")),
            ));
        }
    }

    let registry = class_registry(settings);
    let unregistered: Vec<&str> = enabled
        .iter()
        .filter(|d| !registry.is_registered(&derive_identity(&d.id)))
        .map(|d| d.id.as_str())
        .collect();
    if unregistered.is_empty() {
        checks.push(Check::pass(
            "class_registration",
            "Every enabled camera has a class registration",
        ));
    } else {
        checks.push(Check::warn(
            "class_registration",
            &format!(
                "Not registered: {} (run `netcam register`)",
                unregistered.join(", ")
            ),
        ));
    }
}

fn check_backend(
    settings: &Settings,
    layout: &StoreLayout,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    match select_backend(&settings.backend, layout) {
        Ok(backend) if backend.available() => checks.push(Check::pass(
            "backend",
            &format!("Backend '{}' available", backend.name()),
        )),
        Ok(backend) => checks.push(Check::warn(
            "backend",
            &format!("Backend '{}' not available yet", backend.name()),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("backend", &e.to_string()));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("NetCam Doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
