use super::{
    camera_store, colorize_state, core_failure, json_pretty, layout, EXIT_FAILURE, EXIT_SUCCESS,
};
use netcam_core::{shutdown_requested, CameraManager, Settings, ShutdownReport, StartupReport};
use netcam_runtime::{select_backend, VirtualCameraBackend};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn send_notification(summary: &str, body: &str) {
    if let Err(e) = notify_rust::Notification::new()
        .appname("NetCam")
        .summary(summary)
        .body(body)
        .timeout(notify_rust::Timeout::Milliseconds(5000))
        .show()
    {
        debug!("desktop notification failed (non-fatal): {e}");
    }
}

fn print_startup(report: &StartupReport) {
    println!("status: {}", colorize_state(&report.status.to_string()));
    for id in &report.started {
        println!("  {} {id}", colorize_state("running"));
    }
    if let Some(failure) = &report.failure {
        println!("  {} {}: {}", colorize_state("failed"), failure.camera_id, failure.cause);
    }
    for id in &report.skipped {
        println!("  skipped {id}");
    }
    for id in &report.disabled {
        println!("  {} {id}", colorize_state("disabled"));
    }
}

fn print_shutdown(report: &ShutdownReport) {
    for id in &report.stopped {
        println!("  {} {id}", colorize_state("stopped"));
    }
    for failure in &report.failures {
        eprintln!("  failed to stop {}: {}", failure.camera_id, failure.cause);
    }
}

fn notify_startup(report: &StartupReport) {
    match &report.failure {
        None => send_notification(
            "NetCam cameras running",
            &format!("{} virtual cameras started", report.started.len()),
        ),
        Some(failure) => send_notification(
            "NetCam degraded",
            &format!(
                "camera '{}' failed to start: {}",
                failure.camera_id, failure.cause
            ),
        ),
    }
}

pub fn run(settings: &Settings, once: bool, json: bool) -> Result<u8, String> {
    let backend: Arc<dyn VirtualCameraBackend> = select_backend(&settings.backend, &layout(settings))
        .map_err(|e| e.to_string())?
        .into();
    if !backend.available() {
        return Err(format!(
            "backend '{}' is not available (is {} initialized?)",
            backend.name(),
            settings.store.display()
        ));
    }

    let mut manager = CameraManager::new(backend, camera_store(settings));
    let startup = manager.startup().map_err(|e| core_failure(&e))?;

    if !json {
        print_startup(&startup);
    }
    if !once {
        notify_startup(&startup);
        if !json {
            println!("press Ctrl-C to stop");
        }
        while !shutdown_requested() {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    let shutdown = manager.shutdown();
    if json {
        let payload = serde_json::json!({
            "startup": startup,
            "shutdown": shutdown,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        print_shutdown(&shutdown);
    }

    Ok(if startup.is_degraded() || !shutdown.failures.is_empty() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}
