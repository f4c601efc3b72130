mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_STORE_ERROR};
use netcam_core::{install_signal_handler, Capability, Overrides, Settings};
use netcam_schema::Resolution;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "netcam",
    version,
    about = "Configure, register and run network-backed virtual cameras"
)]
struct Cli {
    /// Path to the configuration store (overrides NETCAM_STORE and config.toml).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Activation backend: session or mock (overrides NETCAM_BACKEND).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List configured cameras.
    List,
    /// Add a camera definition.
    Add {
        /// Camera id (defaults to the lowest unused CameraN).
        #[arg(long)]
        id: Option<String>,
        /// Source URL.
        #[arg(long, default_value = "")]
        url: String,
        /// Name shown to applications.
        #[arg(long)]
        name: Option<String>,
        /// Frame size: 640x480, 800x600, 1024x768, 1280x720 or 1920x1080.
        #[arg(long, default_value = "640x480")]
        resolution: Resolution,
        /// Store the camera disabled.
        #[arg(long, default_value_t = false)]
        disabled: bool,
    },
    /// Change fields of an existing camera.
    Edit {
        /// Camera id.
        id: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        resolution: Option<Resolution>,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Delete a camera definition.
    Remove {
        /// Camera id.
        id: String,
        /// Do not ask for confirmation.
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Print the class identity derived from a camera id.
    Identity {
        /// Camera id.
        id: String,
    },
    /// Map a class identity back to a camera id.
    Resolve {
        /// Class identity, with or without braces.
        identity: String,
    },
    /// Run one activation request against the store, as the host would.
    Activate {
        /// Class identity (omit to activate without one).
        identity: Option<String>,
        /// Interface to request.
        #[arg(long, default_value = "media-source")]
        capability: Capability,
        /// Requesting process id, for diagnostics.
        #[arg(long)]
        pid: Option<u32>,
    },
    /// Register a class for every camera in the store.
    Register {
        /// Module that serves the classes (overrides config.toml).
        #[arg(long)]
        module: Option<PathBuf>,
    },
    /// Remove the class registration of every camera in the store.
    Unregister,
    /// Start every enabled camera and keep them running until interrupted.
    Run {
        /// Start, report, then stop immediately.
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// Run diagnostic checks on the system and store.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("NETCAM_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::load(Overrides {
        store: cli.store.clone(),
        backend: cli.backend.clone(),
        module_path: None,
    }) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let json = cli.json;

    let result = match cli.command {
        Commands::List => commands::list::run(&settings, json),
        Commands::Add {
            id,
            url,
            name,
            resolution,
            disabled,
        } => commands::add::run(
            &settings,
            commands::add::NewCamera {
                id,
                url,
                name,
                resolution,
                enabled: !disabled,
            },
            json,
        ),
        Commands::Edit {
            id,
            url,
            name,
            resolution,
            enable,
            disable,
        } => commands::edit::run(
            &settings,
            &id,
            commands::edit::Changes {
                url,
                name,
                resolution,
                enabled: match (enable, disable) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            },
            json,
        ),
        Commands::Remove { id, yes } => commands::remove::run(&settings, &id, yes, json),
        Commands::Identity { id } => commands::identity::run(&id, json),
        Commands::Resolve { identity } => commands::resolve::run(&settings, &identity, json),
        Commands::Activate {
            identity,
            capability,
            pid,
        } => commands::activate::run(&settings, identity.as_deref(), capability, pid, json),
        Commands::Register { module } => commands::register::run(&settings, module, json),
        Commands::Unregister => commands::unregister::run(&settings, json),
        Commands::Run { once } => {
            install_signal_handler();
            commands::run::run(&settings, once, json)
        }
        Commands::Doctor => commands::doctor::run(&settings, json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("store error:") {
                EXIT_STORE_ERROR
            } else if msg.starts_with("configuration error:") {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
