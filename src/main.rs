//! Remotepad daemon - exposes typed UI control values over a line-oriented
//! TCP protocol and advertises them via an Avahi service file.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use remotepad_daemon::config::{LoggingConfig, Settings};
use remotepad_daemon::socket::ControlServer;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    if args.is_empty() {
        eprintln!("No parameters given. Run with --help for usage information.");
        return ExitCode::FAILURE;
    }

    // Either a TOML config file or the positional CLI form.
    let settings = match get_config_path(&args) {
        Some(path) => Settings::load(&path),
        None => Settings::from_args(&args),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings.logging);

    info!("Starting {} v{}", NAME, VERSION);
    info!("Descriptor file: {}", settings.descriptor.path.display());

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    match runtime.block_on(async_main(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Daemon failed");
            ExitCode::FAILURE
        }
    }
}

/// Async main function.
async fn async_main(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let server = ControlServer::new(&settings);

    let shutdown = Arc::new(Notify::new());
    let mut serving = tokio::spawn(server.run(Arc::clone(&shutdown)));

    tokio::select! {
        result = &mut serving => {
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, initiating graceful shutdown...");
            // notify_one stores a permit, so the signal is not lost if the
            // server is between two waits on the Notify.
            shutdown.notify_one();
        }
    }

    serving.await??;
    info!("Daemon stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Daemon exposing remote-controllable UI values over TCP, advertised via an
Avahi service file.

USAGE:
    {} <descriptor-path> <port> [<controls>]
    {} --config <path>

ARGUMENTS:
    <descriptor-path>      Absolute path to the Avahi .service file
    <port>                 Port to listen on (0 for an ephemeral port)
    <controls>             Control elements to expose, one flag each

CONTROLS (one per):
    -b, --button           A simple toggle button element
    -p, --colorpicker      A colorpicker element
    -t, --textfield        A textfield element
    -c, --checkbox         A checkbox element

OPTIONS:
        --config <PATH>    Load settings from a TOML file instead
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME, NAME
    );
}

/// Get configuration file path from command line arguments, if given.
fn get_config_path(args: &[String]) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if arg == "--config" && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

/// Initialize logging based on settings.
fn init_logging(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}
