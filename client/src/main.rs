//! nowdeploy - Entry Point
//!
//! Deploys a set of files and prints every lifecycle event as a JSON line.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use nowdeploy::app::options::SessionOptions;
use nowdeploy::app::session::DeploymentSession;
use nowdeploy::deploy::creator::ManifestOptions;
use nowdeploy::events::LifecycleEvent;
use nowdeploy::logs::{init_logging, LogOptions};
use nowdeploy::models::file::FileInput;
use nowdeploy::storage::settings::Settings;
use nowdeploy::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    let mut paths: Vec<PathBuf> = Vec::new();

    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=').filter(|_| arg.starts_with("--")) {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        } else {
            paths.push(PathBuf::from(&arg));
        }
    }

    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let settings = match cli_args.get("config") {
        Some(path) => match Settings::load(&PathBuf::from(path)).await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: cli_args.contains_key("json-logs"),
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let mut metadata = serde_json::Map::new();
    if let Some(name) = cli_args.get("name") {
        metadata.insert("name".to_string(), name.clone().into());
    }

    let options = SessionOptions {
        token: cli_args
            .get("token")
            .cloned()
            .or_else(|| env::var("NOWDEPLOY_TOKEN").ok())
            .unwrap_or_default(),
        team_id: cli_args.get("team").cloned(),
        manifest: ManifestOptions {
            metadata,
            default_name: None,
            root: cli_args.get("root").map(PathBuf::from),
        },
        client: settings.client_options(),
        polling_interval: settings.polling_interval(),
        upload_retry: settings.upload_retry(),
        ..Default::default()
    };

    let inputs = paths.into_iter().map(FileInput::from_path).collect();
    let mut session = match DeploymentSession::start(inputs, options) {
        Ok(session) => session,
        Err(e) => {
            println!("{}", LifecycleEvent::Error(e.report()).to_json());
            return ExitCode::FAILURE;
        }
    };

    info!("Deployment session started");
    let shutdown = await_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = session.next_event() => {
                let Some(event) = event else {
                    error!("Event stream ended without a terminal event");
                    return ExitCode::FAILURE;
                };

                println!("{}", event.to_json());
                match event {
                    LifecycleEvent::Ready(_) => return ExitCode::SUCCESS,
                    LifecycleEvent::Error(_) => return ExitCode::FAILURE,
                    _ => {}
                }
            }
            _ = &mut shutdown => {
                session.cancel();
                return ExitCode::from(130);
            }
        }
    }
}

async fn await_shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received, cancelling deployment...");
}
