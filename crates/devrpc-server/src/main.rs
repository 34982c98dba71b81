//! devrpc server binary
//!
//! ## Usage
//!
//! ```bash
//! # Run with ./devrpc.ron if present, defaults otherwise
//! devrpc-server
//!
//! # Explicit config, bind address and image root
//! devrpc-server --config /etc/devrpc.ron --bind 0.0.0.0:8910 --image-dir /var/lib/devrpc
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use devrpc_server::constants::{DEFAULT_BIND_ADDRESS, DEFAULT_CONFIG_FILE, DEFAULT_IMAGE_DIR};
use devrpc_server::{DevRpcServer, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!(
        r#"devrpc-server - block device RPC server

USAGE:
    devrpc-server [OPTIONS]

OPTIONS:
    --config <PATH>               RON config file (default: ./{config} if present)
    --bind <ADDR>                 Listen address (default: {bind})
    --image-dir <DIR>             Root for FILE device images (default: {image_dir})
    --help, -h                    Show this help

METHODS:
    Dev.Create  {{name, type, opts?}}
    Dev.Read    {{name, offset?, len}}
    Dev.Write   {{name, offset?, data, erase_len?}}
    Dev.Erase   {{name, offset?, len}}
    Dev.Remove  {{name}}
    Dev.GetInfo {{name}}
"#,
        config = DEFAULT_CONFIG_FILE,
        bind = DEFAULT_BIND_ADDRESS,
        image_dir = DEFAULT_IMAGE_DIR,
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut config_path: Option<PathBuf> = None;
    let mut bind: Option<String> = None;
    let mut image_dir: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            "--config" | "--bind" | "--image-dir" if i + 1 >= args.len() => {
                eprintln!("{} requires a value", args[i]);
                return ExitCode::FAILURE;
            }
            "--config" => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--bind" => {
                bind = Some(args[i + 1].clone());
                i += 2;
            }
            "--image-dir" => {
                image_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_usage();
                return ExitCode::FAILURE;
            }
        }
    }

    let mut config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind) = bind {
        config.bind = bind;
    }
    if let Some(image_dir) = image_dir {
        config.image_dir = image_dir;
    }

    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = DevRpcServer::from_config(&config);
    if let Err(e) = server.run(addr).await {
        tracing::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Load the explicit config, or the default file if it exists.
fn load_config(path: Option<&Path>) -> Result<ServerConfig, devrpc_server::ConfigError> {
    match path {
        Some(path) => ServerConfig::load(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => ServerConfig::load(DEFAULT_CONFIG_FILE),
        None => Ok(ServerConfig::default()),
    }
}
