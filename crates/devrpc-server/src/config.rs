//! RON server configuration.
//!
//! ```ron
//! (
//!     bind: "127.0.0.1:8910",
//!     image_dir: "/var/lib/devrpc",
//!     devices: [
//!         (name: "ram0", type: "RAM", opts: "{\"size\": 65536}"),
//!         (name: "img0", type: "FILE", opts: "{\"path\": \"flash.bin\", \"size\": 1048576}"),
//!     ],
//! )
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use devrpc_kernel::DeviceRegistry;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BIND_ADDRESS, DEFAULT_IMAGE_DIR};

/// A device created at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific options, passed through verbatim.
    #[serde(default)]
    pub opts: String,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
    /// Directory that `FILE` device images must live under.
    pub image_dir: PathBuf,
    /// Devices registered before the first request is served.
    pub devices: Vec<DeviceConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDRESS.to_string(),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            devices: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = ron::from_str(text)?;
        config.bind_addr()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron(&text)
    }

    /// The bind address, parsed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }

    /// Create the configured devices in `registry`.
    ///
    /// A device that fails to create is logged and skipped. Returns the
    /// number of devices created.
    pub fn create_devices(&self, registry: &DeviceRegistry) -> usize {
        let mut created = 0;
        for dev in &self.devices {
            match registry.create_and_register(&dev.kind, &dev.opts, &dev.name) {
                Ok(()) => created += 1,
                Err(e) => {
                    tracing::warn!(
                        name = %dev.name,
                        kind = %dev.kind,
                        error = %e,
                        "skipping device"
                    );
                }
            }
        }
        created
    }
}

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid bind address: {0}")]
    InvalidBind(String),
}
