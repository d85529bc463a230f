//! Configuration file support for l2vcmgrd
//!
//! Loads and validates l2vcmgrd configuration from TOML files.
//! Default location: /etc/l2vc/l2vcmgrd.conf

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use l2vc_cfgmgr_common::shell::DEFAULT_CLI_PROGRAM;
use l2vc_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::dialect::DialectId;
use crate::tables::DEFAULT_CONFIG_PATH;

/// Device access configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Dialects in read order; the first one supporting a circuit kind
    /// writes it
    #[serde(default = "default_dialects")]
    pub dialects: Vec<DialectId>,

    /// CLI wrapper program receiving one `-c` argument per line
    #[serde(default = "default_cli_program")]
    pub cli_program: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete l2vcmgrd configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct L2vcConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_dialects() -> Vec<DialectId> {
    vec![DialectId::Iosxr, DialectId::Ironware]
}

fn default_cli_program() -> String {
    DEFAULT_CLI_PROGRAM.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            dialects: default_dialects(),
            cli_program: default_cli_program(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl L2vcConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> CfgMgrResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                CfgMgrError::invalid_config(
                    "config file",
                    format!("Failed to parse {}: {}", path.display(), e),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Logging is not initialised yet; it depends on this file.
                eprintln!(
                    "l2vcmgrd: Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(CfgMgrError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> CfgMgrResult<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Validate configuration
    pub fn validate(&self) -> CfgMgrResult<()> {
        if self.device.dialects.is_empty() {
            return Err(CfgMgrError::invalid_config(
                "device.dialects",
                "at least one dialect is required",
            ));
        }

        for (i, id) in self.device.dialects.iter().enumerate() {
            if self.device.dialects[..i].contains(id) {
                return Err(CfgMgrError::invalid_config(
                    "device.dialects",
                    format!("dialect '{}' listed twice", id),
                ));
            }
        }

        if self.device.cli_program.trim().is_empty() {
            return Err(CfgMgrError::invalid_config(
                "device.cli_program",
                "must not be empty",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(CfgMgrError::invalid_config("logging.level", "must not be empty"));
        }

        Ok(())
    }
}
