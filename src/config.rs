use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::device::SyntheticConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub device: DeviceConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Where saved artifacts land; `~` is expanded
    pub downloads_path: String,
}

/// Synthetic device settings. Capture timing is not configurable here.
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    pub width: u32,
    pub height: u32,
    pub warmup_ms: u64,
}

impl Config {
    /// Load `<path>.toml` (optional) over built-in defaults, then apply
    /// `REACTION_CAPTURE__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "reaction-capture")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8787)?
            .set_default("storage.downloads_path", "~/Downloads")?
            .set_default("device.width", 640)?
            .set_default("device.height", 480)?
            .set_default("device.warmup_ms", 100)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("REACTION_CAPTURE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn downloads_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.storage.downloads_path)
            .with_context(|| format!("Failed to expand {}", self.storage.downloads_path))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    pub fn synthetic_device(&self) -> SyntheticConfig {
        SyntheticConfig {
            width: self.device.width,
            height: self.device.height,
            warmup: Duration::from_millis(self.device.warmup_ms),
            ..SyntheticConfig::default()
        }
    }
}
