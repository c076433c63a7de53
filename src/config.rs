//! Service configuration.
//!
//! Layered the same way for every bin: optional JSON config file named by
//! `EWASTE_CONFIG`, then environment overrides, then validation. The model
//! artifact path is configuration read once at startup, never per request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::aggregate::normalize_class_name;

const DEFAULT_API_ADDR: &str = "127.0.0.1:8700";
const DEFAULT_MODEL_PATH: &str = "models/best.onnx";
const DEFAULT_MODEL_INPUT_SIZE: u32 = 640;
const DEFAULT_DETECT_TIMEOUT_SECS: u64 = 30;

/// Detector class table in the model's training order.
///
/// This must match the artifact the service is deployed with; deployments
/// with a different training order override it via `model.class_names`.
const DEFAULT_CLASS_NAMES: &[&str] = &[
    "battery",
    "cable",
    "computer",
    "crt monitor",
    "dryer",
    "electronics",
    "headphone",
    "keyboard",
    "lcd monitor",
    "mobile",
    "modem",
    "mouse",
    "other_ewaste",
    "pcb",
    "pendrive",
    "printer",
    "remote",
];

#[derive(Debug, Deserialize, Default)]
struct ServiceConfigFile {
    api: Option<ApiConfigFile>,
    model: Option<ModelConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    input_size: Option<u32>,
    class_names: Option<Vec<String>>,
    detect_timeout_secs: Option<u64>,
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub api_addr: String,
    pub model: ModelSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Filesystem location of the ONNX artifact.
    pub path: PathBuf,
    /// Square model input edge in pixels.
    pub input_size: u32,
    /// Class table in training order.
    pub class_names: Vec<String>,
    /// Per-request inference deadline.
    pub detect_timeout: Duration,
}

impl ServiceConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("EWASTE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ServiceConfigFile) -> Self {
        let api_addr = file
            .api
            .and_then(|api| api.addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        let model = file.model.unwrap_or_default();
        let settings = ModelSettings {
            path: model
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_size: model.input_size.unwrap_or(DEFAULT_MODEL_INPUT_SIZE),
            class_names: model.class_names.unwrap_or_else(|| {
                DEFAULT_CLASS_NAMES
                    .iter()
                    .map(|name| (*name).to_string())
                    .collect()
            }),
            detect_timeout: Duration::from_secs(
                model
                    .detect_timeout_secs
                    .unwrap_or(DEFAULT_DETECT_TIMEOUT_SECS),
            ),
        };
        Self {
            api_addr,
            model: settings,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("EWASTE_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(path) = std::env::var("EWASTE_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = PathBuf::from(path);
            }
        }
        if let Ok(timeout) = std::env::var("EWASTE_DETECT_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("EWASTE_DETECT_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.model.detect_timeout = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.model.input_size == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        if self.model.class_names.is_empty() {
            return Err(anyhow!("model class table must not be empty"));
        }
        for name in &mut self.model.class_names {
            let normalized = normalize_class_name(name);
            if normalized.is_empty() {
                return Err(anyhow!("model class table contains an empty name"));
            }
            *name = normalized;
        }
        if self.model.detect_timeout.is_zero() {
            return Err(anyhow!("detect timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ServiceConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let mut cfg = ServiceConfig::from_file(ServiceConfigFile::default());
        cfg.validate().unwrap();
        assert_eq!(cfg.api_addr, DEFAULT_API_ADDR);
        assert_eq!(cfg.model.path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(cfg.model.input_size, DEFAULT_MODEL_INPUT_SIZE);
        assert_eq!(cfg.model.class_names.len(), DEFAULT_CLASS_NAMES.len());
        assert_eq!(cfg.model.detect_timeout.as_secs(), 30);
    }

    #[test]
    fn validate_normalizes_class_names() {
        let mut cfg = ServiceConfig::from_file(ServiceConfigFile {
            api: None,
            model: Some(ModelConfigFile {
                class_names: Some(vec!["  Battery ".to_string(), "CRT Monitor".to_string()]),
                ..Default::default()
            }),
        });
        cfg.validate().unwrap();
        assert_eq!(cfg.model.class_names, vec!["battery", "crt monitor"]);
    }

    #[test]
    fn validate_rejects_zero_input_size() {
        let mut cfg = ServiceConfig::from_file(ServiceConfigFile {
            api: None,
            model: Some(ModelConfigFile {
                input_size: Some(0),
                ..Default::default()
            }),
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_class_table() {
        let mut cfg = ServiceConfig::from_file(ServiceConfigFile {
            api: None,
            model: Some(ModelConfigFile {
                class_names: Some(Vec::new()),
                ..Default::default()
            }),
        });
        assert!(cfg.validate().is_err());
    }
}
