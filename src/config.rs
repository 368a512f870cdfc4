use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Config {
    pub server: ServerConfig,
    pub optimizer: OptimizerConfig,
    #[validate(nested)]
    pub smart_charging: SmartChargingConfig,
    pub controller: ControllerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Connection to the external charging optimizer
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OptimizerConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub timeout_seconds: u64,
}

/// Tuning of the request/response translation
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SmartChargingConfig {
    /// Never grant more than a session currently draws (plus buffer)
    pub sticky_limitation: bool,
    #[validate(range(min = 0.0, max = 100.0))]
    pub limit_buffer_ac_percent: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub limit_buffer_dc_percent: f64,
    #[validate(range(min = 0.0))]
    pub min_current_per_phase_amps: f64,
    #[validate(range(min = 1))]
    pub max_schedule_periods: usize,
    #[validate(range(min = 1.0, max = 100.0))]
    pub default_dc_efficiency_percent: f64,
    pub charging_profile_stack_level: i32,
}

impl Default for SmartChargingConfig {
    fn default() -> Self {
        Self {
            sticky_limitation: true,
            limit_buffer_ac_percent: 10.0,
            limit_buffer_dc_percent: 10.0,
            min_current_per_phase_amps: 6.0,
            max_schedule_periods: 20,
            default_dc_efficiency_percent: 80.0,
            charging_profile_stack_level: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// 0 disables the periodic trigger
    pub reoptimize_every_minutes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub snapshot_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::default("smart_charging", SmartChargingConfig::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SSC__").split("__"));
        let cfg: Config = figment.extract().context("invalid configuration")?;
        cfg.validate().context("configuration out of range")?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_smart_charging_config_is_valid() {
        assert!(SmartChargingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_buffer_is_rejected() {
        let cfg = SmartChargingConfig {
            limit_buffer_ac_percent: 150.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_efficiency_is_rejected() {
        let cfg = SmartChargingConfig {
            default_dc_efficiency_percent: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
