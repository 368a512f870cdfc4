use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An active charging transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub charging_station_id: String,
    pub connector_id: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub current_total_consumption_wh: f64,
    #[serde(default)]
    pub current_instant_amps: Option<f64>,
    #[serde(default)]
    pub current_instant_amps_l1: Option<f64>,
    #[serde(default)]
    pub current_instant_amps_l2: Option<f64>,
    #[serde(default)]
    pub current_instant_amps_l3: Option<f64>,
    #[serde(default)]
    pub current_instant_watts_dc: Option<f64>,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
}

impl Session {
    /// Highest live current on any phase, AC only
    pub fn max_phase_amps(&self) -> Option<f64> {
        [
            self.current_instant_amps_l1,
            self.current_instant_amps_l2,
            self.current_instant_amps_l3,
        ]
        .into_iter()
        .flatten()
        .reduce(f64::max)
    }

    /// Live current summed over all phases, AC only
    pub fn total_amps(&self) -> Option<f64> {
        let phases: Vec<f64> = [
            self.current_instant_amps_l1,
            self.current_instant_amps_l2,
            self.current_instant_amps_l3,
        ]
        .into_iter()
        .flatten()
        .collect();
        if phases.is_empty() {
            self.current_instant_amps
        } else {
            Some(phases.iter().sum())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    #[serde(default)]
    pub battery_capacity_kwh: Option<f64>,
    #[serde(default)]
    pub ac_max_current_per_phase_amps: Option<f64>,
    #[serde(default)]
    pub dc_fast_charge_power_kw: Option<f64>,
}
