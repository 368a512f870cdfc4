use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Consumption,
    Production,
    ConsumptionAndProduction,
}

/// Non-charging load or generation sharing the site area connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub site_area_id: String,
    pub asset_type: AssetType,
    /// Nominal power (W), positive
    pub static_value_watts: f64,
    #[serde(default)]
    pub dynamic_asset: bool,
    #[serde(default)]
    pub fluctuation_percent: f64,
    #[serde(default)]
    pub excluded_from_smart_charging: bool,
    /// Last measured power (W), positive when consuming, negative when producing
    #[serde(default)]
    pub current_instant_watts: Option<f64>,
    #[serde(default)]
    pub last_consumption_at: Option<DateTime<Utc>>,
}
