//! Non-charging load of a site area
//!
//! Assets (buildings, PV plants, batteries...) share the site area connection
//! with the chargers. Their net draw is removed from the rated power before
//! the capacity is handed to the optimizer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Asset, AssetType};

/// Live samples older than this are not trusted
pub const LIVE_SAMPLE_MAX_AGE_SECONDS: i64 = 120;

/// Value an asset contributed to a pass, for the caller to persist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedAssetValue {
    pub asset_id: String,
    pub instant_watts: f64,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetLoad {
    /// Positive when the assets consume, negative when they feed in
    pub net_watts: f64,
    pub processed: Vec<ProcessedAssetValue>,
}

pub fn estimate_asset_load(assets: &[Asset], site_area_id: &str, now: DateTime<Utc>) -> AssetLoad {
    let mut load = AssetLoad::default();
    for asset in assets
        .iter()
        .filter(|a| a.site_area_id == site_area_id && !a.excluded_from_smart_charging)
    {
        let watts = asset_contribution(asset, now);
        debug!(asset = %asset.id, watts, "asset contribution");
        load.net_watts += watts;
        load.processed.push(ProcessedAssetValue {
            asset_id: asset.id.clone(),
            instant_watts: watts,
            processed_at: now,
        });
    }
    load
}

/// Watts one asset adds to the site area load
pub fn asset_contribution(asset: &Asset, now: DateTime<Utc>) -> f64 {
    if !asset.dynamic_asset {
        return match asset.asset_type {
            AssetType::Production => 0.0,
            AssetType::Consumption | AssetType::ConsumptionAndProduction => {
                asset.static_value_watts
            }
        };
    }
    match live_watts(asset, now) {
        Some(live) => {
            let fluctuation = asset.static_value_watts.abs() * asset.fluctuation_percent / 100.0;
            let ceiling = match asset.asset_type {
                AssetType::Production => 0.0,
                AssetType::Consumption | AssetType::ConsumptionAndProduction => {
                    asset.static_value_watts
                }
            };
            (live + fluctuation).min(ceiling)
        }
        // Stale production is not trusted
        None => match asset.asset_type {
            AssetType::Production => 0.0,
            AssetType::Consumption | AssetType::ConsumptionAndProduction => {
                asset.static_value_watts
            }
        },
    }
}

fn live_watts(asset: &Asset, now: DateTime<Utc>) -> Option<f64> {
    let at = asset.last_consumption_at?;
    if now - at >= Duration::seconds(LIVE_SAMPLE_MAX_AGE_SECONDS) {
        return None;
    }
    asset.current_instant_watts
}
