use serde::{Deserialize, Serialize};

use super::ConnectorKey;
use crate::ocpp::ChargingProfile;

/// A charging profile bound to the connector and session it limits
///
/// Used both for profiles already installed on stations (read-only input of a
/// pass) and for the profiles a pass produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorChargingProfile {
    pub charging_station_id: String,
    pub connector_id: u32,
    pub session_id: i64,
    pub profile: ChargingProfile,
}

impl ConnectorChargingProfile {
    pub fn connector_key(&self) -> ConnectorKey {
        ConnectorKey::new(self.charging_station_id.clone(), self.connector_id)
    }
}
