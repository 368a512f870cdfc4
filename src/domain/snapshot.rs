use serde::{Deserialize, Serialize};

use super::{Asset, ChargingStation, ConnectorChargingProfile, Session, SiteArea};

/// Everything a smart charging pass reads, captured once at its start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAreaSnapshot {
    pub site_area: SiteArea,
    #[serde(default)]
    pub charging_stations: Vec<ChargingStation>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub current_profiles: Vec<ConnectorChargingProfile>,
}

impl SiteAreaSnapshot {
    pub fn session(&self, session_id: i64) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    /// The installed profile of exactly this session, if any
    pub fn current_profile(&self, session_id: i64) -> Option<&ConnectorChargingProfile> {
        self.current_profiles
            .iter()
            .find(|p| p.session_id == session_id)
    }
}
