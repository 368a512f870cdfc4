use serde::{Deserialize, Serialize};

use super::Phase;

/// A site area: the electrical sub-network smart charging optimizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteArea {
    pub id: String,
    pub name: String,
    /// Rated power of the site area connection (W)
    pub maximum_power_watts: f64,
    /// Phase to neutral voltage (V)
    pub voltage: f64,
    /// 1 or 3
    pub number_of_phases: u8,
    #[serde(default)]
    pub smart_charging: bool,
}

impl SiteArea {
    pub fn is_single_phase(&self) -> bool {
        self.number_of_phases == 1
    }

    /// Reason the electrical data cannot describe a real connection, if any
    pub fn invalid_reason(&self) -> Option<&'static str> {
        if !matches!(self.number_of_phases, 1 | 3) {
            Some("number of phases must be 1 or 3")
        } else if !(self.voltage.is_finite() && self.voltage > 0.0) {
            Some("voltage must be positive")
        } else if !(self.maximum_power_watts.is_finite() && self.maximum_power_watts > 0.0) {
            Some("maximum power must be positive")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrentType {
    Ac,
    Dc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationCapabilities {
    #[serde(default)]
    pub supports_charging_profiles: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStation {
    pub id: String,
    pub site_area_id: String,
    #[serde(default)]
    pub capabilities: StationCapabilities,
    #[serde(default)]
    pub excluded_from_smart_charging: bool,
    pub connectors: Vec<Connector>,
    #[serde(default)]
    pub charge_points: Vec<ChargePoint>,
}

impl ChargingStation {
    pub fn charge_point(&self, charge_point_id: u32) -> Option<&ChargePoint> {
        self.charge_points
            .iter()
            .find(|cp| cp.charge_point_id == charge_point_id)
    }

    pub fn charge_point_of(&self, connector: &Connector) -> Option<&ChargePoint> {
        connector
            .charge_point_id
            .and_then(|id| self.charge_point(id))
    }

    /// Sibling connectors sharing `charge_point`, the given connector included
    pub fn connectors_of<'a>(
        &'a self,
        charge_point: &'a ChargePoint,
    ) -> impl Iterator<Item = &'a Connector> + 'a {
        self.connectors
            .iter()
            .filter(move |c| c.charge_point_id == Some(charge_point.charge_point_id))
    }
}

/// Logical group of connectors powered by the same electronics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePoint {
    pub charge_point_id: u32,
    /// Total amperage of the charge point, all phases
    #[serde(default)]
    pub amperage: Option<f64>,
    #[serde(default)]
    pub share_power_to_all_connectors: bool,
    #[serde(default)]
    pub cannot_charge_in_parallel: bool,
    #[serde(default)]
    pub exclude_from_power_limitation: bool,
    /// AC to DC conversion efficiency in percent, DC only
    #[serde(default)]
    pub efficiency: Option<f64>,
}

impl ChargePoint {
    pub fn is_grouped(&self) -> bool {
        self.share_power_to_all_connectors || self.cannot_charge_in_parallel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseAssignmentToGrid {
    pub cs_phase_l1: Phase,
    pub cs_phase_l2: Phase,
    pub cs_phase_l3: Phase,
}

impl Default for PhaseAssignmentToGrid {
    fn default() -> Self {
        Self {
            cs_phase_l1: Phase::L1,
            cs_phase_l2: Phase::L2,
            cs_phase_l3: Phase::L3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub connector_id: u32,
    #[serde(default)]
    pub charge_point_id: Option<u32>,
    /// Rated amperage, all phases
    #[serde(default)]
    pub amperage: Option<f64>,
    #[serde(default)]
    pub number_of_connected_phases: Option<u8>,
    pub current_type: CurrentType,
    #[serde(default)]
    pub phase_assignment_to_grid: Option<PhaseAssignmentToGrid>,
    /// Active transaction on this connector, if any
    #[serde(default)]
    pub current_transaction_id: Option<i64>,
}

impl Connector {
    pub fn is_dc(&self) -> bool {
        self.current_type == CurrentType::Dc
    }

    /// Grid phase a single-phase connector is wired to
    pub fn grid_phase(&self) -> Phase {
        self.phase_assignment_to_grid
            .map(|a| a.cs_phase_l1)
            .unwrap_or(Phase::L1)
    }
}
