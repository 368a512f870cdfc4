//! Reduction of a site area to what smart charging may control
//!
//! Connectors the optimizer cannot limit still draw current: their worst case
//! draw is taken off the root capacity and they are dropped from the tree.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::{efficiency_percent, SmartChargingError};
use crate::domain::{ChargePoint, ChargingStation, Connector, PhaseCurrents, SiteArea};

/// Snapshot of the controllable part of a site area
#[derive(Debug, Clone)]
pub struct ReducedTopology {
    pub root_capacity: PhaseCurrents,
    pub charging_stations: Vec<ChargingStation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ineligibility {
    NoChargePoint,
    ChargePointExcluded,
    StationExcluded,
    NoProfileSupport,
    ExcludedThisPass,
}

/// Rated per-phase capacity of the site area once asset load is netted out
pub fn site_area_capacity(site_area: &SiteArea, asset_load_watts: f64) -> PhaseCurrents {
    let phases = if site_area.is_single_phase() { 1 } else { 3 };
    let amps_per_phase =
        (site_area.maximum_power_watts - asset_load_watts) / site_area.voltage / f64::from(phases);
    PhaseCurrents::on_phases(amps_per_phase, phases)
}

pub struct TopologyReducer<'a> {
    site_area: &'a SiteArea,
    default_efficiency_percent: f64,
}

impl<'a> TopologyReducer<'a> {
    pub fn new(site_area: &'a SiteArea, default_efficiency_percent: f64) -> Self {
        Self {
            site_area,
            default_efficiency_percent,
        }
    }

    pub fn reduce(
        &self,
        charging_stations: &[ChargingStation],
        excluded_station_ids: &HashSet<String>,
        rated_capacity: PhaseCurrents,
    ) -> Result<ReducedTopology, SmartChargingError> {
        if let Some(reason) = self.site_area.invalid_reason() {
            return Err(SmartChargingError::InvalidSiteArea {
                site_area_id: self.site_area.id.clone(),
                reason: reason.to_string(),
            });
        }
        let mut capacity = rated_capacity;
        // (station, charge point) pairs whose shared draw is already deducted
        let mut deducted_charge_points: HashSet<(String, u32)> = HashSet::new();
        let mut kept_stations = Vec::new();

        for station in charging_stations
            .iter()
            .filter(|s| s.site_area_id == self.site_area.id)
        {
            let mut kept_connectors = Vec::new();
            for connector in &station.connectors {
                let charge_point = station.charge_point_of(connector);
                match ineligibility(station, charge_point, excluded_station_ids) {
                    None => {
                        self.check_connector_data(station, connector)?;
                        kept_connectors.push(connector.clone());
                    }
                    Some(reason) => {
                        debug!(
                            station = %station.id,
                            connector = connector.connector_id,
                            ?reason,
                            "connector not controllable"
                        );
                        if let Some(cp) = charge_point.filter(|cp| cp.is_grouped()) {
                            let key = (station.id.clone(), cp.charge_point_id);
                            if !deducted_charge_points.insert(key) {
                                continue;
                            }
                        }
                        self.deduct(&mut capacity, connector, charge_point);
                    }
                }
            }
            if !kept_connectors.is_empty() {
                kept_stations.push(ChargingStation {
                    connectors: kept_connectors,
                    ..station.clone()
                });
            }
        }

        let clamped = capacity.clamp_non_negative();
        if clamped != capacity {
            warn!(
                site_area = %self.site_area.id,
                ?capacity,
                "uncontrolled connectors exceed the site area capacity, clamping to zero"
            );
        }
        if (clamped.sum() - rated_capacity.sum()).abs() > f64::EPSILON {
            info!(
                site_area = %self.site_area.id,
                rated_amps = rated_capacity.sum(),
                remaining_amps = clamped.sum(),
                "site area capacity reduced by uncontrolled connectors"
            );
        }

        Ok(ReducedTopology {
            root_capacity: clamped,
            charging_stations: kept_stations,
        })
    }

    fn check_connector_data(
        &self,
        station: &ChargingStation,
        connector: &Connector,
    ) -> Result<(), SmartChargingError> {
        let reason = match (connector.amperage, connector.number_of_connected_phases) {
            (None, _) => "missing connector amperage",
            (Some(a), _) if a < 0.0 || !a.is_finite() => "invalid connector amperage",
            (_, None) => "missing number of connected phases",
            (_, Some(p)) if !(1..=3).contains(&p) => "invalid number of connected phases",
            _ => return Ok(()),
        };
        Err(SmartChargingError::Topology {
            site_area_id: self.site_area.id.clone(),
            charging_station_id: station.id.clone(),
            connector_id: connector.connector_id,
            reason: reason.to_string(),
        })
    }

    fn deduct(
        &self,
        capacity: &mut PhaseCurrents,
        connector: &Connector,
        charge_point: Option<&ChargePoint>,
    ) {
        let amps = charge_point
            .filter(|cp| cp.is_grouped())
            .and_then(|cp| cp.amperage)
            .or(connector.amperage)
            .unwrap_or_else(|| {
                warn!(
                    connector = connector.connector_id,
                    "uncontrolled connector has no amperage, nothing deducted"
                );
                0.0
            });
        let phases = connector
            .number_of_connected_phases
            .unwrap_or(self.site_area.number_of_phases)
            .clamp(1, 3);

        if self.site_area.is_single_phase() {
            capacity.phase1 -= amps;
        } else if phases == 1 {
            capacity.subtract(connector.grid_phase(), amps);
        } else {
            let amps = if connector.is_dc() {
                amps / (efficiency_percent(charge_point, self.default_efficiency_percent) / 100.0)
            } else {
                amps
            };
            capacity.subtract_currents(&PhaseCurrents::on_phases(amps / f64::from(phases), phases));
        }
    }
}

fn ineligibility(
    station: &ChargingStation,
    charge_point: Option<&ChargePoint>,
    excluded_station_ids: &HashSet<String>,
) -> Option<Ineligibility> {
    let Some(charge_point) = charge_point else {
        return Some(Ineligibility::NoChargePoint);
    };
    if charge_point.exclude_from_power_limitation {
        Some(Ineligibility::ChargePointExcluded)
    } else if station.excluded_from_smart_charging {
        Some(Ineligibility::StationExcluded)
    } else if !station.capabilities.supports_charging_profiles {
        Some(Ineligibility::NoProfileSupport)
    } else if excluded_station_ids.contains(&station.id) {
        Some(Ineligibility::ExcludedThisPass)
    } else {
        None
    }
}
