//! Power demand bounds of one active session ("car" on the optimizer side)

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{efficiency_percent, energized_phases, SmartChargingError};
use crate::config::SmartChargingConfig;
use crate::domain::{ChargingStation, Connector, ConnectorKey, PhaseMask, Session, SiteAreaSnapshot};

/// Battery assumed when the vehicle is unknown (Wh)
pub const GENERIC_BATTERY_CAPACITY_WH: f64 = 100_000.0;
pub const HALF_CHARGE_RATIO: f64 = 0.5;
/// Live draw below this counts as not charging
pub const NEGLIGIBLE_CURRENT_AMPS: f64 = 0.1;
/// Share of the buffer gap tolerated as measurement noise
pub const MEASUREMENT_NOISE_RATIO: f64 = 0.2;
/// Installed limits below this are expired or degenerate
pub const DEGENERATE_LIMIT_AMPS: f64 = 1.0;
const DC_CONVERSION_PHASES: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionModel {
    /// Same as the connector's leaf id in the fuse tree
    pub id: u32,
    pub key: ConnectorKey,
    pub session_id: i64,
    pub phases: PhaseMask,
    pub min_current_per_phase: f64,
    pub max_current_per_phase: f64,
    pub min_current: f64,
    pub max_current: f64,
    /// Amp-hours
    pub max_capacity: f64,
    pub min_loading_state: f64,
    pub charged_capacity: f64,
    pub started_at: DateTime<Utc>,
}

pub struct SessionModelBuilder<'a> {
    snapshot: &'a SiteAreaSnapshot,
    config: &'a SmartChargingConfig,
    now: DateTime<Utc>,
}

impl<'a> SessionModelBuilder<'a> {
    pub fn new(
        snapshot: &'a SiteAreaSnapshot,
        config: &'a SmartChargingConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self { snapshot, config, now }
    }

    /// `Ok(None)` when the connector has no session
    pub fn build(
        &self,
        station: &ChargingStation,
        connector: &Connector,
        leaf_id: u32,
    ) -> Result<Option<SessionModel>, SmartChargingError> {
        let Some(session_id) = connector.current_transaction_id else {
            return Ok(None);
        };
        let session = self
            .snapshot
            .session(session_id)
            .filter(|s| {
                s.charging_station_id == station.id && s.connector_id == connector.connector_id
            })
            .ok_or_else(|| SmartChargingError::SessionResolution {
                site_area_id: self.snapshot.site_area.id.clone(),
                charging_station_id: station.id.clone(),
                connector_id: connector.connector_id,
                session_id,
            })?;

        let site_area = &self.snapshot.site_area;
        let voltage = site_area.voltage;
        let phases = energized_phases(site_area, connector);
        let phase_count = f64::from(phases.count().max(1));
        let efficiency = efficiency_percent(
            station.charge_point_of(connector),
            self.config.default_dc_efficiency_percent,
        );

        let mut min_per_phase = self.config.min_current_per_phase_amps;
        let mut max_per_phase = connector.amperage.unwrap_or(0.0) / phase_count;
        let mut max_capacity = GENERIC_BATTERY_CAPACITY_WH / voltage;

        if let Some(vehicle) = &session.vehicle {
            if connector.is_dc() {
                if let Some(kw) = vehicle.dc_fast_charge_power_kw {
                    max_per_phase = kw * 1000.0 / voltage / DC_CONVERSION_PHASES;
                }
            } else if phases.count() == 3 {
                if let Some(amps) = vehicle.ac_max_current_per_phase_amps {
                    max_per_phase = amps;
                }
            }
            if let Some(kwh) = vehicle.battery_capacity_kwh {
                max_capacity = kwh * 1000.0 / voltage;
            }
        }

        if self.config.sticky_limitation {
            if let Some(live) = live_amps_per_phase(session, connector, phase_count, voltage) {
                if self.is_increasing_consumption(session, connector, voltage) {
                    debug!(session = session.id, "consumption increasing, no sticky limitation");
                } else if live < NEGLIGIBLE_CURRENT_AMPS {
                    max_per_phase = min_per_phase;
                } else {
                    let limit = live * (1.0 + self.buffer_percent(connector) / 100.0);
                    max_per_phase = max_per_phase.min(limit);
                }
            }
        }

        if connector.is_dc() {
            max_per_phase /= efficiency / 100.0;
        }
        min_per_phase = min_per_phase.min(max_per_phase);

        Ok(Some(SessionModel {
            id: leaf_id,
            key: ConnectorKey::new(station.id.clone(), connector.connector_id),
            session_id: session.id,
            phases,
            min_current_per_phase: min_per_phase,
            max_current_per_phase: max_per_phase,
            min_current: min_per_phase * phase_count,
            max_current: max_per_phase * phase_count,
            max_capacity,
            min_loading_state: max_capacity * HALF_CHARGE_RATIO,
            charged_capacity: session.current_total_consumption_wh / voltage,
            started_at: session.started_at,
        }))
    }

    fn buffer_percent(&self, connector: &Connector) -> f64 {
        if connector.is_dc() {
            self.config.limit_buffer_dc_percent
        } else {
            self.config.limit_buffer_ac_percent
        }
    }

    /// Whether the session draws more than its installed limit lets it hold
    /// steady at, in which case it must not be clamped to its live draw.
    fn is_increasing_consumption(
        &self,
        session: &Session,
        connector: &Connector,
        voltage: f64,
    ) -> bool {
        let Some(limit) = self
            .snapshot
            .current_profile(session.id)
            .and_then(|p| p.profile.charging_schedule.limit_at(self.now))
        else {
            return true;
        };
        if limit < DEGENERATE_LIMIT_AMPS {
            return true;
        }
        let threshold = limit / (1.0 + self.buffer_percent(connector) / 100.0);
        let tolerated = threshold + (limit - threshold) * MEASUREMENT_NOISE_RATIO;
        let live_total = if connector.is_dc() {
            session.current_instant_watts_dc.map(|w| w / voltage)
        } else {
            session.total_amps()
        };
        live_total.map_or(true, |live| live > tolerated)
    }
}

fn live_amps_per_phase(
    session: &Session,
    connector: &Connector,
    phase_count: f64,
    voltage: f64,
) -> Option<f64> {
    if connector.is_dc() {
        session
            .current_instant_watts_dc
            .map(|w| w / voltage / DC_CONVERSION_PHASES)
    } else {
        session
            .max_phase_amps()
            .or_else(|| session.current_instant_amps.map(|a| a / phase_count))
    }
}
