//! Fixtures shared by the smart charging unit tests

use chrono::{DateTime, Duration, Utc};

use crate::domain::{
    ChargePoint, ChargingStation, Connector, ConnectorChargingProfile, CurrentType, Session,
    SiteArea, SiteAreaSnapshot, StationCapabilities,
};
use crate::ocpp::{
    ChargingProfile, ChargingProfileKind, ChargingProfilePurpose, ChargingRateUnit,
    ChargingSchedule, ChargingSchedulePeriod,
};

pub fn site_area(number_of_phases: u8, maximum_power_watts: f64) -> SiteArea {
    SiteArea {
        id: "SA1".into(),
        name: "Parking A".into(),
        maximum_power_watts,
        voltage: 230.0,
        number_of_phases,
        smart_charging: true,
    }
}

pub fn charge_point(charge_point_id: u32) -> ChargePoint {
    ChargePoint {
        charge_point_id,
        amperage: None,
        share_power_to_all_connectors: false,
        cannot_charge_in_parallel: false,
        exclude_from_power_limitation: false,
        efficiency: None,
    }
}

pub fn ac_connector(connector_id: u32, amperage: f64, phases: u8) -> Connector {
    Connector {
        connector_id,
        charge_point_id: Some(1),
        amperage: Some(amperage),
        number_of_connected_phases: Some(phases),
        current_type: CurrentType::Ac,
        phase_assignment_to_grid: None,
        current_transaction_id: None,
    }
}

pub fn station(id: &str, connectors: Vec<Connector>) -> ChargingStation {
    ChargingStation {
        id: id.into(),
        site_area_id: "SA1".into(),
        capabilities: StationCapabilities {
            supports_charging_profiles: true,
        },
        excluded_from_smart_charging: false,
        connectors,
        charge_points: vec![charge_point(1)],
    }
}

/// Session without live measurements or vehicle data
pub fn active_session(id: i64, charging_station_id: &str, connector_id: u32) -> Session {
    Session {
        id,
        charging_station_id: charging_station_id.into(),
        connector_id,
        started_at: Utc::now() - Duration::minutes(30),
        current_total_consumption_wh: 0.0,
        current_instant_amps: None,
        current_instant_amps_l1: None,
        current_instant_amps_l2: None,
        current_instant_amps_l3: None,
        current_instant_watts_dc: None,
        vehicle: None,
    }
}

pub fn snapshot(charging_stations: Vec<ChargingStation>) -> SiteAreaSnapshot {
    SiteAreaSnapshot {
        site_area: site_area(3, 69_000.0),
        charging_stations,
        sessions: Vec::new(),
        assets: Vec::new(),
        current_profiles: Vec::new(),
    }
}

/// Flat profile installed a minute before `now`, valid for an hour
pub fn installed_profile(
    charging_station_id: &str,
    connector_id: u32,
    session_id: i64,
    limit: f64,
    now: DateTime<Utc>,
) -> ConnectorChargingProfile {
    ConnectorChargingProfile {
        charging_station_id: charging_station_id.into(),
        connector_id,
        session_id,
        profile: ChargingProfile {
            charging_profile_id: connector_id as i32,
            transaction_id: Some(session_id),
            stack_level: 2,
            charging_profile_purpose: ChargingProfilePurpose::TxProfile,
            charging_profile_kind: ChargingProfileKind::Absolute,
            recurrency_kind: None,
            valid_from: None,
            valid_to: None,
            charging_schedule: ChargingSchedule {
                charging_rate_unit: ChargingRateUnit::A,
                charging_schedule_period: vec![ChargingSchedulePeriod {
                    start_period: 0,
                    limit,
                    number_phases: Some(3),
                }],
                duration: Some(3600),
                start_schedule: Some(now - Duration::minutes(1)),
                min_charging_rate: None,
            },
        },
    }
}
