//! Translation of optimizer plans into OCPP charging profiles

use chrono::{DateTime, Utc};

use super::SessionModel;
use crate::config::SmartChargingConfig;
use crate::domain::{ConnectorChargingProfile, Connector};
use crate::ocpp::{
    ChargingProfile, ChargingProfileKind, ChargingProfilePurpose, ChargingRateUnit,
    ChargingSchedule, ChargingSchedulePeriod,
};

/// Length of one optimizer plan slot
pub const SLOT_SECONDS: i64 = 15 * 60;
/// Non-zero periods required before a zero slot ends the schedule
pub const MIN_NON_ZERO_PERIODS: usize = 3;

/// Seconds elapsed since the last quarter-hour boundary
pub fn seconds_since_quarter_hour(now: DateTime<Utc>) -> i64 {
    now.timestamp().rem_euclid(SLOT_SECONDS)
}

/// Most recent quarter-hour boundary, sub-seconds dropped
pub fn quarter_hour_anchor(now: DateTime<Utc>) -> DateTime<Utc> {
    let anchor = now.timestamp() - seconds_since_quarter_hour(now);
    DateTime::from_timestamp(anchor, 0).unwrap_or(now)
}

fn round_limit(amps: f64) -> f64 {
    (amps * 10.0).round() / 10.0
}

pub struct ScheduleTranslator<'a> {
    config: &'a SmartChargingConfig,
}

impl<'a> ScheduleTranslator<'a> {
    pub fn new(config: &'a SmartChargingConfig) -> Self {
        Self { config }
    }

    /// Connector side profile for one session, `None` for an empty plan
    pub fn translate(
        &self,
        model: &SessionModel,
        connector: &Connector,
        efficiency_percent: f64,
        plan: &[f64],
        now: DateTime<Utc>,
    ) -> Option<ConnectorChargingProfile> {
        let phases = model.phases.count().max(1);
        let factor = if connector.is_dc() {
            efficiency_percent / 100.0 * f64::from(phases)
        } else {
            f64::from(phases)
        };

        let mut periods = Vec::new();
        let mut non_zero = 0;
        for (slot, amps) in plan.iter().enumerate() {
            if periods.len() >= self.config.max_schedule_periods {
                break;
            }
            periods.push(ChargingSchedulePeriod {
                start_period: (slot as i64 * SLOT_SECONDS) as i32,
                limit: round_limit(amps * factor),
                number_phases: Some(i32::from(phases)),
            });
            if *amps > 0.0 {
                non_zero += 1;
            } else if non_zero >= MIN_NON_ZERO_PERIODS {
                break;
            }
        }
        if periods.is_empty() {
            return None;
        }

        let duration = periods.len() as i64 * SLOT_SECONDS;
        Some(ConnectorChargingProfile {
            charging_station_id: model.key.charging_station_id.clone(),
            connector_id: model.key.connector_id,
            session_id: model.session_id,
            profile: ChargingProfile {
                charging_profile_id: connector.connector_id as i32,
                transaction_id: Some(model.session_id),
                stack_level: self.config.charging_profile_stack_level,
                charging_profile_purpose: ChargingProfilePurpose::TxProfile,
                charging_profile_kind: ChargingProfileKind::Absolute,
                recurrency_kind: None,
                valid_from: None,
                valid_to: None,
                charging_schedule: ChargingSchedule {
                    charging_rate_unit: ChargingRateUnit::A,
                    charging_schedule_period: periods,
                    duration: Some(duration as i32),
                    start_schedule: Some(quarter_hour_anchor(now)),
                    min_charging_rate: None,
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectorKey, CurrentType, PhaseMask};
    use crate::smart_charging::test_support::ac_connector;
    use chrono::TimeZone;
    use rstest::rstest;

    fn model(phases: PhaseMask) -> SessionModel {
        SessionModel {
            id: 2,
            key: ConnectorKey::new("CS1", 1),
            session_id: 42,
            phases,
            min_current_per_phase: 6.0,
            max_current_per_phase: 32.0,
            min_current: 18.0,
            max_current: 96.0,
            max_capacity: 400.0,
            min_loading_state: 200.0,
            charged_capacity: 0.0,
            started_at: Utc::now(),
        }
    }

    fn limits(profile: &ConnectorChargingProfile) -> Vec<f64> {
        profile
            .profile
            .charging_schedule
            .charging_schedule_period
            .iter()
            .map(|p| p.limit)
            .collect()
    }

    #[test]
    fn test_seconds_since_quarter_hour_known_wall_clock() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 10, 37, 12).unwrap();
        assert_eq!(seconds_since_quarter_hour(now), 7 * 60 + 12);
        assert_eq!(
            quarter_hour_anchor(now),
            Utc.with_ymd_and_hms(2024, 5, 17, 10, 30, 0).unwrap()
        );
        let boundary = Utc.with_ymd_and_hms(2024, 5, 17, 23, 45, 0).unwrap();
        assert_eq!(seconds_since_quarter_hour(boundary), 0);
        assert_eq!(quarter_hour_anchor(boundary), boundary);
    }

    #[test]
    fn test_anchor_drops_sub_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 10, 14, 59).unwrap()
            + chrono::Duration::milliseconds(999);
        assert_eq!(
            quarter_hour_anchor(now),
            Utc.with_ymd_and_hms(2024, 5, 17, 10, 0, 0).unwrap()
        );
    }

    #[rstest]
    #[case(4, 20, 4)]
    #[case(30, 20, 20)]
    #[case(1, 1, 1)]
    fn test_equal_positive_plan_period_count(
        #[case] slots: usize,
        #[case] max_periods: usize,
        #[case] expected: usize,
    ) {
        let cfg = SmartChargingConfig {
            max_schedule_periods: max_periods,
            ..Default::default()
        };
        let plan = vec![10.0; slots];
        let profile = ScheduleTranslator::new(&cfg)
            .translate(&model(PhaseMask::ALL), &ac_connector(1, 96.0, 3), 80.0, &plan, Utc::now())
            .unwrap();
        let schedule = &profile.profile.charging_schedule;
        assert_eq!(schedule.charging_schedule_period.len(), expected);
        assert_eq!(schedule.duration, Some(expected as i32 * 900));
        let last = schedule.charging_schedule_period.last().unwrap();
        assert_eq!(last.start_period, (expected as i32 - 1) * 900);
    }

    #[test]
    fn test_zero_tail_stops_after_three_non_zero_periods() {
        let cfg = SmartChargingConfig::default();
        let plan = [0.0, 10.0, 10.0, 10.0, 0.0, 0.0, 0.0, 10.0];
        let profile = ScheduleTranslator::new(&cfg)
            .translate(&model(PhaseMask::ALL), &ac_connector(1, 96.0, 3), 80.0, &plan, Utc::now())
            .unwrap();
        assert_eq!(limits(&profile), vec![0.0, 30.0, 30.0, 30.0, 0.0]);
        assert_eq!(profile.profile.charging_schedule.duration, Some(5 * 900));
    }

    #[test]
    fn test_leading_zero_slots_are_kept() {
        let cfg = SmartChargingConfig::default();
        let plan = [0.0, 0.0, 0.0, 0.0, 16.0];
        let profile = ScheduleTranslator::new(&cfg)
            .translate(&model(PhaseMask::ALL), &ac_connector(1, 96.0, 3), 80.0, &plan, Utc::now())
            .unwrap();
        assert_eq!(limits(&profile).len(), 5);
    }

    #[test]
    fn test_dc_limits_scaled_by_efficiency_and_phases() {
        let cfg = SmartChargingConfig::default();
        let mut connector = ac_connector(1, 300.0, 3);
        connector.current_type = CurrentType::Dc;
        let profile = ScheduleTranslator::new(&cfg)
            .translate(&model(PhaseMask::ALL), &connector, 90.0, &[100.0], Utc::now())
            .unwrap();
        assert_eq!(limits(&profile), vec![270.0]);
    }

    #[test]
    fn test_profile_is_transaction_scoped() {
        let cfg = SmartChargingConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 10, 37, 12).unwrap();
        let profile = ScheduleTranslator::new(&cfg)
            .translate(&model(PhaseMask::ALL), &ac_connector(1, 96.0, 3), 80.0, &[16.0], now)
            .unwrap();
        assert_eq!(profile.session_id, 42);
        assert_eq!(profile.profile.transaction_id, Some(42));
        assert_eq!(profile.profile.charging_profile_purpose, ChargingProfilePurpose::TxProfile);
        assert_eq!(profile.profile.stack_level, 2);
        assert_eq!(
            profile.profile.charging_schedule.start_schedule,
            Some(Utc.with_ymd_and_hms(2024, 5, 17, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_empty_plan_yields_nothing() {
        let cfg = SmartChargingConfig::default();
        let translated = ScheduleTranslator::new(&cfg).translate(
            &model(PhaseMask::ALL),
            &ac_connector(1, 96.0, 3),
            80.0,
            &[],
            Utc::now(),
        );
        assert!(translated.is_none());
    }
}
