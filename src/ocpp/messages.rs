//! OCPP 1.6 SetChargingProfile payload definitions
//!
//! Only the charging profile part of the protocol is modelled here: it is the
//! unit smart charging produces and diffs against what stations already run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Charging Profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingProfile {
    pub charging_profile_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    pub stack_level: i32,
    pub charging_profile_purpose: ChargingProfilePurpose,
    pub charging_profile_kind: ChargingProfileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrency_kind: Option<RecurrencyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,
    pub charging_schedule: ChargingSchedule,
}

/// Charging Profile Purpose
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
pub enum ChargingProfilePurpose {
    ChargePointMaxProfile,
    TxDefaultProfile,
    TxProfile,
}

/// Charging Profile Kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargingProfileKind {
    Absolute,
    Recurring,
    Relative,
}

/// Recurrency Kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecurrencyKind {
    Daily,
    Weekly,
}

/// Charging Schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSchedule {
    pub charging_rate_unit: ChargingRateUnit,
    pub charging_schedule_period: Vec<ChargingSchedulePeriod>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_schedule: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_charging_rate: Option<f64>,
}

impl ChargingSchedule {
    /// Limit in force at `at`, `None` before the start or after the duration
    pub fn limit_at(&self, at: DateTime<Utc>) -> Option<f64> {
        let start = self.start_schedule?;
        let offset = (at - start).num_seconds();
        if offset < 0 {
            return None;
        }
        if let Some(duration) = self.duration {
            if offset >= i64::from(duration) {
                return None;
            }
        }
        self.charging_schedule_period
            .iter()
            .take_while(|p| i64::from(p.start_period) <= offset)
            .last()
            .map(|p| p.limit)
    }
}

/// Charging Rate Unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargingRateUnit {
    W, // Watts
    A, // Amperes
}

/// Charging Schedule Period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSchedulePeriod {
    pub start_period: i32, // Seconds from start of schedule
    pub limit: f64,        // Max current or power
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_phases: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn schedule() -> ChargingSchedule {
        ChargingSchedule {
            charging_rate_unit: ChargingRateUnit::A,
            charging_schedule_period: vec![
                ChargingSchedulePeriod {
                    start_period: 0,
                    limit: 32.0,
                    number_phases: Some(3),
                },
                ChargingSchedulePeriod {
                    start_period: 900,
                    limit: 16.0,
                    number_phases: Some(3),
                },
            ],
            duration: Some(1800),
            start_schedule: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
            min_charging_rate: None,
        }
    }

    #[test]
    fn test_charging_profile_serialization() {
        let profile = ChargingProfile {
            charging_profile_id: 1,
            transaction_id: Some(42),
            stack_level: 2,
            charging_profile_purpose: ChargingProfilePurpose::TxProfile,
            charging_profile_kind: ChargingProfileKind::Absolute,
            recurrency_kind: None,
            valid_from: None,
            valid_to: None,
            charging_schedule: schedule(),
        };

        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"limit\":32"));
        assert!(json.contains("\"transactionId\":42"));
        assert!(json.contains("\"chargingProfilePurpose\":\"TxProfile\""));
    }

    #[test]
    fn test_limit_at_follows_periods() {
        let s = schedule();
        let start = s.start_schedule.unwrap();
        assert_eq!(s.limit_at(start), Some(32.0));
        assert_eq!(s.limit_at(start + Duration::seconds(899)), Some(32.0));
        assert_eq!(s.limit_at(start + Duration::seconds(900)), Some(16.0));
    }

    #[test]
    fn test_limit_at_outside_schedule() {
        let s = schedule();
        let start = s.start_schedule.unwrap();
        assert_eq!(s.limit_at(start - Duration::seconds(1)), None);
        assert_eq!(s.limit_at(start + Duration::seconds(1800)), None);
    }
}
