//! OCPP 1.6 protocol types used to express charging limits
//!
//! Profiles produced here are handed back to the caller, which is responsible
//! for sending them to the stations with SetChargingProfile.

pub mod messages;

pub use messages::{
    ChargingProfile, ChargingProfileKind, ChargingProfilePurpose, ChargingRateUnit,
    ChargingSchedule, ChargingSchedulePeriod,
};
