use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::Display;
use thiserror::Error;

/// Separator between station and connector in the solver correlation tag.
pub const CONNECTOR_KEY_SEPARATOR: char = '~';

/// Tenant (organization) owning a set of site areas
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub subdomain: String,
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subdomain)
    }
}

/// Grid / charging station phase
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
pub enum Phase {
    L1,
    L2,
    L3,
}

impl Phase {
    /// 1-based phase number used on the wire
    pub fn number(self) -> u8 {
        match self {
            Phase::L1 => 1,
            Phase::L2 => 2,
            Phase::L3 => 3,
        }
    }
}

/// Per-phase current values in amps
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseCurrents {
    pub phase1: f64,
    pub phase2: f64,
    pub phase3: f64,
}

impl PhaseCurrents {
    pub fn new(phase1: f64, phase2: f64, phase3: f64) -> Self {
        Self { phase1, phase2, phase3 }
    }

    /// Same value on the first `phases` phases, zero on the others
    pub fn on_phases(amps: f64, phases: u8) -> Self {
        let on = |phase: u8| if phase <= phases { amps } else { 0.0 };
        Self::new(on(1), on(2), on(3))
    }

    pub fn sum(&self) -> f64 {
        self.phase1 + self.phase2 + self.phase3
    }

    pub fn subtract(&mut self, phase: Phase, amps: f64) {
        *self.slot_mut(phase) -= amps;
    }

    pub fn subtract_currents(&mut self, other: &PhaseCurrents) {
        self.phase1 -= other.phase1;
        self.phase2 -= other.phase2;
        self.phase3 -= other.phase3;
    }

    pub fn add(&mut self, other: &PhaseCurrents) {
        self.phase1 += other.phase1;
        self.phase2 += other.phase2;
        self.phase3 += other.phase3;
    }

    pub fn clamp_non_negative(self) -> Self {
        Self::new(self.phase1.max(0.0), self.phase2.max(0.0), self.phase3.max(0.0))
    }

    fn slot_mut(&mut self, phase: Phase) -> &mut f64 {
        match phase {
            Phase::L1 => &mut self.phase1,
            Phase::L2 => &mut self.phase2,
            Phase::L3 => &mut self.phase3,
        }
    }
}

/// Which grid phases a node or session model is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseMask {
    pub phase1: bool,
    pub phase2: bool,
    pub phase3: bool,
}

impl PhaseMask {
    pub const ALL: PhaseMask = PhaseMask {
        phase1: true,
        phase2: true,
        phase3: true,
    };

    pub fn single(phase: Phase) -> Self {
        let mut mask = Self::default();
        match phase {
            Phase::L1 => mask.phase1 = true,
            Phase::L2 => mask.phase2 = true,
            Phase::L3 => mask.phase3 = true,
        }
        mask
    }

    pub fn count(&self) -> u8 {
        [self.phase1, self.phase2, self.phase3]
            .iter()
            .filter(|p| **p)
            .count() as u8
    }

    /// Spread `amps` on every connected phase
    pub fn currents(&self, amps: f64) -> PhaseCurrents {
        let on = |connected: bool| if connected { amps } else { 0.0 };
        PhaseCurrents::new(on(self.phase1), on(self.phase2), on(self.phase3))
    }
}

/// Typed correlation between a physical connector and the solver's car name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorKey {
    pub charging_station_id: String,
    pub connector_id: u32,
}

impl ConnectorKey {
    pub fn new(charging_station_id: impl Into<String>, connector_id: u32) -> Self {
        Self {
            charging_station_id: charging_station_id.into(),
            connector_id,
        }
    }
}

impl fmt::Display for ConnectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.charging_station_id, CONNECTOR_KEY_SEPARATOR, self.connector_id
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid connector key '{0}', expected 'stationID~connectorID'")]
pub struct ConnectorKeyParseError(pub String);

impl FromStr for ConnectorKey {
    type Err = ConnectorKeyParseError;

    // Station identifiers may contain the separator, connector ids never do.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (station, connector) = s
            .rsplit_once(CONNECTOR_KEY_SEPARATOR)
            .ok_or_else(|| ConnectorKeyParseError(s.to_string()))?;
        if station.is_empty() {
            return Err(ConnectorKeyParseError(s.to_string()));
        }
        let connector_id = connector
            .parse::<u32>()
            .map_err(|_| ConnectorKeyParseError(s.to_string()))?;
        Ok(Self::new(station, connector_id))
    }
}
