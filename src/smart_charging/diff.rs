//! Suppression of profiles a station already runs

use tracing::debug;

use crate::domain::ConnectorChargingProfile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDiff {
    pub changed: Vec<ConnectorChargingProfile>,
    /// Profiles dropped because the same schedule is installed
    pub unchanged: usize,
}

pub struct ProfileDiffFilter<'a> {
    installed: &'a [ConnectorChargingProfile],
}

impl<'a> ProfileDiffFilter<'a> {
    pub fn new(installed: &'a [ConnectorChargingProfile]) -> Self {
        Self { installed }
    }

    pub fn filter(&self, computed: Vec<ConnectorChargingProfile>) -> ProfileDiff {
        let mut diff = ProfileDiff::default();
        for profile in computed {
            if self.is_installed(&profile) {
                debug!(
                    station = %profile.charging_station_id,
                    connector = profile.connector_id,
                    session = profile.session_id,
                    "schedule already installed"
                );
                diff.unchanged += 1;
            } else {
                diff.changed.push(profile);
            }
        }
        diff
    }

    fn is_installed(&self, profile: &ConnectorChargingProfile) -> bool {
        self.installed
            .iter()
            .find(|p| p.session_id == profile.session_id)
            .is_some_and(|p| p.profile.charging_schedule == profile.profile.charging_schedule)
    }
}
