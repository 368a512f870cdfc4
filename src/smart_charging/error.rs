use thiserror::Error;

use crate::optimizer::OptimizerError;
use crate::repo::RepoError;

/// Failures of a smart charging pass, always tagged with the site area
#[derive(Debug, Error)]
pub enum SmartChargingError {
    #[error("site area {site_area_id}: invalid optimizer configuration: {source}")]
    Configuration {
        site_area_id: String,
        #[source]
        source: OptimizerError,
    },

    #[error("site area {site_area_id}: {reason}")]
    InvalidSiteArea {
        site_area_id: String,
        reason: String,
    },

    #[error(
        "site area {site_area_id}: station {charging_station_id} connector {connector_id}: {reason}"
    )]
    Topology {
        site_area_id: String,
        charging_station_id: String,
        connector_id: u32,
        reason: String,
    },

    #[error(
        "site area {site_area_id}: station {charging_station_id} connector {connector_id} \
         references unknown session {session_id}"
    )]
    SessionResolution {
        site_area_id: String,
        charging_station_id: String,
        connector_id: u32,
        session_id: i64,
    },

    #[error("site area {site_area_id}: optimizer call failed: {source}")]
    SolverCall {
        site_area_id: String,
        #[source]
        source: OptimizerError,
    },

    #[error("site area {site_area_id} not found")]
    SiteAreaNotFound { site_area_id: String },

    #[error("site area {site_area_id}: storage error: {source}")]
    Storage {
        site_area_id: String,
        #[source]
        source: RepoError,
    },
}

impl SmartChargingError {
    pub fn site_area_id(&self) -> &str {
        match self {
            Self::Configuration { site_area_id, .. }
            | Self::InvalidSiteArea { site_area_id, .. }
            | Self::Topology { site_area_id, .. }
            | Self::SessionResolution { site_area_id, .. }
            | Self::SolverCall { site_area_id, .. }
            | Self::SiteAreaNotFound { site_area_id }
            | Self::Storage { site_area_id, .. } => site_area_id,
        }
    }

    /// Map a gateway failure to configuration or call error
    pub(crate) fn from_optimizer(site_area_id: &str, source: OptimizerError) -> Self {
        if source.is_configuration() {
            Self::Configuration {
                site_area_id: site_area_id.to_string(),
                source,
            }
        } else {
            Self::SolverCall {
                site_area_id: site_area_id.to_string(),
                source,
            }
        }
    }

    pub(crate) fn from_repo(site_area_id: &str, source: RepoError) -> Self {
        match source {
            RepoError::NotFound(_) => Self::SiteAreaNotFound {
                site_area_id: site_area_id.to_string(),
            },
            source => Self::Storage {
                site_area_id: site_area_id.to_string(),
                source,
            },
        }
    }
}
