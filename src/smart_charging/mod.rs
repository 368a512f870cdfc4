//! Smart charging pass: site area snapshot in, charging profiles out
//!
//! A pass reduces the topology, builds the fuse tree and session models,
//! asks the optimizer for a plan and turns that plan into transaction
//! profiles. It holds no state between passes and writes nothing itself.

pub mod asset_load;
pub mod diff;
pub mod error;
pub mod fuse_tree;
pub mod request;
pub mod schedule;
pub mod session_model;
pub mod topology;

#[cfg(test)]
pub(crate) mod test_support;

pub use asset_load::*;
pub use diff::*;
pub use error::*;
pub use fuse_tree::*;
pub use request::*;
pub use schedule::*;
pub use session_model::*;
pub use topology::*;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SmartChargingConfig;
use crate::domain::{
    ChargePoint, ConnectorChargingProfile, ConnectorKey, PhaseCurrents, SiteAreaSnapshot, Tenant,
};
use crate::optimizer::{OptimizerGateway, OptimizerRequest, OptimizerResponse};
use crate::repo::SmartChargingRepository;

/// Conversion efficiency of a charge point, or the default when unset
pub(crate) fn efficiency_percent(charge_point: Option<&ChargePoint>, default: f64) -> f64 {
    charge_point
        .and_then(|cp| cp.efficiency)
        .filter(|e| *e > 0.0)
        .unwrap_or(default)
}

/// Outcome of a pass that had sessions to optimize
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedProfiles {
    /// Profiles differing from what is installed
    pub profiles: Vec<ConnectorChargingProfile>,
    pub unchanged: usize,
    pub asset_values: Vec<ProcessedAssetValue>,
}

struct PreparedPass {
    topology: ReducedTopology,
    models: Vec<SessionModel>,
    request: OptimizerRequest,
}

/// One pass over a snapshot, read once at its start
struct Pass<'a> {
    snapshot: &'a SiteAreaSnapshot,
    config: &'a SmartChargingConfig,
    rated_capacity: PhaseCurrents,
    now: DateTime<Utc>,
}

impl<'a> Pass<'a> {
    fn prepare(
        &self,
        excluded_station_ids: &HashSet<String>,
    ) -> Result<Option<PreparedPass>, SmartChargingError> {
        let site_area = &self.snapshot.site_area;
        let efficiency = self.config.default_dc_efficiency_percent;

        let topology = TopologyReducer::new(site_area, efficiency).reduce(
            &self.snapshot.charging_stations,
            excluded_station_ids,
            self.rated_capacity,
        )?;

        let active: HashSet<ConnectorKey> = topology
            .charging_stations
            .iter()
            .flat_map(|s| {
                s.connectors
                    .iter()
                    .filter(|c| c.current_transaction_id.is_some())
                    .map(|c| ConnectorKey::new(s.id.clone(), c.connector_id))
            })
            .collect();
        let tree = FuseTreeBuilder::new(site_area, efficiency, &active).build(&topology);

        let builder = SessionModelBuilder::new(self.snapshot, self.config, self.now);
        let mut models = Vec::new();
        for station in &topology.charging_stations {
            for connector in &station.connectors {
                let key = ConnectorKey::new(station.id.clone(), connector.connector_id);
                let Some(&leaf_id) = tree.leaves.get(&key) else {
                    continue;
                };
                if let Some(model) = builder.build(station, connector, leaf_id)? {
                    models.push(model);
                }
            }
        }
        if models.is_empty() {
            return Ok(None);
        }

        let request = build_request(&tree, &models, self.now);
        Ok(Some(PreparedPass {
            topology,
            models,
            request,
        }))
    }

    fn translate(
        &self,
        prepared: &PreparedPass,
        response: &OptimizerResponse,
    ) -> Vec<ConnectorChargingProfile> {
        let translator = ScheduleTranslator::new(self.config);
        let models: HashMap<&ConnectorKey, &SessionModel> =
            prepared.models.iter().map(|m| (&m.key, m)).collect();

        let mut profiles = Vec::new();
        for car in &response.cars {
            let key = match car.name.parse::<ConnectorKey>() {
                Ok(key) => key,
                Err(e) => {
                    warn!(
                        site_area = %self.snapshot.site_area.id,
                        error = %e,
                        "skipping optimizer car"
                    );
                    continue;
                }
            };
            let Some(model) = models.get(&key) else {
                warn!(
                    site_area = %self.snapshot.site_area.id,
                    car = %car.name,
                    "optimizer returned an unknown car"
                );
                continue;
            };
            let Some((station, connector)) = prepared
                .topology
                .charging_stations
                .iter()
                .find(|s| s.id == key.charging_station_id)
                .and_then(|s| {
                    s.connectors
                        .iter()
                        .find(|c| c.connector_id == key.connector_id)
                        .map(|c| (s, c))
                })
            else {
                continue;
            };
            let efficiency = efficiency_percent(
                station.charge_point_of(connector),
                self.config.default_dc_efficiency_percent,
            );
            profiles.extend(translator.translate(
                model,
                connector,
                efficiency,
                &car.current_plan,
                self.now,
            ));
        }
        profiles
    }
}

pub struct SmartChargingEngine {
    gateway: Arc<dyn OptimizerGateway>,
    repo: Arc<dyn SmartChargingRepository>,
    config: SmartChargingConfig,
}

impl SmartChargingEngine {
    pub fn new(
        gateway: Arc<dyn OptimizerGateway>,
        repo: Arc<dyn SmartChargingRepository>,
        config: SmartChargingConfig,
    ) -> Self {
        Self { gateway, repo, config }
    }

    pub fn gateway(&self) -> &Arc<dyn OptimizerGateway> {
        &self.gateway
    }

    /// Compute new profiles for a site area, `None` when no session is active
    ///
    /// Callers must serialize passes per site area.
    pub async fn compute_profiles(
        &self,
        tenant: &Tenant,
        site_area_id: &str,
    ) -> Result<Option<ComputedProfiles>, SmartChargingError> {
        self.compute_profiles_at(tenant, site_area_id, Utc::now()).await
    }

    pub async fn compute_profiles_at(
        &self,
        tenant: &Tenant,
        site_area_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ComputedProfiles>, SmartChargingError> {
        let snapshot = self
            .repo
            .load_site_area_snapshot(tenant, site_area_id)
            .await
            .map_err(|e| SmartChargingError::from_repo(site_area_id, e))?;

        let asset_load = estimate_asset_load(&snapshot.assets, site_area_id, now);
        let pass = Pass {
            snapshot: &snapshot,
            config: &self.config,
            rated_capacity: site_area_capacity(&snapshot.site_area, asset_load.net_watts),
            now,
        };

        let prepared = match pass.prepare(&HashSet::new()) {
            Err(SmartChargingError::SessionResolution {
                charging_station_id,
                connector_id,
                session_id,
                ..
            }) => {
                warn!(
                    tenant = %tenant,
                    site_area = %site_area_id,
                    station = %charging_station_id,
                    connector = connector_id,
                    session = session_id,
                    "unknown session, retrying without the station"
                );
                pass.prepare(&HashSet::from([charging_station_id]))?
            }
            result => result?,
        };
        let Some(prepared) = prepared else {
            debug!(tenant = %tenant, site_area = %site_area_id, "no active session to optimize");
            return Ok(None);
        };

        let response = self
            .gateway
            .optimize(&prepared.request)
            .await
            .map_err(|e| SmartChargingError::from_optimizer(site_area_id, e))?;

        let computed = pass.translate(&prepared, &response);
        let diff = ProfileDiffFilter::new(&snapshot.current_profiles).filter(computed);
        info!(
            tenant = %tenant,
            site_area = %site_area_id,
            cars = prepared.models.len(),
            changed = diff.changed.len(),
            unchanged = diff.unchanged,
            "smart charging pass done"
        );

        Ok(Some(ComputedProfiles {
            profiles: diff.changed,
            unchanged: diff.unchanged,
            asset_values: asset_load.processed,
        }))
    }
}
