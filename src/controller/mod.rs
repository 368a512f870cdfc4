//! Caller side of the smart charging passes: locking, persistence, scheduling

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::Tenant;
use crate::optimizer::{HttpOptimizerGateway, OptimizerGateway};
use crate::repo::{InMemoryRepository, RepoError, SmartChargingRepository};
use crate::smart_charging::{ComputedProfiles, SmartChargingEngine, SmartChargingError};

type LockKey = (String, String);
type LockMap = Arc<Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>>;

/// One async mutex per (tenant, site area), alive while someone holds or awaits it
#[derive(Default)]
pub struct SiteAreaLocks {
    locks: LockMap,
}

impl SiteAreaLocks {
    pub async fn lock(&self, tenant: &Tenant, site_area_id: &str) -> SiteAreaGuard {
        let key = (tenant.id.clone(), site_area_id.to_string());
        let lock = self.locks.lock().entry(key.clone()).or_default().clone();
        SiteAreaGuard {
            guard: Some(lock.lock_owned().await),
            key,
            locks: self.locks.clone(),
        }
    }
}

/// Held for the duration of a pass; the map entry goes away with the last user
pub struct SiteAreaGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: LockKey,
    locks: LockMap,
}

impl Drop for SiteAreaGuard {
    fn drop(&mut self) {
        // Release the mutex first, its guard owns a reference too
        self.guard.take();
        let mut locks = self.locks.lock();
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

pub struct SmartChargingController {
    engine: SmartChargingEngine,
    repo: Arc<dyn SmartChargingRepository>,
    locks: SiteAreaLocks,
}

impl SmartChargingController {
    pub fn new(engine: SmartChargingEngine, repo: Arc<dyn SmartChargingRepository>) -> Self {
        Self {
            engine,
            repo,
            locks: SiteAreaLocks::default(),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn OptimizerGateway> {
        self.engine.gateway()
    }

    pub async fn find_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>, RepoError> {
        Ok(self
            .repo
            .list_tenants()
            .await?
            .into_iter()
            .find(|t| t.id == tenant_id || t.subdomain == tenant_id))
    }

    /// Run one pass under the site area lock and persist what it produced
    pub async fn run_site_area(
        &self,
        tenant: &Tenant,
        site_area_id: &str,
    ) -> Result<Option<ComputedProfiles>, SmartChargingError> {
        let _guard = self.locks.lock(tenant, site_area_id).await;

        let Some(computed) = self.engine.compute_profiles(tenant, site_area_id).await? else {
            return Ok(None);
        };
        self.repo
            .save_asset_values(tenant, &computed.asset_values)
            .await
            .map_err(|e| SmartChargingError::from_repo(site_area_id, e))?;
        if !computed.profiles.is_empty() {
            self.repo
                .save_charging_profiles(tenant, site_area_id, &computed.profiles)
                .await
                .map_err(|e| SmartChargingError::from_repo(site_area_id, e))?;
        }
        Ok(Some(computed))
    }

    /// One pass over every smart charging site area of every tenant
    pub async fn reoptimize_all(&self) -> Result<()> {
        let tenants = self.repo.list_tenants().await.context("listing tenants")?;
        for tenant in &tenants {
            let site_areas = match self.repo.list_smart_charging_site_areas(tenant).await {
                Ok(site_areas) => site_areas,
                Err(e) => {
                    warn!(tenant = %tenant, error = %e, "listing site areas failed");
                    continue;
                }
            };
            for site_area in site_areas {
                match self.run_site_area(tenant, &site_area.id).await {
                    Ok(Some(computed)) => info!(
                        tenant = %tenant,
                        site_area = %site_area.id,
                        profiles = computed.profiles.len(),
                        "site area reoptimized"
                    ),
                    Ok(None) => {}
                    Err(e) => warn!(
                        tenant = %tenant,
                        site_area = %site_area.id,
                        error = %e,
                        "smart charging failed"
                    ),
                }
            }
        }
        Ok(())
    }

    pub async fn reoptimize_loop(&self, every_minutes: u64) -> Result<()> {
        let mut interval = tokio::time::interval(Duration::from_secs(every_minutes.max(1) * 60));
        loop {
            interval.tick().await;
            if let Err(e) = self.reoptimize_all().await {
                warn!(error = %e, "reoptimize failed");
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub controller: Arc<SmartChargingController>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let repo: Arc<dyn SmartChargingRepository> = if cfg.storage.snapshot_path.exists() {
            Arc::new(
                InMemoryRepository::from_json_file(&cfg.storage.snapshot_path)
                    .await
                    .with_context(|| format!("loading {}", cfg.storage.snapshot_path.display()))?,
            )
        } else {
            warn!(
                path = %cfg.storage.snapshot_path.display(),
                "snapshot file missing, starting with an empty repository"
            );
            Arc::new(InMemoryRepository::default())
        };
        let gateway = Arc::new(
            HttpOptimizerGateway::new(&cfg.optimizer).context("invalid optimizer configuration")?,
        );
        let engine = SmartChargingEngine::new(gateway, repo.clone(), cfg.smart_charging.clone());
        Ok(Self::with_controller(cfg, Arc::new(SmartChargingController::new(engine, repo))))
    }

    pub fn with_controller(cfg: Config, controller: Arc<SmartChargingController>) -> Self {
        Self { cfg, controller }
    }
}

pub fn spawn_controller_tasks(state: AppState, cfg: Config) {
    let every_minutes = cfg.controller.reoptimize_every_minutes;
    if every_minutes == 0 {
        info!("periodic smart charging disabled");
        return;
    }
    let controller = state.controller.clone();
    tokio::spawn(async move {
        if let Err(e) = controller.reoptimize_loop(every_minutes).await {
            warn!(error = %e, "reoptimize loop stopped");
        }
    });
}
