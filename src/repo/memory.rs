use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::info;

use super::{RepoError, SmartChargingRepository};
use crate::domain::{ConnectorChargingProfile, SiteArea, SiteAreaSnapshot, Tenant};
use crate::smart_charging::ProcessedAssetValue;

/// Seed file layout: tenants with the snapshots of their site areas
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySeed {
    #[serde(default)]
    pub tenants: Vec<TenantSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSeed {
    pub tenant: Tenant,
    #[serde(default)]
    pub site_areas: Vec<SiteAreaSnapshot>,
}

#[derive(Debug)]
struct TenantData {
    tenant: Tenant,
    site_areas: BTreeMap<String, SiteAreaSnapshot>,
    asset_values: HashMap<String, ProcessedAssetValue>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tenants: RwLock<BTreeMap<String, TenantData>>,
}

impl InMemoryRepository {
    pub fn new(seed: RepositorySeed) -> Self {
        let tenants = seed
            .tenants
            .into_iter()
            .map(|t| {
                let site_areas = t
                    .site_areas
                    .into_iter()
                    .map(|s| (s.site_area.id.clone(), s))
                    .collect();
                (
                    t.tenant.id.clone(),
                    TenantData {
                        tenant: t.tenant,
                        site_areas,
                        asset_values: HashMap::new(),
                    },
                )
            })
            .collect();
        Self {
            tenants: RwLock::new(tenants),
        }
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: RepositorySeed = serde_json::from_str(&raw)?;
        info!(path = %path.display(), tenants = seed.tenants.len(), "repository seeded");
        Ok(Self::new(seed))
    }

    /// Last processed value of an asset
    pub fn asset_value(&self, tenant: &Tenant, asset_id: &str) -> Option<ProcessedAssetValue> {
        self.tenants
            .read()
            .get(&tenant.id)
            .and_then(|t| t.asset_values.get(asset_id).cloned())
    }
}

fn tenant_not_found(tenant: &Tenant) -> RepoError {
    RepoError::NotFound(format!("tenant {}", tenant.id))
}

#[async_trait]
impl SmartChargingRepository for InMemoryRepository {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, RepoError> {
        Ok(self.tenants.read().values().map(|t| t.tenant.clone()).collect())
    }

    async fn list_smart_charging_site_areas(
        &self,
        tenant: &Tenant,
    ) -> Result<Vec<SiteArea>, RepoError> {
        let tenants = self.tenants.read();
        let data = tenants.get(&tenant.id).ok_or_else(|| tenant_not_found(tenant))?;
        Ok(data
            .site_areas
            .values()
            .filter(|s| s.site_area.smart_charging)
            .map(|s| s.site_area.clone())
            .collect())
    }

    async fn load_site_area_snapshot(
        &self,
        tenant: &Tenant,
        site_area_id: &str,
    ) -> Result<SiteAreaSnapshot, RepoError> {
        let tenants = self.tenants.read();
        let data = tenants.get(&tenant.id).ok_or_else(|| tenant_not_found(tenant))?;
        data.site_areas
            .get(site_area_id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("site area {site_area_id}")))
    }

    async fn save_asset_values(
        &self,
        tenant: &Tenant,
        values: &[ProcessedAssetValue],
    ) -> Result<(), RepoError> {
        let mut tenants = self.tenants.write();
        let data = tenants.get_mut(&tenant.id).ok_or_else(|| tenant_not_found(tenant))?;
        for value in values {
            data.asset_values.insert(value.asset_id.clone(), value.clone());
        }
        Ok(())
    }

    async fn save_charging_profiles(
        &self,
        tenant: &Tenant,
        site_area_id: &str,
        profiles: &[ConnectorChargingProfile],
    ) -> Result<(), RepoError> {
        let mut tenants = self.tenants.write();
        let data = tenants.get_mut(&tenant.id).ok_or_else(|| tenant_not_found(tenant))?;
        let snapshot = data
            .site_areas
            .get_mut(site_area_id)
            .ok_or_else(|| RepoError::NotFound(format!("site area {site_area_id}")))?;
        for profile in profiles {
            let key = profile.connector_key();
            snapshot.current_profiles.retain(|p| p.connector_key() != key);
            snapshot.current_profiles.push(profile.clone());
        }
        Ok(())
    }
}
