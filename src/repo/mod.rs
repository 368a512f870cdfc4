//! Storage collaborator of the smart charging passes

pub mod memory;

pub use memory::{InMemoryRepository, RepositorySeed, TenantSeed};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ConnectorChargingProfile, SiteArea, SiteAreaSnapshot, Tenant};
use crate::smart_charging::ProcessedAssetValue;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored data is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmartChargingRepository: Send + Sync {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, RepoError>;

    /// Site areas of the tenant with smart charging enabled
    async fn list_smart_charging_site_areas(
        &self,
        tenant: &Tenant,
    ) -> Result<Vec<SiteArea>, RepoError>;

    /// Consistent read of everything one pass needs
    async fn load_site_area_snapshot(
        &self,
        tenant: &Tenant,
        site_area_id: &str,
    ) -> Result<SiteAreaSnapshot, RepoError>;

    async fn save_asset_values(
        &self,
        tenant: &Tenant,
        values: &[ProcessedAssetValue],
    ) -> Result<(), RepoError>;

    /// Record applied profiles so later passes see them as installed
    async fn save_charging_profiles(
        &self,
        tenant: &Tenant,
        site_area_id: &str,
        profiles: &[ConnectorChargingProfile],
    ) -> Result<(), RepoError>;
}
