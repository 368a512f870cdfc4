use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use super::error::ApiError;
use crate::controller::AppState;
use crate::domain::ConnectorChargingProfile;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartChargingResponse {
    pub site_area_id: String,
    pub profiles: Vec<ConnectorChargingProfile>,
    pub unchanged: usize,
}

#[derive(Debug, Serialize)]
pub struct OptimizerCheckResponse {
    pub status: &'static str,
}

/// POST /api/v1/tenants/:tenant/site-areas/:site_area_id/smart-charging
pub async fn trigger_smart_charging(
    State(st): State<AppState>,
    Path((tenant_id, site_area_id)): Path<(String, String)>,
) -> Result<Json<SmartChargingResponse>, ApiError> {
    let tenant = st
        .controller
        .find_tenant(&tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {tenant_id}")))?;

    info!(tenant = %tenant, site_area = %site_area_id, "smart charging triggered");
    let computed = st.controller.run_site_area(&tenant, &site_area_id).await?;
    let (profiles, unchanged) = computed
        .map(|c| (c.profiles, c.unchanged))
        .unwrap_or_default();

    Ok(Json(SmartChargingResponse {
        site_area_id,
        profiles,
        unchanged,
    }))
}

/// GET /api/v1/optimizer/check
pub async fn check_optimizer(
    State(st): State<AppState>,
) -> Result<Json<OptimizerCheckResponse>, ApiError> {
    st.controller.gateway().check_connection().await?;
    Ok(Json(OptimizerCheckResponse { status: "ok" }))
}
