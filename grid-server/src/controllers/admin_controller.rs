//! Cache refresh and auth discovery — the two endpoints that don't belong to
//! any single RPC resource. `/health` needs no handler here; the `Health`
//! plugin already answers it.

use chrono::Utc;
use grid_authn::GridPrincipal;
use grid_authz_cache::GroupRoleCache;
use grid_data::GridRepositories;
use grid_policy::PolicyCheck;
use r2e_core::prelude::*;
use serde::Serialize;

use crate::error::RpcError;
use crate::role_catalog::RoleNameCache;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheRefreshResponse {
    status: &'static str,
    version: u64,
    groups: usize,
    timestamp: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AuthConfigResponse {
    mode: &'static str,
    issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<String>,
    supports_device_flow: bool,
}

async fn refresh_caches(
    repos: &GridRepositories,
    group_role_cache: &GroupRoleCache,
    role_cache: &RoleNameCache,
) -> Result<CacheRefreshResponse, RpcError> {
    let snapshot = group_role_cache
        .refresh(repos)
        .await
        .map_err(|err| RpcError(grid_data::GridError::Internal(err.to_string())))?;
    role_cache
        .refresh(repos)
        .await
        .map_err(|err| RpcError(grid_data::GridError::Internal(err.to_string())))?;

    Ok(CacheRefreshResponse {
        status: "ok",
        version: snapshot.version,
        groups: snapshot.group_count(),
        timestamp: Utc::now(),
    })
}

#[derive(Controller)]
#[controller(state = AppState)]
pub struct AdminController {
    #[inject]
    repos: GridRepositories,
    #[inject]
    group_role_cache: GroupRoleCache,
    #[inject]
    role_cache: RoleNameCache,
    #[inject]
    config: R2eConfig,
}

#[routes]
impl AdminController {
    #[post("/admin/cache/refresh")]
    #[guard(PolicyCheck::action("cache-refresh").on("admin"))]
    async fn refresh_cache(
        &self,
        #[inject(identity)] _identity: GridPrincipal,
    ) -> Result<Json<CacheRefreshResponse>, RpcError> {
        let body = refresh_caches(&self.repos, &self.group_role_cache, &self.role_cache).await?;
        Ok(Json(body))
    }

    #[get("/auth/config")]
    async fn auth_config(&self) -> Json<AuthConfigResponse> {
        let issuer = self.config.get_or("security.issuer", "grid".to_string());
        let client_id = self.config.get::<String>("security.client_id").ok();
        let audience = self.config.get::<String>("security.audience").ok();
        let supports_device_flow = self.config.get_or("security.supports_device_flow", false);
        let mode = if self.config.contains_key("security.jwks_url") {
            "oidc"
        } else {
            "dev-static-key"
        };
        Json(AuthConfigResponse {
            mode,
            issuer,
            client_id,
            audience,
            supports_device_flow,
        })
    }

    /// Keeps the role catalog and group mapping current without waiting for
    /// an operator to hit `/admin/cache/refresh`.
    #[scheduled(every = 300)]
    async fn periodic_refresh(&self) {
        if let Err(err) = refresh_caches(&self.repos, &self.group_role_cache, &self.role_cache).await {
            tracing::warn!(error = %err, "scheduled group/role cache refresh failed");
        }
    }
}
