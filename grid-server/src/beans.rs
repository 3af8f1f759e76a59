//! Producers that build the bean graph `main.rs` registers with
//! [`AppBuilder`]. Kept separate from `main.rs` so the wiring reads as a flat
//! list of "how do I get one of these" answers rather than being buried in
//! `fn main`.

use std::sync::Arc;

use grid_authn::GroupClaimPath;
use grid_authz_cache::GroupRoleCache;
use grid_data::GridRepositories;
use grid_dependency::DependencyService;
use grid_edge_job::EdgeUpdateJob;
use grid_policy::{PolicyEngine, RoleCatalog};
use grid_state::{EdgeUpdateTrigger, StateService};
use r2e_core::prelude::*;
use r2e_security::{JwksCache, JwtClaimsValidator, SecurityConfig};

use crate::role_catalog::RoleNameCache;

#[producer]
async fn create_pool(#[config("database.url")] url: String) -> sqlx::PgPool {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("failed to connect to the Grid database")
}

#[producer]
fn create_repos(pool: sqlx::PgPool) -> GridRepositories {
    GridRepositories::new(pool)
}

#[producer]
fn create_policy_engine() -> PolicyEngine {
    PolicyEngine::new()
}

/// Loaded eagerly so the first request after startup already sees every
/// persisted role instead of an empty snapshot; `AdminController`'s
/// scheduled job and `/admin/cache/refresh` keep it current afterwards.
#[producer]
async fn create_role_cache(repos: GridRepositories) -> RoleNameCache {
    let cache = RoleNameCache::new();
    if let Err(err) = cache.refresh(&repos).await {
        tracing::warn!(error = %err, "initial role catalog refresh failed, starting with an empty catalog");
    }
    cache
}

#[producer]
fn create_role_catalog(role_cache: RoleNameCache) -> Arc<dyn RoleCatalog> {
    Arc::new(role_cache)
}

#[producer]
async fn create_group_role_cache(repos: GridRepositories) -> GroupRoleCache {
    let cache = GroupRoleCache::new();
    if let Err(err) = cache.refresh(&repos).await {
        tracing::warn!(error = %err, "initial group-role cache refresh failed, starting empty");
    }
    cache
}

#[producer]
fn create_group_claim_path(#[config("auth.group_claim_path")] path: String) -> GroupClaimPath {
    if path.is_empty() || path == "groups" {
        return GroupClaimPath::default();
    }
    GroupClaimPath(Box::leak(path.into_boxed_str()))
}

#[producer]
fn create_edge_job(repos: GridRepositories) -> EdgeUpdateJob {
    EdgeUpdateJob::new(repos)
}

#[producer]
fn create_edge_trigger(edge_job: EdgeUpdateJob) -> Arc<dyn EdgeUpdateTrigger> {
    Arc::new(edge_job)
}

#[producer]
fn create_state_service(
    repos: GridRepositories,
    policy: PolicyEngine,
    edge_trigger: Arc<dyn EdgeUpdateTrigger>,
    #[config("backend.base_url")] base_url: String,
) -> StateService {
    let threshold: usize = 10 * 1024 * 1024;
    StateService::new(repos, policy, edge_trigger, base_url)
        .with_size_warning_threshold_bytes(threshold)
}

#[producer]
fn create_dependency_service(
    repos: GridRepositories,
    #[config("backend.base_url")] base_url: String,
) -> DependencyService {
    DependencyService::new(repos, base_url)
}

/// Builds the resource-server side of token validation: a JWKS-backed
/// validator when `security.jwks_url` is configured, falling back to a
/// static HMAC key for local development (mirroring the demo setup in
/// `example-app`, minus the embedded token issuer).
#[producer]
async fn create_jwt_validator(config: R2eConfig) -> Arc<JwtClaimsValidator> {
    let issuer: String = config.get_or("security.issuer", "grid".to_string());
    let audience: String = config.get_or("security.audience", "grid-api".to_string());

    if config.contains_key("security.jwks_url") {
        let jwks_url: String = config
            .get("security.jwks_url")
            .expect("security.jwks_url checked present above");
        let sec_config = SecurityConfig::new(jwks_url, issuer, audience);
        let jwks = JwksCache::new(sec_config.clone())
            .await
            .expect("failed to fetch initial JWKS keyset");
        Arc::new(JwtClaimsValidator::new(Arc::new(jwks), sec_config))
    } else {
        tracing::warn!(
            "security.jwks_url not configured, falling back to a static HS256 \
             development key — do not use this in production"
        );
        let secret: String = config.get_or(
            "security.dev_shared_secret",
            "grid-dev-shared-secret-change-me".to_string(),
        );
        let sec_config = SecurityConfig::new("unused", issuer, audience)
            .with_allowed_algorithm(jsonwebtoken::Algorithm::HS256);
        Arc::new(JwtClaimsValidator::new_with_static_key(
            jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            sec_config,
        ))
    }
}
