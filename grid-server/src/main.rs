use r2e_core::prelude::*;
use r2e_scheduler::Scheduler;

mod authz;
mod beans;
mod controllers;
mod error;
mod role_catalog;
mod state;
mod tf_backend;

use controllers::admin_controller::AdminController;
use controllers::dependencies_controller::DependenciesController;
use controllers::roles_controller::RolesController;
use controllers::states_controller::StatesController;
use state::AppState;

#[tokio::main]
async fn main() {
    r2e_core::init_tracing();

    let config = R2eConfig::load("dev").unwrap_or_else(|_| R2eConfig::empty());
    let bind_addr: String = config.get_or("server.bind_addr", "0.0.0.0:3000".to_string());

    AppBuilder::new()
        .plugin(Scheduler)
        .provide(config.clone())
        .with_producer::<beans::CreatePool>()
        .with_producer::<beans::CreateRepos>()
        .with_producer::<beans::CreatePolicyEngine>()
        .with_producer::<beans::CreateRoleCache>()
        .with_producer::<beans::CreateRoleCatalog>()
        .with_producer::<beans::CreateGroupRoleCache>()
        .with_producer::<beans::CreateGroupClaimPath>()
        .with_producer::<beans::CreateEdgeJob>()
        .with_producer::<beans::CreateEdgeTrigger>()
        .with_producer::<beans::CreateStateService>()
        .with_producer::<beans::CreateDependencyService>()
        .with_producer::<beans::CreateJwtValidator>()
        .build_state::<AppState, _, _>()
        .await
        .with_config(config)
        .with(Health)
        .with(Cors::permissive())
        .with(Tracing)
        .with(ErrorHandling)
        .on_start(|state| async move {
            sqlx::migrate!("./migrations")
                .run(&state.pool)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            tracing::info!("Grid database migrations applied");
            Ok(())
        })
        .merge_router(tf_backend::router())
        .register_controller::<StatesController>()
        .register_controller::<DependenciesController>()
        .register_controller::<RolesController>()
        .register_controller::<AdminController>()
        .serve(&bind_addr)
        .await
        .unwrap();
}
