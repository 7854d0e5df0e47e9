use std::sync::Arc;

use tracing::{error, info, warn};

use rbac_core::domain::MenuSeed;
use rbac_core::policy::{MemoryEnforcer, PolicyEnforcer, PolicyReloadQueue, RepositoryPolicyAdapter};
use rbac_core::services::MenuService;
use rbac_core::Ctx;
use rbac_infrastructure::{create_pool, run_migrations, PgRepositories};
use rbac_shared::config::AppConfig;
use rbac_shared::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (.env, config files, environment)
    let config = AppConfig::load()?;

    // Initialize telemetry
    init_telemetry(&config.log)?;

    info!("{} starting (env: {})", config.app.name, config.app.env);

    // Connect to Database
    info!("Connecting to database...");
    let pool = create_pool(&config.database).await?;
    info!("Database connection established.");

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let repos = PgRepositories::build(&pool);
    let ctx = Ctx::new().with_trace_id("startup");

    // Policy engine: one synchronous load, then the reload worker
    let enforcer = Arc::new(
        MemoryEnforcer::new(Arc::new(RepositoryPolicyAdapter::new(repos.clone())))
            .with_debug(config.policy.debug),
    );
    let (reload_queue, worker) = if config.policy.enabled {
        enforcer.load_policy(&ctx).await?;
        let (queue, worker) = PolicyReloadQueue::start(enforcer.clone() as Arc<dyn PolicyEnforcer>);
        (queue, Some(worker))
    } else {
        warn!("Policy engine disabled, reload signals will be ignored");
        (PolicyReloadQueue::disabled(), None)
    };

    // Seed the menu tree on an empty database
    let menus = MenuService::new(&repos, reload_queue.clone());
    if let Some(seed_file) = config.menu.seed_file.as_deref() {
        let raw = tokio::fs::read_to_string(seed_file).await?;
        let seeds: Vec<MenuSeed> = serde_json::from_str(&raw)?;
        let created = menus.init_data(&ctx, &seeds).await?;
        let total: usize = seeds.iter().map(MenuSeed::count).sum();
        info!("Menu seed {}: {} of {} menus created", seed_file, created, total);
    }

    info!("{} ready", config.app.name);

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down...");

    // Apply any pending reload before the pool goes away
    if let Some(worker) = worker {
        worker.shutdown().await;
    }
    info!(
        "Policy reloads: {} signals, {} completed, {} failed",
        reload_queue.signal_count(),
        reload_queue.completed_reloads(),
        reload_queue.failed_reloads()
    );

    pool.close().await;
    info!("{} stopped", config.app.name);

    Ok(())
}
