use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use watchdog::config::{Config, RegistryBackend};
use watchdog::cycle::OfflineChecker;
use watchdog::errors::Result;
use watchdog::notifier::FcmNotifier;
use watchdog::registry::{FirebaseRegistry, RegistryReader};
use watchdog::{db, metrics, rest, scheduler};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("watchdog=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("Watchdog failed: {}", e);
        std::process::exit(1);
    }

    info!("Shutting down");
}

async fn run(config: Config) -> Result<()> {
    info!("Starting device offline watchdog");
    info!(
        "Offline threshold: {}s, check interval: {:?}",
        config.offline_threshold_secs, config.check_interval
    );

    if let Err(e) = metrics::init_metrics() {
        error!("Failed to register metrics: {}", e);
    }

    let registry: Arc<dyn RegistryReader> = match &config.registry {
        RegistryBackend::Firebase {
            database_url,
            path,
            auth,
        } => {
            info!("Registry: Firebase {}/{}", database_url, path);
            Arc::new(FirebaseRegistry::new(
                database_url,
                path,
                auth.clone(),
                config.registry_timeout,
            )?)
        }
        RegistryBackend::Postgres { database_url } => {
            info!("Registry: Postgres {}", database_url.split('@').last().unwrap_or("***"));
            let pool = db::make_pool(database_url, config.registry_timeout).await?;
            Arc::new(db::PgRegistry::new(pool))
        }
    };

    let notifier = Arc::new(FcmNotifier::new(
        &config.fcm_endpoint,
        &config.fcm_project_id,
        config.fcm_access_token.clone(),
        config.notify_timeout,
    )?);

    let checker = Arc::new(
        OfflineChecker::new(registry, notifier)
            .with_threshold(config.offline_threshold_secs)
            .with_notify_timeout(config.notify_timeout)
            .with_registry_timeout(config.registry_timeout),
    );

    if config.run_once {
        let report = checker.run_cycle_now().await;
        info!("Single check finished: {:?}", report.outcome);
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!("HTTP server listening on {}", config.http_addr);

    let app = rest::create_router(Arc::clone(&checker));
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    let scheduler_handle = tokio::spawn(scheduler::run_scheduler(checker, config.check_interval));

    tokio::select! {
        _ = scheduler_handle => {
            error!("Scheduler task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}
