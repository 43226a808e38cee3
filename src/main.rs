use anyhow::Result;
use perla_bridge::config::Config;
use perla_bridge::coordinator::Coordinator;
use perla_bridge::logging::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional explicit config path, otherwise the default search locations
    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", path, e))?,
        None => Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?,
    };
    config.apply_env_overrides();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Perla Bridge {} starting for device '{}'",
        env!("CARGO_PKG_VERSION"),
        config.device_name
    );

    let mut coordinator = Coordinator::from_config(&config);

    #[cfg(feature = "web")]
    let web_task = if config.web.enabled {
        let state = perla_bridge::web::AppState {
            device_name: config.device_name.clone(),
            snapshot_rx: coordinator.subscribe(),
        };
        let host = config.web.host.clone();
        let port = config.web.port;
        Some(tokio::spawn(async move {
            if let Err(e) = perla_bridge::web::serve(state, &host, port).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    coordinator
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    #[cfg(feature = "web")]
    if let Some(task) = web_task {
        task.abort();
    }

    info!("Perla Bridge stopped");
    Ok(())
}
