pub mod api;
pub mod applications;
pub mod client;
pub mod config;
pub mod db;
pub mod ledger;
pub mod models;
pub mod patients;
pub mod queue;
pub mod signature;

use tracing_subscriber::EnvFilter;

/// Start the HTTP service and block until Ctrl-C.
pub fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let server_config = config::ServerConfig::from_env()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    runtime.block_on(async move {
        let mut server = api::start_server(&server_config).await?;
        tracing::info!(
            addr = %server.session.server_addr,
            db = %server_config.database_path.display(),
            "Serving"
        );

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
        server.shutdown();
        server.wait().await;
        Ok::<(), String>(())
    })
}
