use tokio::signal;
use tracing::{info, warn};
use waypoints::app_config::AppConfig;
use waypoints::directory::DirectoryService;
use waypoints::rpc::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    let seed = config.directory().waypoints().to_vec();
    let num_waypoints = seed.len();
    let directory = DirectoryService::with_waypoints(seed)?;
    info!("✅  Initialized directory with {} waypoint(s)", num_waypoints);

    let listener = server::bind(&config).await?;
    info!("🔥 {} is up and running", env!("CARGO_PKG_NAME"));

    server::serve(listener, directory, config.server().read_timeout(), async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("⚠️ Could not listen for shutdown signal, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    info!("👋 {} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
