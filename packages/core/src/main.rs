use std::net::SocketAddr;
use std::sync::Arc;
use playground_core::config::PlaygroundConfig;
use playground_core::engine::BuildEngine;
use playground_core::server;
use env_logger;
use log;
use dotenv;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = match PlaygroundConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    log::info!("Workspace root: {}", config.workspace_root.display());
    log::info!("Template directory: {}", config.template_dir.display());

    let engine = Arc::new(BuildEngine::from_config(&config).await?);
    match engine.admission().available() {
        Some(slots) => log::info!("Build slots: {}", slots),
        None => log::info!("Build slots: unbounded"),
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    match server::serve(engine, addr).await {
        Ok(_) => log::info!("Server stopped gracefully"),
        Err(e) => {
            log::error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
