//! `prodops serve`: Start the HTTP API server.

use prodops_gateway::Services;
use std::path::Path;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("ProdOps Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Database:  {}",
        if config.database.url.is_some() { "configured" } else { "not configured (offline mode)" }
    );

    let services = Services::build(config).await?;
    prodops_gateway::start(services).await?;
    Ok(())
}
