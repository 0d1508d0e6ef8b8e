//! `prodops chat`: Run one workflow turn without the HTTP layer.

use prodops_gateway::Services;
use std::path::Path;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    user_id: i64,
    roles: Vec<String>,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    if config.llm.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: No language model API key configured!");
        eprintln!();
        eprintln!("  Set OPENAI_API_KEY, or add it to your config file:");
        eprintln!("    [llm]");
        eprintln!("    api_key = \"sk-...\"");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let services = Services::build(config).await?;
    let reply = run_turn(&services, user_id, &roles, message).await?;
    println!("{reply}");
    Ok(())
}

/// Run one turn, then deliver any ticket notifications it triggered before
/// returning, since the process exits right after.
pub async fn run_turn(
    services: &Services,
    user_id: i64,
    roles: &[String],
    message: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut events = services.subscribe_events();
    let reply = services.engine.submit_turn(user_id, roles, message).await?;
    services.deliver_pending_notifications(&mut events).await;
    Ok(reply)
}
