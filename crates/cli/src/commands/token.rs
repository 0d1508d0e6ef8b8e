//! `prodops token`: Issue a bearer token signed with the gateway secret.

use prodops_core::UserIdentity;
use prodops_security::TokenSigner;
use std::path::Path;

use super::load_config;

pub fn run(
    config_path: Option<&Path>,
    user_id: i64,
    email: String,
    roles: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let secret = config
        .gateway
        .token_secret
        .ok_or("gateway.token_secret (or PRODOPS_TOKEN_SECRET) must be set to issue tokens")?;

    let signer = TokenSigner::new(
        secret,
        chrono::Duration::minutes(config.gateway.token_ttl_minutes),
    );
    let token = signer.issue(&UserIdentity {
        user_id,
        email,
        roles,
    })?;
    println!("{token}");
    Ok(())
}
