//! `prodops config`: Configuration management commands.

use prodops_config::AppConfig;
use std::path::{Path, PathBuf};

use super::load_config;

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    println!("{}", config.redacted_toml());
    Ok(())
}

/// Problems that do not stop the process from starting but limit it.
pub fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if config.llm.api_key.is_none() {
        warnings.push("No language model API key set (set OPENAI_API_KEY)");
    }
    if config.database.url.is_none() {
        warnings.push("No database configured (set DATABASE_URL); lookups and tickets are unavailable");
    }
    if config.gateway.token_secret.is_none() {
        warnings.push("No token secret set (set PRODOPS_TOKEN_SECRET); tokens will not survive a restart");
    }
    let n = &config.notifications;
    if !n.email_recipients.is_empty() && n.sendgrid_api_key.is_none() {
        warnings.push("Email recipients configured without SENDGRID_API_KEY");
    }
    if !n.whatsapp_recipients.is_empty() && n.twilio_auth_token.is_none() {
        warnings.push("WhatsApp recipients configured without Twilio credentials");
    }
    warnings
}

pub fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e);
        }
    };
    println!("   Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    println!();
    println!("   Model:      {}", config.llm.model);
    println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);
    println!("   Docs:       {}", config.knowledge.docs_dir);
    println!(
        "   Recipients: {} email, {} whatsapp",
        config.notifications.email_recipients.len(),
        config.notifications.whatsapp_recipients.len()
    );
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_path);
    println!("{}", path.display());
}

fn default_path() -> PathBuf {
    AppConfig::config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        assert!(default_path().to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn defaults_warn_about_missing_credentials() {
        let w = warnings(&AppConfig::default());
        assert!(w.iter().any(|w| w.contains("OPENAI_API_KEY")));
        assert!(w.iter().any(|w| w.contains("DATABASE_URL")));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[workflow]\ndefault_line = \"LINE-7\"\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.workflow.default_line, "LINE-7");
    }
}
