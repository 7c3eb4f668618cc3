//! Validate-config command

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match load_config(config_path) {
            Ok(config) => {
                println!("Configuration valid: {config_path}");
                println!("  NLP service:  {}", config.nlp.base_url);
                println!(
                    "  PHI:          detection={} redaction={} level={}",
                    config.phi.detection_enabled,
                    config.phi.redaction_enabled,
                    config.phi.redaction_level.label()
                );
                println!(
                    "  Storage:      {}",
                    if config.storage.is_some() {
                        "configured"
                    } else {
                        "not configured"
                    }
                );
                Ok(0)
            }
            Err(e) => {
                eprintln!("Configuration invalid: {e}");
                Ok(1)
            }
        }
    }
}
