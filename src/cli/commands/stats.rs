//! Stats command - store statistics and dependency health

use crate::config::load_config;
use crate::core::ProcessingCoordinator;
use clap::Args;

/// Arguments for the stats command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsArgs {
    /// Execute the stats command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;
        let coordinator = ProcessingCoordinator::new(config).await?;

        let (nlp_healthy, store_healthy) = coordinator.dependency_health().await;
        println!("NLP service:    {}", if nlp_healthy { "healthy" } else { "unavailable" });
        match store_healthy {
            Some(true) => println!("Document store: healthy"),
            Some(false) => println!("Document store: unavailable"),
            None => println!("Document store: not configured"),
        }

        if coordinator.store_attached() {
            match coordinator.store_statistics().await {
                Ok(stats) => {
                    if self.json {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    } else {
                        println!("Documents:      {}", stats.total_documents);
                        println!("With PHI:       {}", stats.phi_documents);
                        println!("Entities:       {}", stats.total_entities);
                        println!("PHI details:    {}", stats.total_phi_details);
                        println!("Avg confidence: {:.2}", stats.average_confidence);
                        for (content_type, count) in &stats.by_content_type {
                            println!("  {content_type:<8} {count}");
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Failed to read statistics: {e}");
                    return Ok(1);
                }
            }
        }

        Ok(0)
    }
}
