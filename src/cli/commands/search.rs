//! Search command - full-text search over stored documents

use crate::config::load_config;
use crate::core::ProcessingCoordinator;
use crate::store::SearchFilters;
use clap::Args;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text (empty string lists the newest documents)
    pub query: String,

    /// Restrict to one handler's documents (pdf, docx, image, text)
    #[arg(long)]
    pub content_type: Option<String>,

    /// Only documents in which PHI was detected
    #[arg(long)]
    pub phi_only: bool,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    /// Execute the search command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;
        let coordinator = ProcessingCoordinator::new(config).await?;

        let filters = SearchFilters {
            content_type: self.content_type.clone(),
            phi_detected: self.phi_only.then_some(true),
            limit: self.limit,
            ..SearchFilters::default()
        };

        let response = coordinator.search_documents(&self.query, &filters).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else if let Some(ref error) = response.error {
            eprintln!("Search failed: {error}");
        } else {
            println!("{} result(s)", response.results.len());
            for hit in &response.results {
                println!(
                    "{:<40} {:<8} phi={:<5} entities={:<4} rank={:.3}",
                    hit.document_id, hit.content_type, hit.phi_detected, hit.entity_count, hit.rank
                );
            }
            for disclaimer in &response.disclaimers {
                println!("Note: {disclaimer}");
            }
        }

        Ok(if response.success { 0 } else { 1 })
    }
}
