//! Process command - run one document through the intake pipeline

use crate::config::load_config;
use crate::core::ProcessingCoordinator;
use crate::handlers::PipelineOptions;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Document to process
    pub file: PathBuf,

    /// Caller-supplied document id (derived from the content hash otherwise)
    #[arg(long)]
    pub document_id: Option<String>,

    /// Skip PHI detection entirely
    #[arg(long)]
    pub no_detect: bool,

    /// Detect but do not redact
    #[arg(long)]
    pub no_redact: bool,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProcessArgs {
    /// Execute the process command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;
        let coordinator = ProcessingCoordinator::new(config).await?;

        let options = PipelineOptions {
            document_id: self.document_id.clone(),
            context: None,
            detect_phi: !self.no_detect,
            redact: !self.no_detect && !self.no_redact,
            redaction_level: None,
        };

        let response = coordinator.process_document(&self.file, &options).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else if let Some(ref result) = response.result {
            println!("Document:   {}", result.document_id);
            println!("Handler:    {}", result.content_type);
            println!("Success:    {}", result.success);
            println!(
                "Text:       {} chars extracted",
                result.extracted_text.chars().count()
            );
            if let Some(ref analysis) = result.phi_analysis {
                println!(
                    "PHI:        {} detection(s), kinds: {}",
                    analysis.detections.len(),
                    analysis
                        .phi_types
                        .iter()
                        .map(|k| k.label().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            println!("Entities:   {}", result.entity_count());
            if let Some(ref stored) = response.stored {
                println!(
                    "Stored:     {} (truncated: {})",
                    stored.document_id, stored.truncated
                );
            }
            for warning in &result.processing_warnings {
                println!("Warning:    {warning}");
            }
            for error in &result.processing_errors {
                println!("Error:      {error}");
            }
            println!("Time:       {} ms", result.processing_time_ms);
            for disclaimer in &response.disclaimers {
                println!("Note:       {disclaimer}");
            }
        }

        Ok(if response.success { 0 } else { 1 })
    }
}
