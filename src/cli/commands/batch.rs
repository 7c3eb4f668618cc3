//! Batch command - process many documents concurrently

use crate::config::load_config;
use crate::core::ProcessingCoordinator;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Files and/or directories to process (directories are expanded
    /// non-recursively)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print the full batch response as JSON
    #[arg(long)]
    pub json: bool,
}

impl BatchArgs {
    /// Execute the batch command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;
        let coordinator = ProcessingCoordinator::new(config).await?;

        let paths = expand_inputs(&self.inputs)?;
        if paths.is_empty() {
            eprintln!("No files to process");
            return Ok(1);
        }

        let options = coordinator.default_options();
        let response = coordinator
            .process_batch(paths, &options, Some(shutdown))
            .await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            let summary = &response.summary;
            println!("Processed:  {}/{} succeeded", summary.succeeded, summary.total);
            println!("PHI:        {} document(s), {} detection(s)", summary.phi_documents, summary.phi_detections);
            println!("Entities:   {}", summary.entities_extracted);
            println!("Stored:     {}", summary.stored);
            println!("Duration:   {} ms", summary.duration_ms);
            for failure in &summary.failures {
                println!("Failed:     {}: {}", failure.path, failure.error);
            }
            for disclaimer in &response.disclaimers {
                println!("Note:       {disclaimer}");
            }
        }

        Ok(if response.summary.failed == 0 { 0 } else { 2 })
    }
}

/// Expand directories (one level) into the files they contain
fn expand_inputs(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            entries.sort();
            paths.extend(entries);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_inputs_mixes_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let single = dir.path().join("single.pdf");
        std::fs::write(&single, "x").unwrap();

        let expanded =
            expand_inputs(&[dir.path().to_path_buf()]).unwrap();
        // Directory contents are sorted for deterministic batch order.
        let names: Vec<String> = expanded
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "single.pdf"]);

        let direct = expand_inputs(&[single.clone()]).unwrap();
        assert_eq!(direct, vec![single]);
    }
}
