//! Pattern library for PHI detection

use crate::domain::detection::PhiKind;
use anyhow::{Context, Result};
use fancy_regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Pattern definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct PatternDefinition {
    /// PHI kind label
    pub kind: String,
    /// Human-readable description
    pub description: String,
    /// Regex patterns for this kind
    pub patterns: Vec<String>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
}

/// Compiled pattern with metadata
///
/// Patterns are compiled with fancy-regex so look-around assertions are
/// available; registration order is preserved and used as the tie-break
/// when overlapping detections are deduplicated before masking.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Compiled regex
    pub regex: Arc<Regex>,
    /// PHI kind
    pub kind: PhiKind,
    /// Human-readable description
    pub description: String,
    /// Confidence score
    pub confidence: f32,
    /// Position in the registry, for deterministic tie-breaks
    pub priority: usize,
}

/// Pattern library container
#[derive(Debug, Deserialize)]
struct PatternLibrary {
    patterns: HashMap<String, PatternDefinition>,
}

/// Pattern registry for PHI detection
pub struct PatternRegistry {
    patterns: Vec<CompiledPattern>,
}

impl PatternRegistry {
    /// Create a new pattern registry from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read pattern library: {}",
                path.as_ref().display()
            )
        })?;

        Self::from_toml(&content)
    }

    /// Create a pattern registry from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let library: PatternLibrary =
            toml::from_str(content).context("Failed to parse pattern library TOML")?;

        // Sort groups by name so registration order is stable regardless of
        // TOML table iteration order.
        let mut groups: Vec<(String, PatternDefinition)> = library.patterns.into_iter().collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let mut patterns = Vec::new();
        for (name, def) in groups {
            let kind = PhiKind::from_str(&def.kind).expect("PhiKind parsing is infallible");

            for pattern_str in &def.patterns {
                let regex = Regex::new(pattern_str)
                    .with_context(|| format!("Invalid regex in pattern '{name}': {pattern_str}"))?;

                patterns.push(CompiledPattern {
                    regex: Arc::new(regex),
                    kind: kind.clone(),
                    description: def.description.clone(),
                    confidence: def.confidence,
                    priority: patterns.len(),
                });
            }
        }

        Ok(Self { patterns })
    }

    /// Create a default pattern registry with the built-in patterns
    pub fn default_patterns() -> Result<Self> {
        let default_toml = include_str!("../../../patterns/phi_patterns.toml");
        Self::from_toml(default_toml)
    }

    /// Get all patterns in registration order
    pub fn all_patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// Get patterns for a specific kind
    pub fn patterns_for_kind(&self, kind: &PhiKind) -> Vec<&CompiledPattern> {
        self.patterns.iter().filter(|p| &p.kind == kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_patterns() {
        let registry = PatternRegistry::default_patterns().unwrap();
        assert!(!registry.all_patterns().is_empty());
    }

    #[test]
    fn test_all_spec_kinds_present() {
        let registry = PatternRegistry::default_patterns().unwrap();
        for kind in [
            PhiKind::Ssn,
            PhiKind::Phone,
            PhiKind::Email,
            PhiKind::Mrn,
            PhiKind::Dob,
            PhiKind::Address,
            PhiKind::Zip,
            PhiKind::InsuranceId,
        ] {
            assert!(
                !registry.patterns_for_kind(&kind).is_empty(),
                "missing patterns for {kind}"
            );
        }
    }

    #[test]
    fn test_ssn_pattern() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let ssn_patterns = registry.patterns_for_kind(&PhiKind::Ssn);

        let hit = ssn_patterns
            .iter()
            .any(|p| p.regex.is_match("123-45-6789").unwrap());
        assert!(hit);

        // 9 digits embedded in a longer run must not match
        let embedded = ssn_patterns
            .iter()
            .any(|p| p.regex.is_match("12345678901234").unwrap());
        assert!(!embedded);
    }

    #[test]
    fn test_phone_pattern_excludes_zip_plus_four() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let phone_patterns = registry.patterns_for_kind(&PhiKind::Phone);

        assert!(phone_patterns
            .iter()
            .any(|p| p.regex.is_match("(555) 123-4567").unwrap()));
        assert!(phone_patterns
            .iter()
            .any(|p| p.regex.is_match("555-0123").unwrap()));

        // The local-number pattern must not fire inside a ZIP+4
        let zip4 = "90210-1234";
        let hit = phone_patterns
            .iter()
            .any(|p| p.regex.find(zip4).unwrap().is_some());
        assert!(!hit, "phone pattern matched inside ZIP+4");
    }

    #[test]
    fn test_mrn_pattern_case_insensitive() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let mrn_patterns = registry.patterns_for_kind(&PhiKind::Mrn);
        assert!(mrn_patterns
            .iter()
            .any(|p| p.regex.is_match("MRN: AB123456").unwrap()));
        assert!(mrn_patterns
            .iter()
            .any(|p| p.regex.is_match("medical record number 99887766").unwrap()));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let toml = r#"
[patterns.bad]
kind = "ssn"
description = "broken"
confidence = 0.8
patterns = ['(unclosed']
"#;
        assert!(PatternRegistry::from_toml(toml).is_err());
    }

    #[test]
    fn test_registration_order_is_stable() {
        let a = PatternRegistry::default_patterns().unwrap();
        let b = PatternRegistry::default_patterns().unwrap();
        let kinds_a: Vec<String> = a.all_patterns().iter().map(|p| p.kind.to_string()).collect();
        let kinds_b: Vec<String> = b.all_patterns().iter().map(|p| p.kind.to_string()).collect();
        assert_eq!(kinds_a, kinds_b);
    }
}
