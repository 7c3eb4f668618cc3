//! Medical entity data models

use serde::{Deserialize, Serialize};

/// Entity types that always warrant close administrative attention.
const HIGH_PRIORITY_TYPES: &[&str] = &[
    "CHEMICAL",
    "MEDICATION",
    "DISEASE",
    "CONDITION",
    "ANATOMY",
    "ORGAN",
    "GENE_PROTEIN",
];

/// One medical entity extracted by the NLP service, locally enriched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalEntity {
    /// Surface text of the entity
    pub text: String,
    /// Entity type label from the service (DISEASE, CHEMICAL, ANATOMY, ...)
    pub entity_type: String,
    /// Start offset in the source text
    pub start: usize,
    /// End offset in the source text
    pub end: usize,
    /// Model score, when the service reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Always true: extracted entities are never authoritative
    pub requires_review: bool,
    /// Whether the type is in the fixed high-priority set
    pub is_high_priority: bool,
    /// Administrative usage hint for this entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_hint: Option<String>,
}

impl MedicalEntity {
    /// Create an entity and apply the local enrichment rules.
    pub fn enriched(
        text: impl Into<String>,
        entity_type: impl Into<String>,
        start: usize,
        end: usize,
        score: Option<f32>,
    ) -> Self {
        let entity_type = entity_type.into();
        let upper = entity_type.to_uppercase();
        let is_high_priority = HIGH_PRIORITY_TYPES.contains(&upper.as_str());
        let usage_hint = usage_hint_for(&upper);
        Self {
            text: text.into(),
            entity_type,
            start,
            end,
            score,
            requires_review: true,
            is_high_priority,
            usage_hint,
        }
    }

    /// Summary bucket this entity falls into.
    pub fn category(&self) -> EntityCategory {
        match self.entity_type.to_uppercase().as_str() {
            "CHEMICAL" | "MEDICATION" | "DRUG" => EntityCategory::Medications,
            "DISEASE" | "CONDITION" | "DIAGNOSIS" => EntityCategory::Conditions,
            "ANATOMY" | "ORGAN" | "BODY_PART" => EntityCategory::Anatomy,
            "GENE_PROTEIN" | "GENE" | "PROTEIN" => EntityCategory::Genetics,
            _ => EntityCategory::Other,
        }
    }
}

/// Administrative usage hint for an upper-cased entity type.
fn usage_hint_for(entity_type: &str) -> Option<String> {
    let hint = match entity_type {
        "CHEMICAL" | "MEDICATION" | "DRUG" => {
            "Cross-check against the formulary before any coverage decision"
        }
        "DISEASE" | "CONDITION" | "DIAGNOSIS" => {
            "May map to an ICD-10 code; verify with coding staff"
        }
        "ANATOMY" | "ORGAN" | "BODY_PART" => {
            "Relevant for procedure-site validation in claims review"
        }
        "GENE_PROTEIN" | "GENE" | "PROTEIN" => {
            "Genetic information; handle under heightened confidentiality rules"
        }
        "PROCEDURE" => "May map to a CPT code; verify with coding staff",
        _ => return None,
    };
    Some(hint.to_string())
}

/// Clinical summary buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Medications,
    Conditions,
    Anatomy,
    Genetics,
    Other,
}

/// Per-category slice of a clinical summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Number of entities in this category
    pub count: usize,
    /// Up to three sample surface texts
    pub samples: Vec<String>,
}

/// Maximum number of sample texts kept per category.
const MAX_SAMPLES: usize = 3;

impl CategorySummary {
    fn add(&mut self, text: &str) {
        self.count += 1;
        if self.samples.len() < MAX_SAMPLES && !self.samples.iter().any(|s| s == text) {
            self.samples.push(text.to_string());
        }
    }
}

/// Categorized view over a set of extracted entities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalSummary {
    pub medications: CategorySummary,
    pub conditions: CategorySummary,
    pub anatomy: CategorySummary,
    pub genetics: CategorySummary,
    pub other: CategorySummary,
}

impl ClinicalSummary {
    /// Build a summary by bucketing entities into the fixed categories.
    pub fn from_entities(entities: &[MedicalEntity]) -> Self {
        let mut summary = Self::default();
        for entity in entities {
            let bucket = match entity.category() {
                EntityCategory::Medications => &mut summary.medications,
                EntityCategory::Conditions => &mut summary.conditions,
                EntityCategory::Anatomy => &mut summary.anatomy,
                EntityCategory::Genetics => &mut summary.genetics,
                EntityCategory::Other => &mut summary.other,
            };
            bucket.add(&entity.text);
        }
        summary
    }

    /// Total entity count across all categories.
    pub fn total(&self) -> usize {
        self.medications.count
            + self.conditions.count
            + self.anatomy.count
            + self.genetics.count
            + self.other.count
    }
}
