//! Wire types for the medical-NLP service

use serde::{Deserialize, Serialize};

/// Request body for `POST /analyze`
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    /// Text to analyze
    pub text: &'a str,
    /// Whether the service should attach its own enrichment
    pub enrich: bool,
}

/// Request body for `POST /extract-by-type`
#[derive(Debug, Serialize)]
pub struct ExtractByTypeRequest<'a> {
    /// Text to analyze
    pub text: &'a str,
    /// Entity types to keep
    pub types: &'a [String],
}

/// Response body shared by `/analyze` and `/extract-by-type`
#[derive(Debug, Deserialize)]
pub struct AnalyzeResponse {
    /// Extracted entities
    pub entities: Vec<WireEntity>,
}

/// One entity as the service reports it
///
/// Unknown fields are dropped; `start`/`end` are character offsets into
/// the submitted text.
#[derive(Debug, Clone, Deserialize)]
pub struct WireEntity {
    /// Surface text
    pub text: String,
    /// Entity type label
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Start offset
    pub start: usize,
    /// End offset
    pub end: usize,
    /// Model score, when reported
    #[serde(default)]
    pub score: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_entity_deserializes_service_shape() {
        let json = r#"{"text":"metformin","type":"CHEMICAL","start":4,"end":13,"score":0.98,"model":"biobert"}"#;
        let entity: WireEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.entity_type, "CHEMICAL");
        assert_eq!(entity.start, 4);
        assert_eq!(entity.score, Some(0.98));
    }

    #[test]
    fn test_wire_entity_score_optional() {
        let json = r#"{"text":"liver","type":"ANATOMY","start":0,"end":5}"#;
        let entity: WireEntity = serde_json::from_str(json).unwrap();
        assert!(entity.score.is_none());
    }
}
