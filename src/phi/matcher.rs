//! Regex-based PHI pattern matcher

use crate::domain::detection::{Detection, DetectionMethod, PhiKind};
use crate::phi::patterns::PatternRegistry;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Regex-based PHI matcher
///
/// Applies every pattern in the registry independently against the full
/// text. A single character range can match several pattern categories;
/// the matcher reports all of them and leaves deduplication to the caller.
/// Detection offsets are character offsets into the source text.
pub struct PatternMatcher {
    registry: Arc<PatternRegistry>,
}

impl PatternMatcher {
    /// Create a matcher with the built-in pattern library
    pub fn new() -> Result<Self> {
        Ok(Self {
            registry: Arc::new(PatternRegistry::default_patterns()?),
        })
    }

    /// Create a matcher with a custom pattern registry
    pub fn with_registry(registry: PatternRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Access the underlying registry
    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Detect PHI in a text blob
    ///
    /// An empty or whitespace-only string yields zero detections, not an
    /// error. Detections are returned in source-text order with the
    /// originating pattern's priority as a deterministic tie-break.
    pub fn detect(&self, text: &str) -> Result<Vec<Detection>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let byte_to_char = byte_to_char_index(text);
        let mut detections: Vec<(usize, Detection)> = Vec::new();

        for pattern in self.registry.all_patterns() {
            for matched in pattern.regex.find_iter(text) {
                let matched = match matched {
                    Ok(m) => m,
                    Err(e) => {
                        // Catastrophic backtracking on pathological input;
                        // skip this pattern rather than fail the pass.
                        tracing::warn!(
                            kind = %pattern.kind,
                            error = %e,
                            "Pattern evaluation failed, skipping"
                        );
                        break;
                    }
                };

                let start = byte_to_char[&matched.start()];
                let end = byte_to_char[&matched.end()];
                detections.push((
                    pattern.priority,
                    Detection::new(
                        pattern.kind.clone(),
                        pattern.description.clone(),
                        start,
                        end,
                        matched.as_str(),
                        pattern.confidence,
                        DetectionMethod::Pattern,
                    ),
                ));
            }
        }

        detections.sort_by(|(pa, a), (pb, b)| {
            a.start
                .cmp(&b.start)
                .then(b.end.cmp(&a.end))
                .then(pa.cmp(pb))
        });

        Ok(detections.into_iter().map(|(_, d)| d).collect())
    }

    /// Detect PHI of a single kind
    pub fn detect_kind(&self, text: &str, kind: &PhiKind) -> Result<Vec<Detection>> {
        Ok(self
            .detect(text)?
            .into_iter()
            .filter(|d| &d.kind == kind)
            .collect())
    }
}

/// Map every regex byte offset to its character offset.
///
/// Built once per text so per-match conversion stays O(1); includes the
/// end-of-text offset so half-open spans convert cleanly.
fn byte_to_char_index(text: &str) -> HashMap<usize, usize> {
    let mut map = HashMap::with_capacity(text.len() + 1);
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        map.insert(byte_idx, char_idx);
    }
    map.insert(text.len(), text.chars().count());
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn matcher() -> PatternMatcher {
        PatternMatcher::new().unwrap()
    }

    #[test_case("SSN: 123-45-6789", PhiKind::Ssn ; "dashed ssn")]
    #[test_case("SSN 123456789 on file", PhiKind::Ssn ; "bare ssn")]
    #[test_case("Call (555) 123-4567", PhiKind::Phone ; "parenthesized phone")]
    #[test_case("Call 555-123-4567 today", PhiKind::Phone ; "dashed phone")]
    #[test_case("Contact: john.doe@example.com", PhiKind::Email ; "email")]
    #[test_case("MRN: AB123456", PhiKind::Mrn ; "mrn")]
    #[test_case("DOB: 01/15/1980", PhiKind::Dob ; "us date")]
    #[test_case("DOB 1980-01-15 noted", PhiKind::Dob ; "iso date")]
    #[test_case("Lives at 42 Maple Street", PhiKind::Address ; "address")]
    #[test_case("ZIP 90210 on record", PhiKind::Zip ; "zip")]
    #[test_case("Policy Number: ABC12345678", PhiKind::InsuranceId ; "insurance id")]
    fn test_detects_kind(text: &str, kind: PhiKind) {
        let detections = matcher().detect(text).unwrap();
        assert!(
            detections.iter().any(|d| d.kind == kind),
            "expected {kind} in {text}: got {detections:?}"
        );
    }

    #[test]
    fn test_empty_and_whitespace_yield_nothing() {
        assert!(matcher().detect("").unwrap().is_empty());
        assert!(matcher().detect("   \n\t  ").unwrap().is_empty());
    }

    #[test]
    fn test_clean_text_yields_nothing() {
        let detections = matcher()
            .detect("The quick brown fox jumps over the lazy dog.")
            .unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_offsets_and_confidence() {
        let text = "SSN: 123-45-6789, phone 555-0123";
        let detections = matcher().detect(text).unwrap();

        let ssn = detections.iter().find(|d| d.kind == PhiKind::Ssn).unwrap();
        assert_eq!(ssn.start, 5);
        assert_eq!(ssn.end, 16);
        assert_eq!(ssn.matched_text, "123-45-6789");
        assert!((ssn.confidence - 0.8).abs() < f32::EPSILON);

        let phone = detections.iter().find(|d| d.kind == PhiKind::Phone).unwrap();
        assert_eq!(phone.matched_text, "555-0123");
        assert_eq!(phone.start, 24);
        assert_eq!(phone.end, 32);
    }

    #[test]
    fn test_char_offsets_with_multibyte_text() {
        let text = "Namn: Åsa Öberg, SSN: 123-45-6789";
        let detections = matcher().detect(text).unwrap();
        let ssn = detections.iter().find(|d| d.kind == PhiKind::Ssn).unwrap();

        let chars: Vec<char> = text.chars().collect();
        let span: String = chars[ssn.start..ssn.end].iter().collect();
        assert_eq!(span, "123-45-6789");
    }

    #[test]
    fn test_overlapping_categories_both_reported() {
        // A bare 9-digit run is simultaneously SSN-shaped; the matcher
        // reports every category hit without deduplicating.
        let text = "id 123456789";
        let detections = matcher().detect(text).unwrap();
        assert!(detections.iter().any(|d| d.kind == PhiKind::Ssn));
    }

    #[test]
    fn test_detections_sorted_by_position() {
        let text = "ZIP 90210 then email a@b.com then SSN 123-45-6789";
        let detections = matcher().detect(text).unwrap();
        let starts: Vec<usize> = detections.iter().map(|d| d.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_detect_kind_filters() {
        let text = "SSN 123-45-6789 and zip 90210";
        let only_zip = matcher().detect_kind(text, &PhiKind::Zip).unwrap();
        assert!(!only_zip.is_empty());
        assert!(only_zip.iter().all(|d| d.kind == PhiKind::Zip));
    }
}
