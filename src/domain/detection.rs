//! PHI detection data models

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kind of PHI identified in a text
///
/// The eight unit variants cover the pattern-matchable identifiers. Named
/// entities reported by an advanced NER backend (PERSON, LOCATION, ...) are
/// carried through as [`PhiKind::Entity`] with the backend's label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhiKind {
    /// Social Security Number
    Ssn,
    /// Telephone number
    Phone,
    /// Email address
    Email,
    /// Medical Record Number
    Mrn,
    /// Date of birth
    Dob,
    /// Street address
    Address,
    /// ZIP code
    Zip,
    /// Insurance or policy identifier
    InsuranceId,
    /// Named-entity label from an advanced detector
    Entity(String),
}

impl PhiKind {
    /// Stable string label used in logs, storage and the wire format.
    pub fn label(&self) -> &str {
        match self {
            Self::Ssn => "ssn",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Mrn => "mrn",
            Self::Dob => "dob",
            Self::Address => "address",
            Self::Zip => "zip",
            Self::InsuranceId => "insurance_id",
            Self::Entity(label) => label.as_str(),
        }
    }

    /// Whether this kind came from the regex pattern library.
    pub fn is_pattern_kind(&self) -> bool {
        !matches!(self, Self::Entity(_))
    }
}

impl fmt::Display for PhiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PhiKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "ssn" => Self::Ssn,
            "phone" => Self::Phone,
            "email" => Self::Email,
            "mrn" => Self::Mrn,
            "dob" => Self::Dob,
            "address" => Self::Address,
            "zip" => Self::Zip,
            "insurance_id" => Self::InsuranceId,
            other => Self::Entity(other.to_string()),
        })
    }
}

impl Serialize for PhiKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PhiKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PhiKind::from_str(&s).map_err(de::Error::custom)
    }
}

/// Detection method used to identify PHI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Regex pattern matching
    Pattern,
    /// Named Entity Recognition via the advanced detector
    Ner,
}

impl DetectionMethod {
    /// Stable label used in the store's detection_method column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Ner => "ner",
        }
    }
}

/// One identified PHI instance
///
/// Offsets are half-open character offsets into the source text,
/// `0 <= start < end <= text.chars().count()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Kind of PHI
    pub kind: PhiKind,
    /// Human-readable description of the kind
    pub description: String,
    /// Start offset (inclusive, characters)
    pub start: usize,
    /// End offset (exclusive, characters)
    pub end: usize,
    /// The matched text
    pub matched_text: String,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    /// How the detection was made
    pub method: DetectionMethod,
}

impl Detection {
    /// Create a new detection, clamping confidence into [0, 1].
    pub fn new(
        kind: PhiKind,
        description: impl Into<String>,
        start: usize,
        end: usize,
        matched_text: impl Into<String>,
        confidence: f32,
        method: DetectionMethod,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            start,
            end,
            matched_text: matched_text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            method,
        }
    }

    /// Length of the matched span in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span is empty (invalid for a real match).
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether this detection's span overlaps another's.
    pub fn overlaps(&self, other: &Detection) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Result of one PHI detection pass over a text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether any PHI was found
    pub phi_detected: bool,
    /// Distinct kinds found
    pub phi_types: BTreeSet<PhiKind>,
    /// All detections, in source-text order
    pub detections: Vec<Detection>,
    /// Text with all detections masked
    pub masked_text: String,
}

impl DetectionResult {
    /// Build a result from detections and the masked text, deriving
    /// `phi_detected` and `phi_types` so the flag/detections invariant
    /// cannot be violated by construction.
    pub fn new(mut detections: Vec<Detection>, masked_text: String) -> Self {
        // Source-text order, longest match first at equal start; overlap
        // deduplication downstream relies on this ordering.
        detections.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        let phi_types: BTreeSet<PhiKind> = detections.iter().map(|d| d.kind.clone()).collect();
        Self {
            phi_detected: !detections.is_empty(),
            phi_types,
            detections,
            masked_text,
        }
    }

    /// A clean result for text with no PHI: masked text equals the input.
    pub fn clean(text: &str) -> Self {
        Self {
            phi_detected: false,
            phi_types: BTreeSet::new(),
            detections: Vec::new(),
            masked_text: text.to_string(),
        }
    }

    /// Total number of detections.
    pub fn detection_count(&self) -> usize {
        self.detections.len()
    }

    /// Confidence statistics over all detections: (min, mean, max).
    ///
    /// Returns `None` when there are no detections.
    pub fn confidence_stats(&self) -> Option<(f32, f32, f32)> {
        if self.detections.is_empty() {
            return None;
        }
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut sum = 0.0f32;
        for d in &self.detections {
            min = min.min(d.confidence);
            max = max.max(d.confidence);
            sum += d.confidence;
        }
        Some((min, sum / self.detections.len() as f32, max))
    }
}

/// Redaction level controlling which PHI kinds get masked
///
/// Each level's kind set is a superset of the previous one:
/// comprehensive ⊇ standard ⊇ minimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedactionLevel {
    /// Direct identifiers only (SSN, MRN, insurance IDs)
    Minimal,
    /// Direct identifiers plus contact details, dates and named entities
    #[default]
    Standard,
    /// Everything, including quasi-identifiers such as ZIP codes
    Comprehensive,
}

impl RedactionLevel {
    /// Whether a detection of `kind` is redacted at this level.
    pub fn covers(&self, kind: &PhiKind) -> bool {
        match self {
            Self::Minimal => matches!(
                kind,
                PhiKind::Ssn | PhiKind::Mrn | PhiKind::InsuranceId
            ),
            Self::Standard => matches!(
                kind,
                PhiKind::Ssn
                    | PhiKind::Mrn
                    | PhiKind::InsuranceId
                    | PhiKind::Phone
                    | PhiKind::Email
                    | PhiKind::Dob
                    | PhiKind::Address
                    | PhiKind::Entity(_)
            ),
            Self::Comprehensive => true,
        }
    }

    /// Stable label used in configuration and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl FromStr for RedactionLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(format!(
                "Unknown redaction level '{other}'. Must be one of: minimal, standard, comprehensive"
            )),
        }
    }
}
