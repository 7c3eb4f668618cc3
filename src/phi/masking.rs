//! Span-masking engine
//!
//! Replaces (start, end) character spans of a text with replacement
//! strings. Spans are applied back-to-front so that a replacement of a
//! different length never invalidates the offsets of spans not yet
//! applied; applying in ascending order would corrupt every offset after
//! the first length-changing replacement.

use crate::domain::detection::{Detection, DetectionResult, PhiKind, RedactionLevel};

/// One replacement to apply: half-open character span plus its substitute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSpan {
    /// Start offset (inclusive, characters)
    pub start: usize,
    /// End offset (exclusive, characters)
    pub end: usize,
    /// Replacement text (any length)
    pub replacement: String,
}

impl MaskSpan {
    /// Create a new mask span
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }
}

/// Spans applied per progress-log step when masking large inputs.
const MASK_BATCH_SIZE: usize = 256;

/// Apply replacement spans to a text
///
/// The text is materialized once into an indexable char buffer; spans are
/// stable-sorted by start descending and spliced back-to-front in batches
/// of [`MASK_BATCH_SIZE`]. Invalid spans (`start >= end` or
/// `end > text.chars().count()`) are skipped with a warning and the rest
/// of the result is unaffected.
///
/// Overlapping spans are legal input: given the same span order, the
/// output is deterministic (the stable descending sort applies the
/// later-starting span first and the earlier span then overwrites the
/// overlap region).
pub fn apply_masks(text: &str, spans: &[MaskSpan]) -> String {
    if spans.is_empty() {
        return text.to_string();
    }

    let mut buffer: Vec<char> = text.chars().collect();
    let len = buffer.len();

    let mut ordered: Vec<&MaskSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if span.start >= span.end || span.end > len {
            tracing::warn!(
                start = span.start,
                end = span.end,
                text_len = len,
                "Skipping invalid mask span"
            );
            continue;
        }
        ordered.push(span);
    }

    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    let total = ordered.len();
    for (batch_idx, batch) in ordered.chunks(MASK_BATCH_SIZE).enumerate() {
        for span in batch {
            // An overlapping span applied earlier may have shrunk the
            // buffer under this span's end; clamp instead of panicking so
            // overlap handling stays deterministic.
            let end = span.end.min(buffer.len());
            if span.start >= end {
                continue;
            }
            let replacement: Vec<char> = span.replacement.chars().collect();
            buffer.splice(span.start..end, replacement);
        }
        if total > MASK_BATCH_SIZE {
            tracing::debug!(
                applied = (batch_idx * MASK_BATCH_SIZE + batch.len()).min(total),
                total = total,
                "Masking progress"
            );
        }
    }

    buffer.into_iter().collect()
}

/// Drop overlapping detections deterministically
///
/// Input must be sorted by (start asc, end desc), which is how both the
/// matcher and [`DetectionResult`] order detections. At equal start the
/// longest match wins; across different starts the leftmost already-kept
/// span wins. The survivors never overlap, so the masking engine receives
/// disjoint spans.
pub fn dedupe_overlaps(detections: &[Detection]) -> Vec<&Detection> {
    let mut kept: Vec<&Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        if detection.is_empty() {
            continue;
        }
        match kept.last() {
            Some(last) if detection.overlaps(last) => {}
            _ => kept.push(detection),
        }
    }
    kept
}

/// Replacement text for one detection
///
/// Pattern detections keep the original length, replaced with the mask
/// character; NER detections get a semantic placeholder carrying the
/// entity label, which may change the text length.
fn replacement_for(detection: &Detection, mask_char: char) -> String {
    match &detection.kind {
        PhiKind::Entity(label) => format!("[{}]", label.to_uppercase()),
        _ => mask_char.to_string().repeat(detection.len()),
    }
}

/// Mask every detection in a text
///
/// Used to build [`DetectionResult::masked_text`]: all detections are
/// masked regardless of redaction level. Overlaps are deduplicated first.
pub fn mask_all(text: &str, detections: &[Detection], mask_char: char) -> String {
    let spans: Vec<MaskSpan> = dedupe_overlaps(detections)
        .into_iter()
        .map(|d| MaskSpan::new(d.start, d.end, replacement_for(d, mask_char)))
        .collect();
    apply_masks(text, &spans)
}

/// Redact a text at the given redaction level
///
/// Only detections whose kind the level covers are masked; everything
/// else is left intact.
pub fn redact_phi(
    text: &str,
    analysis: &DetectionResult,
    level: RedactionLevel,
    mask_char: char,
) -> String {
    let covered: Vec<Detection> = analysis
        .detections
        .iter()
        .filter(|d| level.covers(&d.kind))
        .cloned()
        .collect();

    mask_all(text, &covered, mask_char)
}
