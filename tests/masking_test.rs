//! Integration tests for the span-masking engine

use harbor::phi::masking::{apply_masks, mask_all, MaskSpan};
use harbor::phi::PatternMatcher;

#[test]
fn masking_then_redetecting_finds_nothing() {
    // Mask idempotence: re-detecting over the masked output yields zero
    // new detections of the same kinds inside the masked ranges.
    let matcher = PatternMatcher::new().unwrap();
    let text = "Member 123-45-6789, call (555) 123-4567 or write to member@plan.org. \
                Address: 12 Oak Avenue, ZIP 90210. Policy Number: QX12345678.";

    let detections = matcher.detect(text).unwrap();
    assert!(!detections.is_empty());

    let masked = mask_all(text, &detections, '*');
    let residual = matcher.detect(&masked).unwrap();
    assert!(
        residual.is_empty(),
        "masked output still detectable: {residual:?}"
    );

    // Masking an already-masked text changes nothing.
    let residual_detections = matcher.detect(&masked).unwrap();
    assert_eq!(mask_all(&masked, &residual_detections, '*'), masked);
}

#[test]
fn unmasked_characters_keep_relative_order() {
    // Offset-safety with replacements of assorted lengths.
    let text = "alpha BRAVO charlie DELTA echo";
    let spans = vec![
        MaskSpan::new(6, 11, "[1]"),
        MaskSpan::new(20, 25, "[REPLACEMENT-MUCH-LONGER]"),
    ];

    let masked = apply_masks(text, &spans);
    assert_eq!(masked, "alpha [1] charlie [REPLACEMENT-MUCH-LONGER] echo");

    // Strip replacements: the untouched words survive in order.
    let rest: Vec<&str> = masked
        .split_whitespace()
        .filter(|w| !w.starts_with('['))
        .collect();
    assert_eq!(rest, vec!["alpha", "charlie", "echo"]);
}

#[test]
fn invalid_spans_leave_valid_ones_applied() {
    let text = "0123456789";
    let spans = vec![
        MaskSpan::new(3, 3, "X"),
        MaskSpan::new(8, 4, "X"),
        MaskSpan::new(2, 999, "X"),
        MaskSpan::new(4, 6, "##"),
    ];

    // No panic, no partial application of the bad spans.
    assert_eq!(apply_masks(text, &spans), "0123##6789");
}

#[test]
fn empty_span_list_is_identity() {
    let text = "nothing to hide";
    assert_eq!(apply_masks(text, &[]), text);
}

#[test]
fn many_spans_on_large_text() {
    // ~1MB of text, thousands of spans: must complete and stay correct.
    let line = "patient record line with some padding text\n";
    let big: String = line.repeat(25_000);
    let line_chars = line.chars().count();

    let spans: Vec<MaskSpan> = (0..25_000)
        .map(|i| MaskSpan::new(i * line_chars, i * line_chars + 7, "#######"))
        .collect();

    let masked = apply_masks(&big, &spans);
    assert_eq!(masked.chars().count(), big.chars().count());
    assert!(masked.starts_with("####### record line"));
    assert!(!masked.contains("patient"));
}

#[test]
fn overlapping_spans_are_deterministic_across_runs() {
    let text = "abcdefghijklmnop";
    let spans = vec![
        MaskSpan::new(2, 9, "<SEVEN>"),
        MaskSpan::new(5, 12, "{7CHRS}"),
        MaskSpan::new(0, 4, "(4)"),
    ];

    let first = apply_masks(text, &spans);
    for _ in 0..10 {
        assert_eq!(apply_masks(text, &spans), first);
    }
}
