//! Integration tests for PHI detection with synthetic member records

use harbor::config::PhiConfig;
use harbor::domain::detection::{PhiKind, RedactionLevel};
use harbor::phi::PhiDetector;
use std::collections::HashMap;

fn synthetic_intake_note() -> &'static str {
    "INTAKE NOTE\n\
     Member called regarding claim status. SSN on file: 123-45-6789.\n\
     Callback number (555) 123-4567, alternate 555-867-5309.\n\
     Email on record: j.smith@example.com. DOB 03/14/1962.\n\
     Mailing address 1427 Birch Lane, ZIP 60614-2210.\n\
     MRN: HX4478210. Policy Number: BCB88214377.\n"
}

#[tokio::test]
async fn detects_every_identifier_kind_in_intake_note() {
    let detector = PhiDetector::new(&PhiConfig::default()).await.unwrap();
    let result = detector.detect(synthetic_intake_note()).await.unwrap();

    assert!(result.phi_detected);
    for kind in [
        PhiKind::Ssn,
        PhiKind::Phone,
        PhiKind::Email,
        PhiKind::Dob,
        PhiKind::Address,
        PhiKind::Zip,
        PhiKind::Mrn,
        PhiKind::InsuranceId,
    ] {
        assert!(
            result.phi_types.contains(&kind),
            "missing {kind} in {:?}",
            result.phi_types
        );
    }

    // Pattern hits carry the fixed confidence.
    assert!(result
        .detections
        .iter()
        .all(|d| (d.confidence - 0.8).abs() < f32::EPSILON));
}

#[tokio::test]
async fn ssn_and_phone_scenario_offsets_and_masking() {
    let detector = PhiDetector::new(&PhiConfig::default()).await.unwrap();
    let text = "SSN: 123-45-6789, phone 555-0123";
    let result = detector.detect(text).await.unwrap();

    let ssn = result
        .detections
        .iter()
        .find(|d| d.kind == PhiKind::Ssn)
        .expect("ssn detected");
    assert_eq!((ssn.start, ssn.end), (5, 16));
    assert!((ssn.confidence - 0.8).abs() < f32::EPSILON);

    let phone = result
        .detections
        .iter()
        .find(|d| d.kind == PhiKind::Phone)
        .expect("phone detected");
    assert_eq!(phone.matched_text, "555-0123");

    // Both spans replaced by mask characters of matching length.
    assert_eq!(result.masked_text, "SSN: ***********, phone ********");
    assert_eq!(
        result.masked_text.chars().count(),
        text.chars().count()
    );
}

#[tokio::test]
async fn empty_and_whitespace_text() {
    let detector = PhiDetector::new(&PhiConfig::default()).await.unwrap();

    for text in ["", "   ", "\n\t\n"] {
        let result = detector.detect(text).await.unwrap();
        assert!(!result.phi_detected);
        assert!(result.detections.is_empty());
        assert_eq!(result.masked_text, text);
    }
}

#[tokio::test]
async fn flag_always_matches_detections() {
    let detector = PhiDetector::new(&PhiConfig::default()).await.unwrap();

    let samples = [
        "no identifiers at all",
        "SSN 123-45-6789",
        "totally 555-123-4567 mixed a@b.co content",
        "Lorem ipsum dolor sit amet",
        synthetic_intake_note(),
    ];

    for text in samples {
        let result = detector.detect(text).await.unwrap();
        assert_eq!(
            result.phi_detected,
            !result.detections.is_empty(),
            "flag/detections mismatch for: {text}"
        );
    }
}

#[tokio::test]
async fn batch_detection_processes_all_fields() {
    let detector = PhiDetector::new(&PhiConfig::default()).await.unwrap();

    let mut record: HashMap<String, String> = HashMap::new();
    record.insert("name_note".into(), "member prefers phone contact".into());
    record.insert("ssn".into(), "123-45-6789".into());
    record.insert("phone".into(), "(555) 123-4567".into());
    record.insert("memo".into(), "claim approved".into());

    let results = detector.detect_batch(&record).await.unwrap();
    assert_eq!(results.len(), 4);
    assert!(results["ssn"].phi_detected);
    assert!(results["phone"].phi_detected);
    assert!(!results["memo"].phi_detected);
    assert!(!results["name_note"].phi_detected);
}

#[tokio::test]
async fn redaction_levels_nest() {
    let detector = PhiDetector::new(&PhiConfig::default()).await.unwrap();
    let text = synthetic_intake_note();
    let analysis = detector.detect(text).await.unwrap();

    let minimal = detector.redact_at(text, &analysis, RedactionLevel::Minimal);
    let standard = detector.redact_at(text, &analysis, RedactionLevel::Standard);
    let comprehensive = detector.redact_at(text, &analysis, RedactionLevel::Comprehensive);

    // Minimal scrubs the direct identifiers only.
    assert!(!minimal.contains("123-45-6789"));
    assert!(minimal.contains("j.smith@example.com"));

    // Standard adds contact details and dates.
    assert!(!standard.contains("j.smith@example.com"));
    assert!(!standard.contains("(555) 123-4567"));
    assert!(!standard.contains("03/14/1962"));
    assert!(standard.contains("60614-2210"));

    // Comprehensive scrubs quasi-identifiers too.
    assert!(!comprehensive.contains("60614-2210"));

    // Each level masks at least as much as the one below.
    let count_stars =
        |s: &str| s.chars().filter(|&c| c == '*').count();
    assert!(count_stars(&standard) >= count_stars(&minimal));
    assert!(count_stars(&comprehensive) >= count_stars(&standard));
}

#[tokio::test]
async fn generated_emails_are_always_detected() {
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;

    let detector = PhiDetector::new(&PhiConfig::default()).await.unwrap();

    for _ in 0..20 {
        let email: String = SafeEmail().fake();
        let text = format!("reach the member at {email} for follow-up");
        let result = detector.detect(&text).await.unwrap();
        assert!(
            result.phi_types.contains(&PhiKind::Email),
            "missed generated email {email}"
        );
        assert!(!result.masked_text.contains(&email));
    }
}

#[tokio::test]
async fn duplicate_span_categories_do_not_corrupt_masking() {
    // A bare 9-digit run is both SSN-shaped and (with its neighbors)
    // potentially ZIP-shaped; masking must still produce one clean mask.
    let detector = PhiDetector::new(&PhiConfig::default()).await.unwrap();
    let text = "id 123456789 end";
    let result = detector.detect(text).await.unwrap();

    assert!(result.phi_detected);
    assert_eq!(result.masked_text, "id ********* end");
}
