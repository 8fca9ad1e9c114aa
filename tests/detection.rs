//! 字幕检测集成测试
//!
//! 覆盖各站点来源的优先级、可见性过滤和重复检测

use subtrans::detection::CheckResult;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{detector, document, Fixtures};

fn detected(result: CheckResult) -> subtrans::Detection {
    match result {
        CheckResult::Detected(detection) => detection,
        other => panic!("expected a detection, got {:?}", other),
    }
}

#[test]
fn test_youtube_page() {
    let root = document(&Fixtures::youtube("We need to talk"));
    let detection = detected(detector().check(&root));

    assert_eq!(detection.source, "youtube");
    assert_eq!(detection.text, "We need to talk");
}

#[test]
fn test_dailymotion_picks_first_wide_candidate() {
    let root = document(&Fixtures::dailymotion("C'est la vie"));
    let detection = detected(detector().check(&root));

    assert_eq!(detection.source, "dailymotion");
    assert_eq!(detection.text, "C'est la vie");
    assert_eq!(detection.elements.len(), 1);
}

#[test]
fn test_netflix_joins_lines() {
    let root = document(&Fixtures::netflix(&["Where were you", "last night?"]));
    let detection = detected(detector().check(&root));

    assert_eq!(detection.source, "netflix");
    assert_eq!(detection.text, "Where were you last night?");
    assert_eq!(detection.elements.len(), 2);
}

#[test]
fn test_generic_fallback() {
    let root = document(&Fixtures::generic("Somewhere else"));
    let detection = detected(detector().check(&root));

    assert_eq!(detection.source, "generic");
    assert_eq!(detection.text, "Somewhere else");
}

#[test]
fn test_page_without_subtitles() {
    let root = document(&Fixtures::empty());
    assert!(matches!(detector().check(&root), CheckResult::NoSubtitle));
}

#[test]
fn test_repeated_subtitle_is_duplicate() {
    let mut detector = detector();

    let first = document(&Fixtures::youtube("Good evening"));
    detected(detector.check(&first));

    // 大小写和首尾空白不同的同一行
    let again = document(&Fixtures::youtube("  good EVENING  "));
    assert!(matches!(detector.check(&again), CheckResult::Duplicate(_)));

    let next = document(&Fixtures::youtube("Good night"));
    assert_eq!(detected(detector.check(&next)).text, "Good night");
    assert_eq!(detector.last_seen(), "Good night");
}

#[test]
fn test_single_character_is_ignored() {
    let root = document(&Fixtures::youtube("a"));
    assert!(matches!(detector().check(&root), CheckResult::NoSubtitle));
}
