//! Tests for `src/pager.rs`: line limits, character ceilings and unit folding.

use emulog::pager::{
    break_in_field_content, break_in_units, fold_into_units, PagerError, Segment, MAX_FIELDS,
    MAX_FIELD_LENGTH, MAX_FIELD_TITLE_LENGTH,
};

#[test]
fn splits_by_line_count() {
    let segments = break_in_field_content(["A", "B", "C"], 2).expect("limit is positive");
    assert_eq!(
        segments,
        vec![Segment::new("A-B", "A\nB"), Segment::new("C", "C")]
    );
}

#[test]
fn zero_limit_is_rejected() {
    let result = break_in_field_content(["A"], 0);
    assert!(matches!(result, Err(PagerError::InvalidLineLimit(0))));
    assert!(break_in_units(["A"], 0).is_err());
}

#[test]
fn empty_and_blank_input_yields_nothing() {
    let none: [&str; 0] = [];
    assert!(break_in_field_content(none, 5).expect("valid").is_empty());
    assert!(break_in_field_content(["", "   "], 1)
        .expect("valid")
        .is_empty());
}

#[test]
fn bodies_respect_the_character_ceiling() {
    let lines: Vec<String> = (0..30).map(|i| format!("{i:02}{}", "x".repeat(98))).collect();
    let segments = break_in_field_content(&lines, 20).expect("valid");

    assert!(segments.len() > 1);
    for segment in &segments {
        assert!(segment.body.chars().count() <= MAX_FIELD_LENGTH);
        assert!(segment.title.chars().count() <= MAX_FIELD_TITLE_LENGTH);
    }
    let rejoined: Vec<&str> = segments.iter().flat_map(|s| s.body.lines()).collect();
    assert_eq!(rejoined.len(), 30);
}

#[test]
fn over_long_line_gets_its_own_truncated_segment() {
    let long = "x".repeat(MAX_FIELD_LENGTH * 2);
    let segments =
        break_in_field_content(["before", long.as_str(), "after"], 10).expect("valid");

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].body, "before");
    assert_eq!(segments[1].body.chars().count(), MAX_FIELD_LENGTH);
    assert!(segments[1].body.ends_with('…'));
    assert_eq!(segments[2].body, "after");
}

#[test]
fn long_common_prefix_keeps_title_short() {
    let first = format!("{}a", "p".repeat(300));
    let last = format!("{}b", "p".repeat(300));
    let segments = break_in_field_content([first, last], 2).expect("valid");
    assert!(segments[0].title.chars().count() <= MAX_FIELD_TITLE_LENGTH);
}

#[test]
fn units_hold_at_most_max_fields() {
    let lines: Vec<String> = (0..=MAX_FIELDS).map(|i| format!("line {i}")).collect();
    let units = break_in_units(&lines, 1).expect("valid");

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].fields.len(), MAX_FIELDS);
    assert_eq!(units[1].fields.len(), 1);
}

#[test]
fn unit_titles_are_upper_cased() {
    let units = break_in_units(["apple", "banana"], 2).expect("valid");
    assert_eq!(units[0].fields[0].title, "A-B");
    assert_eq!(units[0].fields[0].body, "apple\nbanana");
}

#[test]
fn folding_nothing_gives_no_units() {
    assert!(fold_into_units(Vec::new()).is_empty());
}
