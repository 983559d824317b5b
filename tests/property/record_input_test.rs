//! Property-based tests for record input normalization.
//!
//! Whatever a client submits, a normalized record has a rating inside the
//! configured scale, at most `max_tags` non-blank trimmed tags, no blank lines
//! in its comment, and an author.

use linkshelf::types::config::StoreConfig;
use linkshelf::types::record::{render_stars, RecordInput};
use proptest::prelude::*;

fn arb_rating() -> impl Strategy<Value = Option<f64>> {
    proptest::option::of(prop_oneof![
        -100.0f64..100.0,
        Just(0.0),
        Just(10.0),
        Just(f64::MAX),
        Just(f64::MIN),
    ])
}

fn arb_tags() -> impl Strategy<Value = String> {
    proptest::collection::vec("[ a-z]{0,8}", 0..12).prop_map(|tags| tags.join(","))
}

fn arb_comment() -> impl Strategy<Value = String> {
    proptest::collection::vec(prop_oneof!["[a-z ]{0,10}", Just("\n".to_string()), Just("\r\n".to_string())], 0..12)
        .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn normalized_rating_is_within_scale(rating in arb_rating()) {
        let config = StoreConfig::default();
        let input = RecordInput { rating, ..Default::default() };
        let normalized = input.normalize(&config).expect("finite ratings normalize");
        prop_assert!((0.0..=config.rating_scale).contains(&normalized.rating));
        if rating.is_none() {
            prop_assert_eq!(normalized.rating, config.default_rating);
        }
    }

    #[test]
    fn tags_are_trimmed_non_blank_and_capped(raw in arb_tags(), max_tags in 0usize..8) {
        let config = StoreConfig { max_tags, ..StoreConfig::default() };
        let input = RecordInput { tags: raw.clone(), ..Default::default() };
        let normalized = input.normalize(&config).unwrap();

        prop_assert!(normalized.tags.len() <= max_tags);
        for tag in &normalized.tags {
            prop_assert!(!tag.is_empty());
            prop_assert_eq!(tag.trim(), tag.as_str());
        }
        let expected: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .take(max_tags)
            .map(str::to_string)
            .collect();
        prop_assert_eq!(normalized.tags, expected);
    }

    #[test]
    fn comment_has_no_blank_line_runs(comment in arb_comment()) {
        let normalized = RecordInput { comment: comment.clone(), ..Default::default() }
            .normalize(&StoreConfig::default())
            .unwrap();
        prop_assert!(!normalized.comment.contains("\n\n"));
        prop_assert!(!normalized.comment.contains('\r'));
        let stripped: String = comment.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        let normalized_stripped: String = normalized.comment.chars().filter(|c| *c != '\n').collect();
        prop_assert_eq!(stripped, normalized_stripped);
    }

    #[test]
    fn blank_author_becomes_anonymous(author in proptest::option::of("[ ]{0,3}")) {
        let normalized = RecordInput { author, ..Default::default() }
            .normalize(&StoreConfig::default())
            .unwrap();
        prop_assert_eq!(normalized.author, "guest");
    }

    #[test]
    fn star_bar_always_spans_the_scale(rating in -5.0f64..20.0, scale in 1u32..12) {
        let bar = render_stars(rating, scale as f64);
        prop_assert_eq!(bar.chars().count(), scale as usize);
        prop_assert!(bar.chars().all(|c| c == '★' || c == '☆'));
    }
}

#[test]
fn non_finite_rating_is_rejected() {
    let config = StoreConfig::default();
    for rating in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let input = RecordInput {
            rating: Some(rating),
            ..Default::default()
        };
        assert!(input.normalize(&config).is_err());
    }
}
