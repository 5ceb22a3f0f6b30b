//! Field resolution and record assembly properties
use course_harvest_lib::domain::course::{Column, Field, NOT_AVAILABLE};
use course_harvest_lib::infrastructure::parsing::config::DetailSelectors;
use course_harvest_lib::infrastructure::parsing::field_specs::{parse_rating, CompiledPhrases};
use course_harvest_lib::infrastructure::parsing::text::clean_text;
use course_harvest_lib::infrastructure::parsing::{resolve, Document, FieldSpec, PhraseConfig, Probe, RecordAssembler};
use proptest::prelude::*;
use rstest::rstest;

fn assembler() -> RecordAssembler {
    RecordAssembler::from_config(&DetailSelectors::default(), &PhraseConfig::default(), "Coursera", 5000).unwrap()
}

fn fixed(value: Option<String>) -> Probe {
    Probe::custom(move |_doc: &Document| value.clone())
}

/// A spec whose strategies return the given raw values in order
fn scripted_spec(values: &[Option<String>]) -> FieldSpec {
    values
        .iter()
        .enumerate()
        .fold(FieldSpec::new(Field::Title, NOT_AVAILABLE), |spec, (i, value)| {
            spec.strategy(format!("s{i}"), fixed(value.clone()))
        })
}

fn empty_document() -> Document {
    Document::parse("<html><body></body></html>")
}

#[rstest]
#[case("4.8", Some(4.8))]
#[case("4.8 out of 5", Some(4.8))]
#[case("Rated 4.6 (12,345 reviews)", Some(4.6))]
#[case("4 stars", Some(4.0))]
#[case("4 weeks", None)]
#[case("Approx. 12 hours to complete", None)]
#[case("Beginner level", None)]
#[case("12,345 reviews", None)]
#[case("7.5", None)]
fn rating_text_is_disambiguated(#[case] raw: &str, #[case] expected: Option<f64>) {
    assert_eq!(parse_rating(raw), expected);
}

#[rstest]
#[case(
    "Learn SQL from scratch. Develop job-relevant skills with hands-on projects.",
    Some("Learn SQL from scratch.")
)]
#[case("Offered by Stanford University. Covers regression and classification.", Some("Covers regression and classification."))]
#[case("Gain a foundational understanding of a subject.", None)]
#[case("Learner since 2019. Coursera allows me to learn without limits.", None)]
fn description_drops_boilerplate_sentences(#[case] text: &str, #[case] expected: Option<&str>) {
    let phrases = CompiledPhrases::compile(&PhraseConfig::default()).unwrap();
    assert_eq!(phrases.filter_description(text).as_deref(), expected);
}

#[test]
fn longest_description_wins_despite_marketing() {
    let html = r#"<html><head>
        <meta name="description" content="Short blurb about data.">
        </head><body>
        <h2>About this Course</h2>
        <p>Build your subject-matter expertise. This course teaches relational modelling, joins, window functions and query tuning on real datasets.</p>
        </body></html>"#;
    let record = assembler().assemble("https://www.coursera.org/learn/sql", html).record;
    assert!(record.description.contains("window functions"), "got {:?}", record.description);
    assert!(!record.description.contains("subject-matter expertise"));
}

#[test]
fn equal_scores_prefer_earliest_strategy() {
    let spec = scripted_spec(&[None, Some("second".into()), Some("third".into())]).best_score(|_| 7);
    let resolution = resolve(&spec, &empty_document());
    assert_eq!(resolution.value, "second");
    assert_eq!(resolution.winner.as_deref(), Some("s1"));
}

#[test]
fn embedded_metadata_fills_missing_fields() {
    let html = r#"<html><head><script type="application/ld+json">
        {"@context":"https://schema.org","@type":"Course","name":"Machine Learning",
         "description":"Supervised learning, unsupervised learning and best practices.",
         "provider":{"@type":"Organization","name":"Stanford University"},
         "aggregateRating":{"ratingValue":"4.9"}}
        </script></head><body></body></html>"#;
    let assembled = assembler().assemble("https://www.coursera.org/learn/machine-learning", html);
    assert_eq!(assembled.record.title, "Machine Learning");
    assert_eq!(assembled.record.provider, "Stanford University");
    assert_eq!(assembled.record.rating, Some(4.9));
    assert!(assembled.record.description.starts_with("Supervised learning"));
}

#[test]
fn duration_never_mistakes_level_for_length() {
    let html = r#"<html><body>
        <div data-e2e="key-information"><div>Beginner level</div><div>Flexible schedule</div></div>
        <p>Approx. 3 weeks at 10 hrs a week</p>
        </body></html>"#;
    let record = assembler().assemble("https://www.coursera.org/learn/x", html).record;
    assert_eq!(record.duration, "3 weeks");
    assert_ne!(record.rating, Some(3.0));
}

fn raw_value() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("   \n\t".to_string())),
        "[a-zA-Z0-9 ]{1,24}".prop_map(Some),
    ]
}

proptest! {
    #[test]
    fn resolved_value_is_never_empty(values in prop::collection::vec(raw_value(), 0..6)) {
        let resolution = resolve(&scripted_spec(&values), &empty_document());
        prop_assert!(!resolution.value.trim().is_empty());
        prop_assert_eq!(resolution.candidates.len(), values.len());

        let any_valid = values.iter().flatten().any(|v| !v.trim().is_empty());
        prop_assert_eq!(resolution.is_sentinel(), !any_valid);
        if !any_valid {
            prop_assert_eq!(resolution.value.as_str(), NOT_AVAILABLE);
            prop_assert!(resolution.winner.is_none());
        }
    }

    #[test]
    fn valid_primary_always_wins(primary in "[a-zA-Z][a-zA-Z0-9 ]{0,20}", rest in prop::collection::vec(raw_value(), 0..4)) {
        let mut values = vec![Some(primary.clone())];
        values.extend(rest);
        let resolution = resolve(&scripted_spec(&values), &empty_document());
        prop_assert_eq!(resolution.value, clean_text(&primary));
        prop_assert_eq!(resolution.winner.as_deref(), Some("s0"));
    }

    #[test]
    fn best_score_selection_is_deterministic(values in prop::collection::vec(raw_value(), 1..6)) {
        let score = |text: &str| text.chars().count() as i64;
        let document = empty_document();
        let first = resolve(&scripted_spec(&values).best_score(score), &document);
        let second = resolve(&scripted_spec(&values).best_score(score), &document);
        prop_assert_eq!(&first.value, &second.value);
        prop_assert_eq!(&first.winner, &second.winner);

        let best = first.candidates.iter().filter_map(|c| c.score).max();
        prop_assert_eq!(first.winning_candidate().and_then(|c| c.score), best);
    }

    #[test]
    fn every_page_yields_a_complete_row(body in "[a-zA-Z0-9 .,:<>/=\"-]{0,300}") {
        let html = format!("<html><body>{body}</body></html>");
        let assembled = assembler().assemble("https://www.coursera.org/learn/any", &html);
        let row = assembled.record.row();
        prop_assert_eq!(row.len(), Column::ORDER.len());
        prop_assert!(row.iter().all(|cell| !cell.trim().is_empty()));
        if let Some(rating) = assembled.record.rating {
            prop_assert!((0.0..=5.0).contains(&rating));
        }
    }
}
