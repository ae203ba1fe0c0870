use once_cell::sync::Lazy;
use proptest::prelude::*;
use ticket_assigner_core::{ForestParams, Pipeline, PipelineConfig, VectorModel};

const CORPUS: &[(&str, &str)] = &[
    ("fix login bug users cannot log in bug auth", "alice"),
    ("session expired auth token refresh", "alice"),
    ("add dark mode ui theme request feature ui", "bob"),
    ("button colors ui layout", "bob"),
    ("slow query database timeout perf", "carol"),
    ("index missing on orders table db", "carol"),
];

static VECTORIZER: Lazy<VectorModel> = Lazy::new(|| {
    let docs: Vec<&str> = CORPUS.iter().map(|(doc, _)| *doc).collect();
    VectorModel::fit(&docs, true).unwrap()
});

static PIPELINE: Lazy<Pipeline> = Lazy::new(|| {
    let docs: Vec<&str> = CORPUS.iter().map(|(doc, _)| *doc).collect();
    let labels: Vec<&str> = CORPUS.iter().map(|(_, label)| *label).collect();
    let mut pipeline = Pipeline::new(PipelineConfig {
        forest: ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        },
        l2_normalize: true,
    });
    pipeline.fit(&docs, &labels).unwrap();
    pipeline
});

fn vocabulary_words() -> impl Strategy<Value = Vec<String>> {
    let words: Vec<String> = VECTORIZER.vocabulary.keys().cloned().collect();
    prop::collection::vec(prop::sample::select(words), 0..8)
}

/// Tokens that can never be in the vocabulary (it has no `qx` words)
fn unknown_words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("qx[0-9]{1,4}", 1..6)
}

proptest! {
    #[test]
    fn transform_has_unit_norm_or_is_zero(text in ".{0,60}") {
        let v = VECTORIZER.transform(&text);
        prop_assert_eq!(v.len(), VECTORIZER.vocabulary_size());

        if v.nnz() == 0 {
            prop_assert_eq!(v.norm(), 0.0);
        } else {
            prop_assert!((v.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn known_words_give_unit_vectors(words in vocabulary_words()) {
        let v = VECTORIZER.transform(&words.join(" "));
        if words.is_empty() {
            prop_assert_eq!(v.nnz(), 0);
        } else {
            prop_assert!(v.nnz() > 0);
            prop_assert!((v.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn unknown_tokens_contribute_nothing(
        words in vocabulary_words(),
        noise in unknown_words(),
    ) {
        let clean = words.join(" ");
        let noisy = format!("{} {}", clean, noise.join(" "));

        prop_assert_eq!(VECTORIZER.transform(&clean), VECTORIZER.transform(&noisy));
        prop_assert_eq!(PIPELINE.predict(&clean).unwrap(), PIPELINE.predict(&noisy).unwrap());
    }

    #[test]
    fn prediction_is_total_and_repeatable(text in ".{0,80}") {
        let first = PIPELINE.predict(&text).unwrap();
        prop_assert!(PIPELINE.labels().iter().any(|l| l == first));
        prop_assert_eq!(first, PIPELINE.predict(&text).unwrap());
    }
}
