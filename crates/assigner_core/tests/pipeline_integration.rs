//! End-to-end checks of the fit / persist / predict cycle

use tempfile::TempDir;
use ticket_assigner_core::{
    normalize, AssignerError, ForestParams, Labels, Pipeline, PipelineConfig, PersistedModel,
    TrainingSummary, HASH_FILE_NAME, MODEL_FILE_NAME,
};

fn scenario_rows(repeats: usize) -> (Vec<String>, Vec<String>) {
    let alice = normalize(
        "Fix login bug",
        "Users cannot log in",
        &Labels::from(&["bug", "auth"][..]),
    );
    let bob = normalize(
        "Add dark mode",
        "UI theme request",
        &Labels::from(&["feature", "ui"][..]),
    );

    let mut docs = Vec::new();
    let mut labels = Vec::new();
    for _ in 0..repeats {
        docs.push(alice.clone());
        labels.push("alice".to_string());
        docs.push(bob.clone());
        labels.push("bob".to_string());
    }
    (docs, labels)
}

fn config(n_trees: usize, seed: u64) -> PipelineConfig {
    PipelineConfig {
        forest: ForestParams {
            n_trees,
            seed,
            ..ForestParams::default()
        },
        l2_normalize: true,
    }
}

fn trained(n_trees: usize, seed: u64) -> Pipeline {
    let (docs, labels) = scenario_rows(10);
    let mut pipeline = Pipeline::new(config(n_trees, seed));
    pipeline.fit(&docs, &labels).unwrap();
    pipeline
}

#[test]
fn test_training_beats_chance_on_held_out_rows() {
    let (docs, labels) = scenario_rows(10);
    let (train_docs, test_docs) = docs.split_at(16);
    let (train_labels, test_labels) = labels.split_at(16);

    let mut pipeline = Pipeline::new(config(25, 42));
    pipeline.fit(train_docs, train_labels).unwrap();

    let accuracy = pipeline.score(test_docs, test_labels).unwrap();
    assert!(accuracy > 0.5, "accuracy {accuracy} not above chance");
}

#[test]
fn test_login_ticket_goes_to_alice() {
    let pipeline = trained(25, 42);
    let text = normalize(
        "Fix login bug",
        "Users cannot log in",
        &Labels::from(&["bug", "auth"][..]),
    );
    assert_eq!(pipeline.predict(&text).unwrap(), "alice");
}

#[test]
fn test_scalar_labels_end_the_feature_text() {
    let text = normalize("", "", &Labels::Scalar("not-a-list".to_string()));
    assert!(text.ends_with("not-a-list"));

    let pipeline = trained(10, 42);
    assert!(pipeline.predict(&text).is_ok());
}

#[test]
fn test_empty_ticket_still_gets_an_assignee() {
    let pipeline = trained(25, 42);
    let text = normalize("", "", &Labels::default());
    assert_eq!(text, "  ");

    let assignee = pipeline.predict(&text).unwrap();
    assert!(pipeline.labels().iter().any(|l| l == assignee));
    assert_eq!(assignee, pipeline.predict("qzx unseen words").unwrap());
}

#[test]
fn test_empty_ticket_follows_the_all_zero_path_not_the_majority() {
    // An all-zero vector goes left at every split. When both words split the
    // root perfectly, the lower index ("login") wins and its zero side holds
    // bob's rows, so bob is predicted even though alice is the majority.
    let mut docs = Vec::new();
    let mut labels = Vec::new();
    for _ in 0..30 {
        docs.push(normalize("login", "", &Labels::default()));
        labels.push("alice");
    }
    for _ in 0..5 {
        docs.push(normalize("theme", "", &Labels::default()));
        labels.push("bob");
    }

    let mut pipeline = Pipeline::new(PipelineConfig {
        forest: ForestParams {
            n_trees: 25,
            max_features: Some(2),
            ..ForestParams::default()
        },
        l2_normalize: true,
    });
    pipeline.fit(&docs, &labels).unwrap();

    let empty = normalize("", "", &Labels::default());
    assert_eq!(pipeline.predict(&empty).unwrap(), "bob");

    let fractions = pipeline.vote_fractions(&empty).unwrap();
    assert_eq!(fractions[1].0, "bob");
    assert!(fractions[1].1 > 0.5);
}

#[test]
fn test_sparse_corpus_of_thousands_trains_quickly() {
    let docs: Vec<String> = (0..3000)
        .map(|i| format!("shared w{i} x{}", i / 2))
        .collect();
    let labels: Vec<String> = (0..3000).map(|i| format!("user{}", i % 3)).collect();

    let started = std::time::Instant::now();
    let mut pipeline = Pipeline::new(config(8, 42));
    pipeline.fit(&docs, &labels).unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed.as_secs() < 120, "fit took {elapsed:?}");
    assert_eq!(pipeline.tree_count(), 8);
    assert_eq!(pipeline.vocabulary_size(), 1 + 3000 + 1500);
    assert!(pipeline.predict(&docs[1234]).is_ok());
}

#[test]
fn test_single_row_corpus_is_insufficient() {
    let mut pipeline = Pipeline::default();
    let err = pipeline
        .fit(&["Fix login bug Users cannot log in bug auth"], &["alice"])
        .unwrap_err();
    assert!(matches!(err, AssignerError::InsufficientData(_)));
    assert!(!pipeline.is_fitted());
}

#[test]
fn test_training_is_deterministic() {
    let a = trained(20, 7).to_artifact(TrainingSummary::default()).unwrap();
    let b = trained(20, 7).to_artifact(TrainingSummary::default()).unwrap();

    assert_eq!(a.vectorizer, b.vectorizer);
    assert_eq!(a.forest, b.forest);
    assert_eq!(a.metadata.model_hash, b.metadata.model_hash);
    assert_eq!(a.to_canonical_json().unwrap(), b.to_canonical_json().unwrap());
}

#[test]
fn test_parallel_and_sequential_training_agree() {
    let (docs, labels) = scenario_rows(6);
    let mut parallel = Pipeline::new(config(12, 3));
    parallel.fit(&docs, &labels).unwrap();

    let mut sequential_config = config(12, 3);
    sequential_config.forest.parallel = false;
    let mut sequential = Pipeline::new(sequential_config);
    sequential.fit(&docs, &labels).unwrap();

    let a = parallel.to_artifact(TrainingSummary::default()).unwrap();
    let b = sequential.to_artifact(TrainingSummary::default()).unwrap();
    assert_eq!(a.metadata.model_hash, b.metadata.model_hash);
}

#[test]
fn test_save_then_load_predicts_identically() {
    let pipeline = trained(30, 42);
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join(MODEL_FILE_NAME);
    let hash_path = dir.path().join(HASH_FILE_NAME);

    let artifact = pipeline
        .to_artifact(TrainingSummary {
            trained_at: 1_700_000_000,
            training_samples: 20,
            test_samples: 0,
            accuracy: Some(1.0),
        })
        .unwrap();
    artifact.save_json(&model_path).unwrap();
    artifact.write_hash_file(&hash_path).unwrap();

    let loaded = PersistedModel::load_json(&model_path).unwrap();
    loaded.verify_hash_file(&hash_path).unwrap();
    assert_eq!(loaded.metadata.accuracy, Some(1.0));

    let restored = Pipeline::load(&model_path).unwrap();
    let queries = [
        "Fix login bug Users cannot log in bug auth",
        "Add dark mode UI theme request feature ui",
        "login theme",
        "completely unrelated words",
        "",
    ];
    for text in queries {
        assert_eq!(pipeline.predict(text).unwrap(), restored.predict(text).unwrap());
    }
    assert_eq!(restored.labels(), pipeline.labels());
    assert_eq!(restored.vocabulary_size(), pipeline.vocabulary_size());
}

#[test]
fn test_corrupted_artifact_fails_to_load() {
    let pipeline = trained(5, 42);
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join(MODEL_FILE_NAME);

    let mut artifact = pipeline.to_artifact(TrainingSummary::default()).unwrap();
    artifact.forest.trees[0].nodes[0].threshold += 1.0;
    artifact.save_json(&model_path).unwrap();

    assert!(matches!(
        Pipeline::load(&model_path),
        Err(AssignerError::HashMismatch { .. })
    ));
}

#[test]
fn test_predict_is_idempotent() {
    let pipeline = trained(15, 42);
    let first = pipeline.predict("login dark").unwrap().to_string();
    for _ in 0..10 {
        assert_eq!(pipeline.predict("login dark").unwrap(), first);
    }
}

#[test]
fn test_vote_fractions_cover_all_labels() {
    let pipeline = trained(20, 42);
    let fractions = pipeline
        .vote_fractions("Fix login bug Users cannot log in bug auth")
        .unwrap();

    assert_eq!(fractions.len(), 2);
    assert_eq!(fractions[0].0, "alice");
    assert_eq!(fractions[0].1, 1.0);
    let total: f64 = fractions.iter().map(|(_, f)| f).sum();
    assert!((total - 1.0).abs() < 1e-12);
}
