use super::*;
use std::sync::Arc;

use tempfile::TempDir;

use crate::challenge::{CandidateIndex, Candidates};
use crate::embedding::{EmbeddingScorer, MockModelLoader, MockSimilarityModel, ModelRegistry};
use crate::scoring::GateConfig;
use crate::storage::{Attempt, AttemptStore, LabelSource, NewAttempt, Partition};

fn create_test_store() -> (AttemptStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = AttemptStore::open(dir.path()).unwrap();
    (store, dir)
}

fn idx(i: u8) -> CandidateIndex {
    CandidateIndex::new(i).unwrap()
}

fn candidates(seed: u8) -> Candidates {
    Candidates::from_bytes((0..4u8).map(|i| vec![seed, i])).unwrap()
}

fn record_failure(store: &AttemptStore, question: &str, seed: u8) -> Attempt {
    store
        .append(&NewAttempt::new(question, candidates(seed), Some(idx(1)), false))
        .unwrap()
}

fn record_success(store: &AttemptStore, question: &str, chosen: u8, seed: u8) -> Attempt {
    store
        .append(&NewAttempt::new(question, candidates(seed), Some(idx(chosen)), true))
        .unwrap()
}

fn labeler(loader: MockModelLoader) -> ImmediateLabeler {
    let scorer = EmbeddingScorer::new(Arc::new(ModelRegistry::new(loader)));
    ImmediateLabeler::new(scorer, GateConfig::default())
}

fn mock_labeler() -> ImmediateLabeler {
    labeler(MockModelLoader::new(
        MockSimilarityModel::new()
            .with_scores("cherry", [0.04, 0.06, 0.70, 0.20])
            .with_scores("apple", [0.30, 0.28, 0.22, 0.20]),
    ))
}

mod retroactive_tests {
    use super::*;

    #[test]
    fn test_success_labels_matching_failures() {
        let (store, _dir) = create_test_store();
        let f1 = record_failure(&store, "Cherry", 1);
        let f2 = record_failure(&store, "  cherry ", 2);
        let other = record_failure(&store, "Apple", 3);

        let success = record_success(&store, "CHERRY", 2, 4);
        assert_eq!(propagate_success(&store, &success).unwrap(), 2);

        for id in [&f1.id, &f2.id] {
            let labeled = store.load(id).unwrap();
            assert_eq!(labeled.correct_answer, Some(idx(2)));
            assert_eq!(labeled.label_source, Some(LabelSource::RetroactiveFromSuccess));
            assert!(labeled.auto_labeled);
        }
        assert!(!store.load(&other.id).unwrap().is_labeled());

        let stats = store.load_stats().unwrap();
        assert_eq!(stats.auto_labeled, 2);
        assert_eq!(stats.labels_since_training, 2);
    }

    #[test]
    fn test_existing_labels_are_kept() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Cherry", 1);
        label_manually(&store, &failure.id, 4).unwrap();

        let success = record_success(&store, "Cherry", 2, 2);
        assert_eq!(propagate_success(&store, &success).unwrap(), 0);
        assert_eq!(store.load(&failure.id).unwrap().correct_answer, Some(idx(4)));
    }

    #[test]
    fn test_no_matches_leaves_counters() {
        let (store, _dir) = create_test_store();
        record_failure(&store, "Apple", 1);
        let success = record_success(&store, "Cherry", 2, 2);
        assert_eq!(propagate_success(&store, &success).unwrap(), 0);
        assert_eq!(store.load_stats().unwrap().labels_since_training, 0);
    }

    #[test]
    fn test_rejects_failure_as_source() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Cherry", 1);
        assert!(matches!(
            propagate_success(&store, &failure),
            Err(LabelingError::WrongPartition { .. })
        ));
    }
}

mod immediate_tests {
    use super::*;

    #[test]
    fn test_trusted_prediction_is_written() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Cherry", 1);

        let outcome = mock_labeler().label_failure(&store, &failure).unwrap();
        let LabelOutcome::Labeled(prediction) = outcome else {
            panic!("expected a label, got {outcome:?}");
        };
        assert_eq!(prediction.answer, idx(3));

        let labeled = store.load(&failure.id).unwrap();
        assert_eq!(labeled.correct_answer, Some(idx(3)));
        assert_eq!(labeled.label_source, Some(LabelSource::ImmediateModel));
        let confidence = labeled.label_confidence.unwrap();
        assert!((confidence - 70.0).abs() < 0.1);

        assert_eq!(store.load_stats().unwrap().auto_labeled, 1);
    }

    #[test]
    fn test_gate_withholds_label() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Apple", 1);

        let outcome = mock_labeler().label_failure(&store, &failure).unwrap();
        assert!(matches!(outcome, LabelOutcome::Withheld(_)));
        assert!(!store.load(&failure.id).unwrap().is_labeled());
        assert_eq!(store.load_stats().unwrap().auto_labeled, 0);
    }

    #[test]
    fn test_scores_with_baseline_variant() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Cherry", 1);
        let labeler = labeler(
            MockModelLoader::new(MockSimilarityModel::new().with_default([0.9, 0.05, 0.03, 0.02]))
                .with_finetuned(MockSimilarityModel::new().with_default([0.02, 0.03, 0.05, 0.9])),
        );

        let prediction = labeler.predict(&store, &failure).unwrap();
        assert_eq!(prediction.answer, idx(1));
    }

    #[test]
    fn test_already_labeled_is_skipped() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Cherry", 1);
        label_manually(&store, &failure.id, 1).unwrap();
        let failure = store.load(&failure.id).unwrap();

        let outcome = mock_labeler().label_failure(&store, &failure).unwrap();
        assert_eq!(outcome, LabelOutcome::AlreadyLabeled);
    }

    #[test]
    fn test_stale_record_loses_to_first_writer() {
        let (store, _dir) = create_test_store();
        let stale = record_failure(&store, "Cherry", 1);
        label_manually(&store, &stale.id, 2).unwrap();

        // `stale` still looks unlabeled; the store keeps the first label.
        let outcome = mock_labeler().label_failure(&store, &stale).unwrap();
        assert_eq!(outcome, LabelOutcome::AlreadyLabeled);
        assert_eq!(store.load(&stale.id).unwrap().correct_answer, Some(idx(2)));
    }

    #[test]
    fn test_rejects_success() {
        let (store, _dir) = create_test_store();
        let success = record_success(&store, "Cherry", 1, 1);
        assert!(mock_labeler().label_failure(&store, &success).is_err());
    }

    #[test]
    fn test_scoring_failure_is_error() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Cherry", 1);
        let labeler = labeler(MockModelLoader::new(MockSimilarityModel::failing()));
        assert!(matches!(
            labeler.label_failure(&store, &failure),
            Err(LabelingError::Embedding(_))
        ));
    }
}

mod relabel_tests {
    use super::*;

    fn populate(store: &AttemptStore) -> (Attempt, Attempt, Attempt) {
        let cherry = record_failure(store, "Cherry", 1);
        let apple = record_failure(store, "Apple", 2);
        let labeled = record_failure(store, "Cherry", 3);
        label_manually(store, &labeled.id, 4).unwrap();
        (cherry, apple, labeled)
    }

    #[test]
    fn test_apply_writes_trusted_labels() {
        let (store, _dir) = create_test_store();
        let (cherry, apple, _) = populate(&store);

        let report = relabel_failures(&store, &mock_labeler(), RelabelOptions::apply()).unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.labeled, 1);
        assert_eq!(report.withheld, 1);
        assert_eq!(report.already_labeled, 1);

        assert!(store.load(&cherry.id).unwrap().is_labeled());
        assert!(!store.load(&apple.id).unwrap().is_labeled());
        assert_eq!(store.load_stats().unwrap().auto_labeled, 1);
    }

    #[test]
    fn test_dry_run_never_writes() {
        let (store, _dir) = create_test_store();
        let (cherry, _, _) = populate(&store);

        let report = relabel_failures(&store, &mock_labeler(), RelabelOptions::dry_run()).unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.labeled, 0);
        assert_eq!(report.trusted(), 1);
        assert!(!store.load(&cherry.id).unwrap().is_labeled());
        assert_eq!(store.load_stats().unwrap().auto_labeled, 0);
    }

    #[test]
    fn test_review_reports_labeled_failures() {
        let (store, _dir) = create_test_store();
        let (_, _, labeled) = populate(&store);

        let report = relabel_failures(&store, &mock_labeler(), RelabelOptions::review()).unwrap();
        assert_eq!(report.examined, 3);
        assert_eq!(report.labeled, 0);

        let entry = report.entries.iter().find(|e| e.id == labeled.id).unwrap();
        assert_eq!(entry.existing_label, Some(idx(4)));
        assert_eq!(entry.agrees_with_existing(), Some(false));
        assert!(!entry.written);
    }

    #[test]
    fn test_unreadable_images_are_counted() {
        let (store, _dir) = create_test_store();
        let cherry = record_failure(&store, "Cherry", 1);
        std::fs::remove_file(store.attempt_path(&cherry.id).join("button_1.png")).unwrap();

        let report = relabel_failures(&store, &mock_labeler(), RelabelOptions::apply()).unwrap();
        assert_eq!(report.errors, 1);
        assert!(report.entries.is_empty());
    }

    #[test]
    fn test_options() {
        assert!(RelabelOptions::apply().writes());
        assert!(!RelabelOptions::dry_run().writes());
        assert!(!RelabelOptions::review().writes());
        assert_eq!(Partition::Failures.to_string(), "failures");
    }
}

mod manual_tests {
    use super::*;

    #[test]
    fn test_manual_label() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Cherry", 1);

        assert!(label_manually(&store, &failure.id, 2).unwrap());
        assert!(!label_manually(&store, &failure.id, 3).unwrap());

        let labeled = store.load(&failure.id).unwrap();
        assert_eq!(labeled.correct_answer, Some(idx(2)));
        assert_eq!(labeled.label_source, Some(LabelSource::Manual));

        let stats = store.load_stats().unwrap();
        assert_eq!(stats.labels_since_training, 1);
        assert_eq!(stats.auto_labeled, 0);
    }

    #[test]
    fn test_manual_label_invalid_index() {
        let (store, _dir) = create_test_store();
        let failure = record_failure(&store, "Cherry", 1);
        assert!(matches!(
            label_manually(&store, &failure.id, 5),
            Err(LabelingError::InvalidIndex { index: 5 })
        ));
        assert!(matches!(
            label_manually(&store, &failure.id, 0),
            Err(LabelingError::InvalidIndex { index: 0 })
        ));
    }
}
