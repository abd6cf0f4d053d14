//! End-to-end tests of the learning loop over mock models.

mod common;

use common::fixtures::{TestSessionBuilder, baseline_model, png_candidates, registry};
use glimpse::embedding::{EmbeddingScorer, MockModelLoader, MockSimilarityModel};
use glimpse::labeling::{ImmediateLabeler, LabelOutcome, RelabelOptions, relabel_failures};
use glimpse::scoring::GateConfig;
use glimpse::selection::{ModelVariant, SelectionEvent};
use glimpse::storage::{LabelSource, Partition};
use glimpse::training::{TriggerDecision, build_dataset};

#[test]
fn test_failures_then_success_feed_the_dataset() {
    let t = TestSessionBuilder::new().build();
    let session = &t.session;

    let mut failures = Vec::new();
    for seed in 1..=3 {
        let solved = session.solve_and_record("Apple", png_candidates(seed));
        failures.push(session.record_outcome(solved.ticket, false).unwrap().attempt);
    }

    let solved = session.solve_and_record("  APPLE ", png_candidates(10));
    let success = session.record_outcome(solved.ticket, true).unwrap();
    assert_eq!(success.retroactive_labels, 3);

    for failure in &failures {
        let stored = session.store().load(&failure.id).unwrap();
        assert_eq!(stored.correct_answer, success.attempt.chosen_index);
        assert_eq!(stored.label_source, Some(LabelSource::RetroactiveFromSuccess));
        assert!(stored.auto_labeled);
    }

    let (samples, summary) = build_dataset(session.store()).unwrap();
    assert_eq!(samples.len(), 4);
    assert_eq!(summary.from_successes, 1);
    assert_eq!(summary.retroactive, 3);

    let stats = session.store().load_stats().unwrap();
    assert_eq!(stats.total_attempts, 4);
    assert_eq!(stats.auto_labeled, 3);
    assert_eq!(stats.labels_since_training, 3);
}

#[test]
fn test_labels_launch_training_once_per_threshold() {
    let t = TestSessionBuilder::new().train_every(3).build();
    let session = &t.session;

    let mut decisions = Vec::new();
    for seed in 1..=4 {
        let solved = session.solve_and_record("Cherry", png_candidates(seed));
        let outcome = session.record_outcome(solved.ticket, false).unwrap();
        assert!(matches!(outcome.immediate, Some(LabelOutcome::Labeled(_))));
        decisions.push(outcome.trigger.unwrap());
    }

    assert!(matches!(decisions[0], TriggerDecision::Idle { labels: 1, .. }));
    assert!(matches!(decisions[1], TriggerDecision::Idle { labels: 2, .. }));
    assert!(decisions[2].launched());
    assert!(matches!(decisions[3], TriggerDecision::Idle { labels: 1, .. }));

    let jobs = t.runner.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].labels_since_training, 3);
    assert_eq!(jobs[0].store_root, t.dir.path());

    let status = session.status().unwrap();
    assert_eq!(status.training_count, 1);
    assert!(status.last_training.is_some());
    assert_eq!(status.labels_until_training, 2);
}

#[test]
fn test_failing_finetuned_model_is_abandoned() {
    let t = TestSessionBuilder::new()
        .finetuned(MockSimilarityModel::new().with_default([0.85, 0.05, 0.05, 0.05]))
        .build();
    let session = &t.session;
    assert_eq!(session.active_variant(), ModelVariant::Finetuned);

    let mut last = SelectionEvent::Ignored;
    for seed in 1..=5 {
        let solved = session.solve_and_record("Lighthouse", png_candidates(seed));
        assert_eq!(solved.decision.model_used, ModelVariant::Finetuned);
        last = session.record_outcome(solved.ticket, false).unwrap().selection;
    }

    assert_eq!(
        last,
        SelectionEvent::Switched {
            from: ModelVariant::Finetuned,
            to: ModelVariant::Baseline
        }
    );
    assert_eq!(session.status().unwrap().active_variant, ModelVariant::Baseline);
}

#[test]
fn test_success_resets_failure_streak() {
    let t = TestSessionBuilder::new()
        .finetuned(MockSimilarityModel::new().with_default([0.85, 0.05, 0.05, 0.05]))
        .build();
    let session = &t.session;

    for (seed, succeeded) in [(1, false), (2, false), (3, false), (4, false), (5, true), (6, false)] {
        let solved = session.solve_and_record("Lighthouse", png_candidates(seed));
        session.record_outcome(solved.ticket, succeeded).unwrap();
    }
    assert_eq!(session.active_variant(), ModelVariant::Finetuned);
}

#[test]
fn test_relabel_pass_after_the_fact() {
    let t = TestSessionBuilder::new()
        .baseline(MockSimilarityModel::failing())
        .build();

    for seed in 1..=2 {
        let solved = t.session.solve_and_record("Cherry", png_candidates(seed));
        assert!(solved.decision.is_declined());
        t.session.record_outcome(solved.ticket, false).unwrap();
    }
    assert_eq!(t.session.status().unwrap().unlabeled_failures, 2);

    let store = t.session.store();
    let labeler = ImmediateLabeler::new(
        EmbeddingScorer::new(registry(MockModelLoader::new(baseline_model()))),
        GateConfig::default(),
    );

    let review = relabel_failures(store, &labeler, RelabelOptions::review()).unwrap();
    assert_eq!(review.examined, 2);
    assert_eq!(review.labeled, 0);
    assert_eq!(review.trusted(), 2);

    let applied = relabel_failures(store, &labeler, RelabelOptions::apply()).unwrap();
    assert_eq!(applied.labeled, 2);
    assert_eq!(store.count(Partition::Failures).unwrap(), 2);
    assert_eq!(t.session.status().unwrap().unlabeled_failures, 0);
    assert_eq!(store.load_stats().unwrap().auto_labeled, 2);
}
