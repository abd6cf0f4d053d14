use super::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crate::challenge::{CandidateIndex, Candidates};
use crate::labeling::label_manually;
use crate::storage::{AttemptStore, LearningStats, NewAttempt};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn trigger(runner: Arc<RecordingJobRunner>) -> TrainingTrigger {
    TrainingTrigger::new(TriggerConfig::default(), runner)
}

fn stats(labels: u64, last_training: Option<chrono::DateTime<Utc>>) -> LearningStats {
    LearningStats {
        labels_since_training: labels,
        last_training,
        ..Default::default()
    }
}

fn root() -> PathBuf {
    PathBuf::from("/tmp/glimpse-store")
}

mod trigger_tests {
    use super::*;

    #[test]
    fn test_nineteen_labels_do_not_launch() {
        let runner = Arc::new(RecordingJobRunner::new());
        let trigger = trigger(runner.clone());
        let mut stats = stats(19, Some(now() - chrono::Duration::hours(2)));

        let decision = trigger.check(&mut stats, &root(), now());
        assert_eq!(
            decision,
            TriggerDecision::Idle {
                labels: 19,
                threshold: 20
            }
        );
        assert!(runner.jobs().is_empty());
        assert_eq!(stats.labels_since_training, 19);
    }

    #[test]
    fn test_twenty_labels_after_interval_launch_and_reset() {
        let runner = Arc::new(RecordingJobRunner::new());
        let trigger = trigger(runner.clone());
        let mut stats = stats(20, Some(now() - chrono::Duration::hours(1)));

        let decision = trigger.check(&mut stats, &root(), now());
        assert!(decision.launched());
        assert_eq!(stats.labels_since_training, 0);
        assert_eq!(stats.last_training, Some(now()));
        assert_eq!(stats.training_count, 1);

        let jobs = runner.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].labels_since_training, 20);
        assert_eq!(jobs[0].store_root, root());
    }

    #[test]
    fn test_interval_not_elapsed_is_pending() {
        let runner = Arc::new(RecordingJobRunner::new());
        let trigger = trigger(runner.clone());
        let mut stats = stats(25, Some(now() - chrono::Duration::minutes(45)));

        let decision = trigger.check(&mut stats, &root(), now());
        assert_eq!(
            decision,
            TriggerDecision::Pending {
                remaining: Duration::from_secs(15 * 60)
            }
        );
        assert!(runner.jobs().is_empty());
        assert_eq!(stats.labels_since_training, 25);
    }

    #[test]
    fn test_never_trained_counts_as_elapsed() {
        let runner = Arc::new(RecordingJobRunner::new());
        let mut stats = stats(20, None);
        assert!(trigger(runner).check(&mut stats, &root(), now()).launched());
    }

    #[test]
    fn test_spawn_failure_leaves_counters() {
        let runner = Arc::new(RecordingJobRunner::failing());
        let mut stats = stats(30, None);

        let decision = trigger(runner).check(&mut stats, &root(), now());
        assert!(matches!(decision, TriggerDecision::SpawnFailed { .. }));
        assert_eq!(stats.labels_since_training, 30);
        assert_eq!(stats.training_count, 0);
        assert_eq!(stats.last_training, None);
    }

    #[test]
    fn test_evaluate_has_no_side_effects() {
        let runner = Arc::new(RecordingJobRunner::new());
        let stats = stats(20, None);
        assert_eq!(trigger(runner.clone()).evaluate(&stats, now()), TriggerDecision::Due);
        assert!(runner.jobs().is_empty());
    }

    #[test]
    fn test_check_store_persists_reset() {
        let dir = TempDir::new().unwrap();
        let store = AttemptStore::open(dir.path()).unwrap();
        store.update_stats(|s| s.record_labels(20, true)).unwrap();

        let runner = Arc::new(RecordingJobRunner::new());
        let decision = trigger(runner.clone()).check_store(&store, now()).unwrap();
        assert!(decision.launched());

        let persisted = store.load_stats().unwrap();
        assert_eq!(persisted.labels_since_training, 0);
        assert_eq!(persisted.training_count, 1);
        assert_eq!(runner.jobs()[0].store_root, dir.path());
    }

    #[test]
    fn test_custom_config() {
        let config = TriggerConfig::default()
            .with_label_threshold(0)
            .with_min_interval(Duration::ZERO);
        assert_eq!(config.label_threshold, 1);

        let runner = Arc::new(RecordingJobRunner::new());
        let trigger = TrainingTrigger::new(config, runner);
        let mut stats = stats(1, Some(now()));
        assert!(trigger.check(&mut stats, &root(), now()).launched());
    }
}

mod runner_tests {
    use super::*;

    #[test]
    fn test_process_runner_args() {
        let runner = ProcessJobRunner::new("/usr/local/bin/glimpse").with_args(["--verbose"]);
        let job = TrainingJob {
            store_root: PathBuf::from("/data/store"),
            labels_since_training: 20,
        };
        let args: Vec<String> = runner
            .args_for(&job)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["--verbose", "--store", "/data/store", "train"]);
        assert_eq!(runner.program(), Path::new("/usr/local/bin/glimpse"));
    }

    #[test]
    fn test_resolve_prefers_explicit_program() {
        let runner = ProcessJobRunner::resolve_near(
            Some(Path::new("/opt/glimpse/bin/glimpse")),
            Some(Path::new("/usr/bin/host-bot")),
        );
        assert_eq!(runner.program(), Path::new("/opt/glimpse/bin/glimpse"));
    }

    #[test]
    fn test_resolve_finds_binary_beside_host() {
        let dir = TempDir::new().unwrap();
        let host = dir.path().join("host-bot");
        let sibling = dir
            .path()
            .join(format!("{TRAIN_PROGRAM}{}", std::env::consts::EXE_SUFFIX));
        std::fs::write(&host, b"").unwrap();
        std::fs::write(&sibling, b"").unwrap();

        let runner = ProcessJobRunner::resolve_near(None, Some(&host));
        assert_eq!(runner.program(), sibling);
    }

    #[test]
    fn test_resolve_falls_back_to_path_lookup() {
        let dir = TempDir::new().unwrap();
        let host = dir.path().join("host-bot");

        let runner = ProcessJobRunner::resolve_near(None, Some(&host));
        assert_ne!(runner.program(), host);
        assert_eq!(
            runner.program(),
            Path::new(&format!("{TRAIN_PROGRAM}{}", std::env::consts::EXE_SUFFIX))
        );

        let runner = ProcessJobRunner::resolve_near(None, None);
        assert_eq!(runner.program().file_stem().and_then(|s| s.to_str()), Some(TRAIN_PROGRAM));
    }

    #[test]
    fn test_process_runner_missing_program() {
        let runner = ProcessJobRunner::new("/nonexistent/glimpse-binary");
        let job = TrainingJob {
            store_root: root(),
            labels_since_training: 1,
        };
        assert!(matches!(
            runner.submit(&job),
            Err(TrainingError::SpawnFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_spawns_detached() {
        let runner = ProcessJobRunner::new("/bin/sh").with_args(["-c", "exit 0", "sh"]);
        let job = TrainingJob {
            store_root: root(),
            labels_since_training: 1,
        };
        let handle = runner.submit(&job).unwrap();
        assert!(handle.pid.is_some());
    }
}

mod dataset_tests {
    use super::*;

    fn candidates(seed: u8) -> Candidates {
        Candidates::from_bytes((0..4u8).map(|i| vec![seed, i])).unwrap()
    }

    fn idx(i: u8) -> CandidateIndex {
        CandidateIndex::new(i).unwrap()
    }

    #[test]
    fn test_dataset_uses_labeled_attempts_only() {
        let dir = TempDir::new().unwrap();
        let store = AttemptStore::open(dir.path()).unwrap();

        store
            .append(&NewAttempt::new("Cherry", candidates(1), Some(idx(2)), true))
            .unwrap();
        let labeled = store
            .append(&NewAttempt::new("Apple", candidates(2), Some(idx(1)), false))
            .unwrap();
        store
            .append(&NewAttempt::new("Apple", candidates(3), Some(idx(1)), false))
            .unwrap();
        label_manually(&store, &labeled.id, 3).unwrap();

        let (samples, summary) = build_dataset(&store).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(summary.from_successes, 1);
        assert_eq!(summary.manual, 1);
        assert_eq!(summary.total(), 2);

        let apple = samples.iter().find(|s| s.id == labeled.id).unwrap();
        assert_eq!(apple.answer, idx(3));
        assert_eq!(apple.candidates, candidates(2));
    }

    #[test]
    fn test_dataset_skips_unreadable_images() {
        let dir = TempDir::new().unwrap();
        let store = AttemptStore::open(dir.path()).unwrap();
        let success = store
            .append(&NewAttempt::new("Cherry", candidates(1), Some(idx(2)), true))
            .unwrap();
        std::fs::remove_file(store.attempt_path(&success.id).join("button_4.png")).unwrap();

        let (samples, summary) = build_dataset(&store).unwrap();
        assert!(samples.is_empty());
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_run_training_requires_samples() {
        let dir = TempDir::new().unwrap();
        let store = AttemptStore::open(dir.path().join("store")).unwrap();
        let config = FinetuneConfig {
            baseline_dir: dir.path().join("base"),
            output_dir: dir.path().join("tuned"),
            ..Default::default()
        };
        assert!(matches!(
            run_training(&store, &config),
            Err(TrainingError::EmptyDataset)
        ));
    }
}

mod finetune_tests {
    use super::*;
    use crate::training::finetune::epoch_order;

    #[test]
    fn test_epoch_order_is_a_permutation() {
        let mut order = epoch_order(10, 3);
        assert_ne!(order, (0..10).collect::<Vec<_>>());
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_epoch_order_is_deterministic_and_varies() {
        assert_eq!(epoch_order(16, 1), epoch_order(16, 1));
        assert_ne!(epoch_order(16, 1), epoch_order(16, 2));
    }

    #[test]
    fn test_config_validation() {
        assert!(FinetuneConfig::default().validate().is_ok());

        let zero_epochs = FinetuneConfig {
            epochs: 0,
            ..Default::default()
        };
        assert!(zero_epochs.validate().is_err());

        let bad_lr = FinetuneConfig {
            learning_rate: -1.0,
            ..Default::default()
        };
        assert!(bad_lr.validate().is_err());

        let same_dir = FinetuneConfig {
            output_dir: FinetuneConfig::default().baseline_dir,
            ..Default::default()
        };
        assert!(same_dir.validate().is_err());
    }

    #[test]
    fn test_finetune_requires_baseline_checkpoint() {
        let dir = TempDir::new().unwrap();
        let config = FinetuneConfig {
            baseline_dir: dir.path().join("base"),
            output_dir: dir.path().join("tuned"),
            ..Default::default()
        };
        let sample = TrainingSample {
            id: crate::storage::AttemptId::parse("success_20240101_000000_000000-00000000").unwrap(),
            question: "Cherry".to_string(),
            candidates: Candidates::from_bytes((0..4u8).map(|i| vec![i])).unwrap(),
            answer: CandidateIndex::new(1).unwrap(),
        };
        assert!(matches!(
            finetune(&config, &[sample]),
            Err(TrainingError::Embedding(_))
        ));
        assert!(!dir.path().join("tuned").exists());
    }
}
