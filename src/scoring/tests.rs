use super::*;
use std::sync::Arc;

use crate::challenge::{CandidateIndex, Candidates};
use crate::embedding::{
    CandidateScores, EmbeddingScorer, MockModelLoader, MockSimilarityModel, ModelRegistry,
};
use crate::selection::ModelVariant;

fn candidates() -> Candidates {
    Candidates::from_bytes((0..4u8).map(|i| vec![i; 8])).unwrap()
}

fn idx(i: u8) -> CandidateIndex {
    CandidateIndex::new(i).unwrap()
}

fn solver(loader: MockModelLoader, config: SolverConfig) -> VerificationSolver {
    let registry = Arc::new(ModelRegistry::new(loader));
    VerificationSolver::new(EmbeddingScorer::new(registry), config)
}

fn baseline_only(probabilities: [f32; 4]) -> VerificationSolver {
    solver(
        MockModelLoader::new(MockSimilarityModel::new().with_default(probabilities)),
        SolverConfig::default(),
    )
}

mod gate_tests {
    use super::*;

    #[test]
    fn test_confident_scenario_is_trusted() {
        let scores = CandidateScores::new(vec![0.70, 0.20, 0.06, 0.04]).unwrap();
        let verdict = GateVerdict::evaluate(&scores, &GateConfig::default());
        assert_eq!(verdict.chosen, idx(1));
        assert!((verdict.confidence - 70.0).abs() < 1e-3);
        assert!((verdict.margin - 50.0).abs() < 1e-3);
        assert!(verdict.trusted);
    }

    #[test]
    fn test_flat_scenario_is_not_trusted() {
        let scores = CandidateScores::new(vec![0.30, 0.28, 0.22, 0.20]).unwrap();
        let verdict = GateVerdict::evaluate(&scores, &GateConfig::default());
        assert_eq!(verdict.chosen, idx(1));
        assert!(!verdict.trusted);
    }

    #[test]
    fn test_margin_alone_can_fail_the_gate() {
        // best clears 35% but leads by only 3 points
        let scores = CandidateScores::new(vec![0.40, 0.37, 0.13, 0.10]).unwrap();
        assert!(!GateVerdict::evaluate(&scores, &GateConfig::default()).trusted);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let scores = CandidateScores::new(vec![0.50, 0.45, 0.03, 0.02]).unwrap();
        let gate = GateConfig::new(25.0, 5.0);
        assert!(GateVerdict::evaluate(&scores, &gate).trusted);
    }

    #[test]
    fn test_custom_gate() {
        let scores = CandidateScores::new(vec![0.30, 0.28, 0.22, 0.20]).unwrap();
        let gate = GateConfig::new(0.0, 1.0);
        assert!(GateVerdict::evaluate(&scores, &gate).trusted);
    }
}

mod decision_tests {
    use super::*;

    #[test]
    fn test_declined_decision() {
        let decision = Decision::declined(ModelVariant::Baseline);
        assert!(decision.is_declined());
        assert!(!decision.declined_confidently());
        assert_eq!(decision.debug_status(), "DECLINED");
    }

    #[test]
    fn test_untrusted_still_chooses() {
        let scores = CandidateScores::new(vec![0.30, 0.28, 0.22, 0.20]).unwrap();
        let decision = Decision::scored(ModelVariant::Baseline, scores, &GateConfig::default());
        assert_eq!(decision.chosen, Some(idx(1)));
        assert!(decision.declined_confidently());
        assert!(decision.to_string().starts_with("UNTRUSTED candidate 1"));
    }
}

mod solver_tests {
    use super::*;

    #[test]
    fn test_solve_confident() {
        let decision =
            baseline_only([0.04, 0.70, 0.20, 0.06]).solve(ModelVariant::Baseline, "cherry", &candidates());
        assert_eq!(decision.chosen, Some(idx(2)));
        assert!(decision.trusted);
        assert_eq!(decision.model_used, ModelVariant::Baseline);

        let scores = decision.scores.unwrap();
        assert!((scores.sum() - 1.0).abs() < 1e-3);
        assert_eq!(scores.best().0, idx(2));
    }

    #[test]
    fn test_solve_flat_returns_top_untrusted() {
        let decision =
            baseline_only([0.30, 0.28, 0.22, 0.20]).solve(ModelVariant::Baseline, "cherry", &candidates());
        assert_eq!(decision.chosen, Some(idx(1)));
        assert!(!decision.trusted);
    }

    #[test]
    fn test_scoring_failure_declines() {
        let solver = solver(
            MockModelLoader::new(MockSimilarityModel::failing()),
            SolverConfig::default(),
        );
        let decision = solver.solve(ModelVariant::Baseline, "cherry", &candidates());
        assert!(decision.is_declined());
        assert!(solver.try_solve(ModelVariant::Baseline, "cherry", &candidates()).is_err());
    }

    #[test]
    fn test_empty_question_declines() {
        let decision = baseline_only([0.7, 0.1, 0.1, 0.1]).solve(ModelVariant::Baseline, " ", &candidates());
        assert!(decision.is_declined());
    }
}

mod fallback_tests {
    use super::*;

    fn dual(finetuned: [f32; 4], baseline: [f32; 4], config: SolverConfig) -> VerificationSolver {
        solver(
            MockModelLoader::new(MockSimilarityModel::new().with_default(baseline))
                .with_finetuned(MockSimilarityModel::new().with_default(finetuned)),
            config,
        )
    }

    #[test]
    fn test_strong_finetuned_result_is_kept() {
        let solver = dual([0.8, 0.1, 0.05, 0.05], [0.1, 0.9, 0.0, 0.0], SolverConfig::default());
        let decision = solver.solve(ModelVariant::Finetuned, "cherry", &candidates());
        assert_eq!(decision.model_used, ModelVariant::Finetuned);
        assert_eq!(decision.chosen, Some(idx(1)));
    }

    #[test]
    fn test_weak_finetuned_result_adopts_stronger_baseline() {
        let solver = dual([0.40, 0.35, 0.15, 0.10], [0.05, 0.85, 0.05, 0.05], SolverConfig::default());
        let decision = solver.solve(ModelVariant::Finetuned, "cherry", &candidates());
        assert_eq!(decision.model_used, ModelVariant::Baseline);
        assert_eq!(decision.chosen, Some(idx(2)));
        assert!(decision.trusted);
    }

    #[test]
    fn test_weak_finetuned_kept_when_baseline_weaker() {
        let solver = dual([0.40, 0.35, 0.15, 0.10], [0.30, 0.28, 0.22, 0.20], SolverConfig::default());
        let decision = solver.solve(ModelVariant::Finetuned, "cherry", &candidates());
        assert_eq!(decision.model_used, ModelVariant::Finetuned);
    }

    #[test]
    fn test_fallback_disabled() {
        let config = SolverConfig {
            fallback: FallbackConfig::disabled(),
            ..SolverConfig::default()
        };
        let solver = dual([0.40, 0.35, 0.15, 0.10], [0.05, 0.85, 0.05, 0.05], config);
        let decision = solver.solve(ModelVariant::Finetuned, "cherry", &candidates());
        assert_eq!(decision.model_used, ModelVariant::Finetuned);
    }

    #[test]
    fn test_baseline_never_falls_back() {
        let solver = dual([0.05, 0.85, 0.05, 0.05], [0.30, 0.28, 0.22, 0.20], SolverConfig::default());
        let decision = solver.solve(ModelVariant::Baseline, "cherry", &candidates());
        assert_eq!(decision.model_used, ModelVariant::Baseline);
        assert_eq!(decision.chosen, Some(idx(1)));
    }

    #[test]
    fn test_missing_finetuned_falls_back_to_baseline() {
        let solver = solver(
            MockModelLoader::new(MockSimilarityModel::new().with_default([0.7, 0.1, 0.1, 0.1])),
            SolverConfig::default(),
        );
        let decision = solver.solve(ModelVariant::Finetuned, "cherry", &candidates());
        assert_eq!(decision.model_used, ModelVariant::Baseline);
        assert_eq!(decision.chosen, Some(idx(1)));
    }

    #[test]
    fn test_fallback_weakness_thresholds() {
        let fallback = FallbackConfig::default();
        assert!(fallback.is_weak(59.0, 50.0));
        assert!(fallback.is_weak(90.0, 7.0));
        assert!(!fallback.is_weak(60.0, 8.0));
    }
}
