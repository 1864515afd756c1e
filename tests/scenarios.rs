// tests/scenarios.rs
use approx::assert_abs_diff_eq;
use ffa_rs::algorithms::minimal_hitting_sets;
use ffa_rs::{
    explain, explain_with_backend, explain_with_oracle, CancelToken, ClassLabel, Classifier, Decision,
    DecisionTree, DomainTable, EntailmentOracle, EntailmentStrategy, EnumerationConfig, EnumerationOutcome,
    Exactness, ExplainRequest, FeatureDomain, FeatureSubset, FinalState, FnClassifier, Instance,
    LinearClassifier, Result, TreeNode, XpEnumerator,
};
use ndarray::array;
use std::thread;
use std::time::Duration;

fn sorted(mut family: Vec<FeatureSubset>) -> Vec<FeatureSubset> {
    family.sort_by(|a, b| a.iter().cmp(b.iter()));
    family
}

fn subsets(raw: &[&[usize]]) -> Vec<FeatureSubset> {
    sorted(raw.iter().map(|s| s.iter().copied().collect()).collect())
}

/// Every AXp hits every CXp, and for a finished run each family is exactly
/// the minimal hitting sets of the other.
fn assert_dual(outcome: &EnumerationOutcome) {
    let axps = outcome.axp_family();
    let cxps = outcome.cxp_family();
    for a in &axps {
        for c in &cxps {
            assert!(a.intersects(c), "AXp {} misses CXp {}", a, c);
        }
    }
    for family in [&axps, &cxps] {
        for (i, x) in family.iter().enumerate() {
            for (j, y) in family.iter().enumerate() {
                assert!(i == j || !x.is_subset(y), "{} is not minimal against {}", y, x);
            }
        }
    }
    if outcome.state == FinalState::Exhausted {
        assert_eq!(sorted(minimal_hitting_sets(&cxps, None)), sorted(axps.clone()));
        assert_eq!(sorted(minimal_hitting_sets(&axps, None)), sorted(cxps));
    }
}

fn majority(n: usize, quorum: usize) -> FnClassifier<impl Fn(&Instance) -> usize + Send + Sync> {
    FnClassifier::new(n, move |x: &Instance| usize::from(x.iter().filter(|&&v| v > 0.5).count() >= quorum))
}

#[test]
fn single_relevant_feature_is_the_only_explanation() {
    let model = FnClassifier::new(3, |x: &Instance| usize::from(x[0] > 0.5));
    let request = ExplainRequest::for_prediction(
        &model,
        array![0.9, 0.3, 0.7],
        DomainTable::uniform_interval(3, 0.0, 1.0),
    )
    .unwrap();
    assert_eq!(request.target, 1);

    let outcome = explain(&model, request, &EnumerationConfig::default()).unwrap();
    assert_eq!(outcome.state, FinalState::Exhausted);
    assert_eq!(outcome.axp_family(), subsets(&[&[0]]));
    assert_eq!(outcome.cxp_family(), subsets(&[&[0]]));
    assert_eq!(outcome.attribution.scores, array![1.0, 0.0, 0.0]);
    // Interval domains are only gridded, so the exhaustive answer is not exact.
    assert_eq!(outcome.attribution.exactness, Exactness::Approximate);
    assert_dual(&outcome);
}

#[test]
fn conjunction_needs_both_features() {
    // class 1 iff x0 + x1 > 1
    let model = LinearClassifier::new(vec![1.0, 1.0], -1.0).unwrap();
    let request = ExplainRequest::for_prediction(
        &model,
        array![0.6, 0.6],
        DomainTable::uniform_interval(2, 0.0, 1.0),
    )
    .unwrap();
    let config = EnumerationConfig::default().with_strategy(EntailmentStrategy::Solver);

    let outcome = explain_with_backend(&model, request, &config).unwrap();
    assert_eq!(outcome.state, FinalState::Exhausted);
    assert_eq!(outcome.axp_family(), subsets(&[&[0, 1]]));
    assert_eq!(sorted(outcome.cxp_family()), subsets(&[&[0], &[1]]));
    assert_abs_diff_eq!(outcome.attribution.scores[0], 1.0);
    assert_abs_diff_eq!(outcome.attribution.scores[1], 1.0);
    let normalized = outcome.attribution.normalized();
    assert_abs_diff_eq!(normalized[0], 0.5);
    assert_abs_diff_eq!(normalized[1], 0.5);
    assert!(outcome.attribution.exactness.is_exact());
    assert_dual(&outcome);
}

#[test]
fn zero_budget_returns_an_empty_estimate() {
    let model = majority(3, 2);
    let request = ExplainRequest::new(array![1.0, 1.0, 0.0], 1, DomainTable::new(vec![FeatureDomain::boolean(); 3]));
    let config = EnumerationConfig::default().with_budget(Duration::ZERO);

    let outcome = explain(&model, request, &config).unwrap();
    assert_eq!(outcome.state, FinalState::BudgetExpired);
    assert_eq!(outcome.stats.iterations, 0);
    assert!(outcome.axps.is_empty());
    assert!(outcome.attribution.is_empty());
    assert_eq!(outcome.attribution.scores, array![0.0, 0.0, 0.0]);
}

#[test]
fn sampled_entailment_marks_its_axps_approximate() {
    let model = FnClassifier::new(3, |x: &Instance| usize::from(x[0] > 0.5));
    let request = ExplainRequest::new(array![0.9, 0.3, 0.7], 1, DomainTable::uniform_interval(3, 0.0, 1.0));
    let config = EnumerationConfig::default().with_strategy(EntailmentStrategy::Sampled {
        samples: 200,
        seed: Some(7),
    });

    let outcome = explain(&model, request, &config).unwrap();
    assert_eq!(outcome.state, FinalState::Exhausted);
    assert_eq!(outcome.axp_family(), subsets(&[&[0]]));
    assert_eq!(outcome.axps[0].exactness, Exactness::Approximate);
    assert_eq!(outcome.attribution.exactness, Exactness::Approximate);
    // The CXp has a witness, but its minimality also rests on a sampled miss.
    assert_eq!(outcome.cxp_family(), subsets(&[&[0]]));
    assert_eq!(outcome.cxps[0].exactness, Exactness::Approximate);
}

/// Reasons about `x0 > 0.5` but never certifies an answer.
struct Hunch;

impl EntailmentOracle for Hunch {
    fn describe(&self) -> &'static str {
        "hunch"
    }

    fn is_cxp_candidate(
        &self,
        _instance: &Instance,
        free: &FeatureSubset,
        _target: ClassLabel,
        _domains: &DomainTable,
    ) -> Result<Decision> {
        Ok(Decision::approximate(free.contains(0)))
    }
}

#[test]
fn uncertified_oracle_yields_an_approximate_attribution() {
    let request = ExplainRequest::new(array![0.9, 0.3, 0.7], 1, DomainTable::uniform_interval(3, 0.0, 1.0));
    // The configured strategy is ignored in favour of the supplied oracle.
    let config = EnumerationConfig::default().with_strategy(EntailmentStrategy::Solver);

    let outcome = explain_with_oracle(&Hunch, request, &config).unwrap();
    assert_eq!(outcome.state, FinalState::Exhausted);
    assert_eq!(outcome.axp_family(), subsets(&[&[0]]));
    assert_eq!(outcome.cxp_family(), subsets(&[&[0]]));
    assert_eq!(outcome.attribution.scores, array![1.0, 0.0, 0.0]);
    assert_eq!(outcome.attribution.exactness, Exactness::Approximate);
    assert!(outcome.axps.iter().chain(&outcome.cxps).all(|e| !e.exactness.is_exact()));
}

#[test]
fn majority_vote_families_are_dual() {
    let model = majority(4, 3);
    let request = ExplainRequest::new(
        array![1.0, 1.0, 1.0, 1.0],
        1,
        DomainTable::new(vec![FeatureDomain::boolean(); 4]),
    );
    let outcome = explain(&model, request, &EnumerationConfig::default()).unwrap();
    assert_eq!(outcome.state, FinalState::Exhausted);
    // Any three ones keep the vote; any two zeros break it.
    assert_eq!(outcome.axps.len(), 4);
    assert_eq!(outcome.cxps.len(), 6);
    for score in outcome.attribution.scores.iter() {
        assert_abs_diff_eq!(*score, 0.75);
    }
    assert!(outcome.attribution.exactness.is_exact());
    assert_dual(&outcome);
}

#[test]
fn exhaustive_and_solver_agree_on_a_categorical_tree() {
    // x0 <= 0.5 ? (x1 <= 1.5 ? 0 : 1) : (x2 <= 0.5 ? 1 : 0)
    let tree = DecisionTree::new(
        vec![
            TreeNode::Split { feature: 0, threshold: 0.5, left: 1, right: 2 },
            TreeNode::Split { feature: 1, threshold: 1.5, left: 3, right: 4 },
            TreeNode::Split { feature: 2, threshold: 0.5, left: 5, right: 6 },
            TreeNode::Leaf { class: 0 },
            TreeNode::Leaf { class: 1 },
            TreeNode::Leaf { class: 1 },
            TreeNode::Leaf { class: 0 },
        ],
        3,
    )
    .unwrap();
    let domains = DomainTable::new(vec![
        FeatureDomain::categorical(vec![0.0, 1.0]),
        FeatureDomain::categorical(vec![0.0, 1.0, 2.0]),
        FeatureDomain::categorical(vec![0.0, 1.0]),
    ]);
    let instance = array![0.0, 2.0, 1.0];
    assert_eq!(tree.predict(&instance).unwrap(), 1);

    let request = ExplainRequest::new(instance, 1, domains);
    let exhaustive = explain(&tree, request.clone(), &EnumerationConfig::default()).unwrap();
    let solver = explain_with_backend(
        &tree,
        request,
        &EnumerationConfig::default().with_strategy(EntailmentStrategy::Solver),
    )
    .unwrap();

    assert_eq!(exhaustive.state, FinalState::Exhausted);
    assert_eq!(solver.state, FinalState::Exhausted);
    assert_eq!(sorted(exhaustive.axp_family()), sorted(solver.axp_family()));
    assert_eq!(sorted(exhaustive.cxp_family()), sorted(solver.cxp_family()));
    assert_eq!(exhaustive.attribution.scores, solver.attribution.scores);
    assert!(exhaustive.attribution.exactness.is_exact());
    assert_dual(&exhaustive);
}

#[test]
fn run_stays_close_to_its_budget() {
    let model = FnClassifier::new(9, |x: &Instance| {
        thread::sleep(Duration::from_millis(2));
        usize::from(x.iter().filter(|&&v| v > 0.5).count() >= 5)
    });
    let request = ExplainRequest::new(Instance::ones(9), 1, DomainTable::new(vec![FeatureDomain::boolean(); 9]));
    let budget = Duration::from_millis(50);
    let config = EnumerationConfig::default()
        .with_budget(budget)
        .with_strategy(EntailmentStrategy::Sampled { samples: 4, seed: Some(1) });

    let outcome = explain(&model, request, &config).unwrap();
    assert_eq!(outcome.state, FinalState::BudgetExpired);
    // Only the call in flight may straddle the deadline: four 2 ms
    // predictions, plus scheduling slack.
    let overrun = outcome.stats.elapsed.saturating_sub(budget);
    assert!(overrun < Duration::from_millis(50), "overran the budget by {:?}", overrun);
    assert_dual(&outcome);
}

#[test]
fn cancellation_from_another_thread_stops_the_run() {
    let model = FnClassifier::new(9, |x: &Instance| {
        thread::sleep(Duration::from_millis(2));
        usize::from(x.iter().filter(|&&v| v > 0.5).count() >= 5)
    });
    let request = ExplainRequest::new(Instance::ones(9), 1, DomainTable::new(vec![FeatureDomain::boolean(); 9]));
    let config = EnumerationConfig::default()
        .with_budget_secs(600)
        .with_strategy(EntailmentStrategy::Sampled { samples: 4, seed: Some(1) });

    let token = CancelToken::new();
    let remote = token.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        remote.cancel();
    });

    let outcome = XpEnumerator::new(&model, request, config)
        .unwrap()
        .with_cancel_token(token)
        .run()
        .unwrap();
    canceller.join().unwrap();

    assert_eq!(outcome.state, FinalState::Cancelled);
    assert!(outcome.stats.elapsed < Duration::from_secs(60));
    assert_dual(&outcome);
}

#[test]
fn outcome_serializes_to_json() {
    let model = FnClassifier::new(2, |x: &Instance| usize::from(x[1] > 0.5));
    let request = ExplainRequest::new(array![0.0, 1.0], 1, DomainTable::new(vec![FeatureDomain::boolean(); 2]));
    let outcome = explain(&model, request, &EnumerationConfig::default()).unwrap();

    let json = serde_json::to_string(&outcome.attribution).unwrap();
    let restored: ffa_rs::Attribution = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, outcome.attribution);

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["state"], "Exhausted");
    assert_eq!(value["axps"][0]["features"], serde_json::json!([1]));
}
