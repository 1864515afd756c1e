// src/algorithms/xpenum.rs
use crate::algorithms::dualizer::{HittingSetDualizer, HittingSets, Insertion};
use crate::algorithms::ffa;
use crate::core::{
    Attribution, ClassLabel, Decision, DomainTable, Exactness, Explanation, ExplanationKind, FeatureSubset,
    FfaError, Instance, Result,
};
use crate::oracle::{Entailment, EntailmentStrategy};
use crate::traits::{Classifier, ConstraintBackend, EntailmentOracle};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for one enumeration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumerationConfig {
    /// Wall-clock budget. Checked after every oracle call, never preempting one.
    pub time_budget: Duration,
    pub strategy: EntailmentStrategy,
    /// How many AXp's to harvest from the hitting sets after each new CXp.
    pub harvest_limit: usize,
    /// Reuse oracle answers for repeated subsets within a run.
    pub cache_decisions: bool,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        EnumerationConfig {
            time_budget: Duration::from_secs(10),
            strategy: EntailmentStrategy::default(),
            harvest_limit: 4,
            cache_decisions: true,
        }
    }
}

impl EnumerationConfig {
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn with_budget_secs(self, secs: u64) -> Self {
        self.with_budget(Duration::from_secs(secs))
    }

    pub fn with_strategy(mut self, strategy: EntailmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_harvest_limit(mut self, limit: usize) -> Self {
        self.harvest_limit = limit;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_decisions = false;
        self
    }
}

/// The prediction to explain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainRequest {
    pub instance: Instance,
    pub target: ClassLabel,
    pub domains: DomainTable,
}

impl ExplainRequest {
    pub fn new(instance: Instance, target: ClassLabel, domains: DomainTable) -> Self {
        ExplainRequest { instance, target, domains }
    }

    /// Explain whatever `classifier` currently predicts for `instance`.
    pub fn for_prediction(classifier: &dyn Classifier, instance: Instance, domains: DomainTable) -> Result<Self> {
        let target = classifier.predict(&instance)?;
        Ok(ExplainRequest::new(instance, target, domains))
    }
}

/// Cooperative cancellation, honoured between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalState {
    /// Every hitting-set guess is settled or discarded. Without discards the
    /// AXp and CXp families are complete.
    Exhausted,
    BudgetExpired,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Done(FinalState),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub iterations: usize,
    pub oracle_calls: usize,
    pub cache_hits: usize,
    pub discarded: usize,
    pub elapsed: Duration,
}

/// Running estimate handed to a progress observer.
#[derive(Debug, Clone)]
pub struct Progress {
    pub iteration: usize,
    pub axp_count: usize,
    pub cxp_count: usize,
    pub attribution: Attribution,
}

/// Result of one enumeration run. Every stored explanation is individually
/// sound; an early stop only limits coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumerationOutcome {
    pub state: FinalState,
    pub axps: Vec<Explanation>,
    pub cxps: Vec<Explanation>,
    pub attribution: Attribution,
    pub stats: RunStats,
}

impl EnumerationOutcome {
    pub fn axp_family(&self) -> Vec<FeatureSubset> {
        self.axps.iter().map(|e| e.features.clone()).collect()
    }

    pub fn cxp_family(&self) -> Vec<FeatureSubset> {
        self.cxps.iter().map(|e| e.features.clone()).collect()
    }
}

impl fmt::Display for EnumerationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Enumeration: {:?}", self.state)?;
        writeln!(
            f,
            "  Iterations: {}  Oracle calls: {}  Cache hits: {}  Elapsed: {:.3}s",
            self.stats.iterations,
            self.stats.oracle_calls,
            self.stats.cache_hits,
            self.stats.elapsed.as_secs_f64()
        )?;
        for explanation in self.axps.iter().chain(self.cxps.iter()) {
            writeln!(f, "  {}", explanation)?;
        }
        write!(f, "{}", self.attribution)
    }
}

/// Whether an iteration ran to completion or hit the deadline mid-way.
enum Step {
    Settled,
    OutOfTime,
}

/// The anytime AXp/CXp enumeration loop for a single prediction.
///
/// CXp's are found by existential queries and shrunk to minimality; AXp's are
/// harvested as minimal hitting sets of the CXp family, each confirmed by a
/// single universal query.
pub struct XpEnumerator<'a> {
    oracle: Entailment<'a>,
    request: ExplainRequest,
    config: EnumerationConfig,
    dualizer: HittingSetDualizer,
    // Keyed by the free set; AXp answers are stored negated under the complement.
    cache: HashMap<FeatureSubset, Decision>,
    state: RunState,
    stats: RunStats,
    started: Option<Instant>,
    cancel: CancelToken,
    observer: Option<Box<dyn FnMut(&Progress) + 'a>>,
}

impl<'a> XpEnumerator<'a> {
    pub fn new(classifier: &'a dyn Classifier, request: ExplainRequest, config: EnumerationConfig) -> Result<Self> {
        Self::build(classifier, None, request, config)
    }

    /// Like [`XpEnumerator::new`], with a constraint backend for the solver strategy.
    pub fn with_backend(
        classifier: &'a dyn Classifier,
        backend: &'a dyn ConstraintBackend,
        request: ExplainRequest,
        config: EnumerationConfig,
    ) -> Result<Self> {
        Self::build(classifier, Some(backend), request, config)
    }

    fn build(
        classifier: &'a dyn Classifier,
        backend: Option<&'a dyn ConstraintBackend>,
        request: ExplainRequest,
        config: EnumerationConfig,
    ) -> Result<Self> {
        let n = request.instance.len();
        if classifier.num_features() != n {
            return Err(FfaError::IncompatibleDimensions(format!(
                "Instance to explain has {} features, but the classifier expects {}.",
                n,
                classifier.num_features()
            )));
        }
        let oracle = Entailment::from_strategy(&config.strategy, classifier, backend)?;
        Self::assemble(oracle, request, config)
    }

    /// Run against a caller-supplied entailment oracle. `config.strategy` is
    /// not consulted; the oracle's own exactness flags flow into the result.
    pub fn with_oracle(
        oracle: &'a dyn EntailmentOracle,
        request: ExplainRequest,
        config: EnumerationConfig,
    ) -> Result<Self> {
        Self::assemble(Entailment::Custom(oracle), request, config)
    }

    fn assemble(oracle: Entailment<'a>, request: ExplainRequest, config: EnumerationConfig) -> Result<Self> {
        request.domains.validate(&request.instance)?;
        let n = request.instance.len();

        Ok(XpEnumerator {
            oracle,
            request,
            config,
            dualizer: HittingSetDualizer::new(n),
            cache: HashMap::new(),
            state: RunState::Running,
            stats: RunStats::default(),
            started: None,
            cancel: CancelToken::new(),
            observer: None,
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Called with the refreshed estimate after every iteration that grew the store.
    pub fn on_progress(mut self, observer: impl FnMut(&Progress) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn dualizer(&self) -> &HittingSetDualizer {
        &self.dualizer
    }

    pub fn request(&self) -> &ExplainRequest {
        &self.request
    }

    /// Current attribution estimate from the AXp's found so far.
    pub fn attribution(&self) -> Attribution {
        ffa::attribution(self.dualizer.axps(), self.num_features())
    }

    /// Drive the loop until it stops.
    pub fn run(&mut self) -> Result<EnumerationOutcome> {
        while self.state == RunState::Running {
            self.step()?;
        }
        let outcome = self.outcome();
        info!(
            "FFA run ended {:?} after {} iterations: {} AXp's, {} CXp's, {} oracle calls",
            outcome.state,
            outcome.stats.iterations,
            outcome.axps.len(),
            outcome.cxps.len(),
            outcome.stats.oracle_calls
        );
        Ok(outcome)
    }

    /// Snapshot of the run so far. `BudgetExpired` stands in while still running.
    pub fn outcome(&self) -> EnumerationOutcome {
        let state = match self.state {
            RunState::Done(state) => state,
            RunState::Running => FinalState::BudgetExpired,
        };
        let mut stats = self.stats.clone();
        stats.elapsed = self.elapsed();
        EnumerationOutcome {
            state,
            axps: self.dualizer.axps().to_vec(),
            cxps: self.dualizer.cxps().to_vec(),
            attribution: self.attribution(),
            stats,
        }
    }

    /// One loop iteration: the loop-top checks, then one query and its follow-ups.
    pub fn step(&mut self) -> Result<RunState> {
        if self.state != RunState::Running {
            return Ok(self.state);
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
            debug!(
                "Explaining class {} over {} features with the {} oracle",
                self.request.target,
                self.num_features(),
                self.oracle.describe()
            );
        }
        if self.cancel.is_cancelled() {
            return Ok(self.finish(FinalState::Cancelled));
        }
        if self.out_of_time() {
            return Ok(self.finish(FinalState::BudgetExpired));
        }
        let Some(free) = self.dualizer.next_unexplained_subset() else {
            return Ok(self.finish(FinalState::Exhausted));
        };

        self.stats.iterations += 1;
        let guess = free.complement(self.num_features());
        let before = (self.dualizer.axps().len(), self.dualizer.cxps().len());
        debug!("Iteration {}: querying free set {}", self.stats.iterations, free);

        match self.explore(free, &guess) {
            Ok(Step::Settled) => {}
            Ok(Step::OutOfTime) => {
                self.finish(FinalState::BudgetExpired);
            }
            Err(err) if err.is_query_local() => {
                warn!("Discarding guess {}: {}", guess, err);
                self.discard(guess);
            }
            Err(err) => return Err(err),
        }

        let after = (self.dualizer.axps().len(), self.dualizer.cxps().len());
        if after != before {
            self.notify();
        }
        Ok(self.state)
    }

    fn explore(&mut self, free: FeatureSubset, guess: &FeatureSubset) -> Result<Step> {
        let contrastive = self.query_cxp(&free)?;
        if self.out_of_time() {
            return Ok(Step::OutOfTime);
        }

        if contrastive.holds {
            let Some((cxp, exactness)) = self.shrink_cxp(free, contrastive.exactness)? else {
                return Ok(Step::OutOfTime);
            };
            if !self.register(ExplanationKind::Contrastive, cxp, exactness)? {
                self.discard(guess.clone());
                return Ok(Step::Settled);
            }
            return self.harvest_axps();
        }

        let abductive = self.query_axp(guess)?;
        if self.out_of_time() {
            return Ok(Step::OutOfTime);
        }
        if abductive.holds {
            let Some((axp, exactness)) = self.shrink_axp(guess.clone(), abductive.exactness)? else {
                return Ok(Step::OutOfTime);
            };
            if !self.register(ExplanationKind::Abductive, axp, exactness)? {
                self.discard(guess.clone());
            }
        } else {
            warn!(
                "Guess {} is neither entailing nor refuted by its complement; discarding",
                guess
            );
            self.discard(guess.clone());
        }
        Ok(Step::Settled)
    }

    /// Drop free features, lowest index first, while a class change stays possible.
    ///
    /// A removal whose query fails locally is not taken; the result is then
    /// only approximately minimal.
    fn shrink_cxp(&mut self, free: FeatureSubset, exactness: Exactness) -> Result<Option<(FeatureSubset, Exactness)>> {
        let mut current = free.clone();
        let mut exactness = exactness;
        for feature in free.iter() {
            let trial = current.without(feature);
            let Some(decision) = Self::settle(self.query_cxp(&trial), &trial)? else {
                exactness = Exactness::Approximate;
                if self.out_of_time() {
                    return Ok(None);
                }
                continue;
            };
            if self.out_of_time() {
                return Ok(None);
            }
            exactness = exactness.and(decision.exactness);
            if decision.holds {
                current = trial;
            }
        }
        Ok(Some((current, exactness)))
    }

    /// Drop fixed features while entailment survives. Removals that would
    /// miss a stored CXp cannot entail and are skipped without a query, so a
    /// minimal hitting set of the CXp family costs no extra calls. Failed
    /// queries keep the feature, as in [`Self::shrink_cxp`].
    fn shrink_axp(&mut self, fixed: FeatureSubset, exactness: Exactness) -> Result<Option<(FeatureSubset, Exactness)>> {
        let cxps = self.dualizer.cxp_family();
        let mut current = fixed.clone();
        let mut exactness = exactness;
        for feature in fixed.iter() {
            let trial = current.without(feature);
            if cxps.iter().any(|c| !trial.intersects(c)) {
                continue;
            }
            let Some(decision) = Self::settle(self.query_axp(&trial), &trial)? else {
                exactness = Exactness::Approximate;
                if self.out_of_time() {
                    return Ok(None);
                }
                continue;
            };
            if self.out_of_time() {
                return Ok(None);
            }
            exactness = exactness.and(decision.exactness);
            if decision.holds {
                current = trial;
            }
        }
        Ok(Some((current, exactness)))
    }

    /// Confirm up to `harvest_limit` minimal hitting sets of the CXp family as AXp's.
    fn harvest_axps(&mut self) -> Result<Step> {
        let family = self.dualizer.cxp_family();
        let candidates: Vec<FeatureSubset> = HittingSets::new(&family)
            .filter(|h| !self.dualizer.is_blocked(h))
            .take(self.config.harvest_limit)
            .collect();

        for candidate in candidates {
            let Some(decision) = Self::settle(self.query_axp(&candidate), &candidate)? else {
                if self.out_of_time() {
                    return Ok(Step::OutOfTime);
                }
                continue;
            };
            if self.out_of_time() {
                return Ok(Step::OutOfTime);
            }
            if decision.holds {
                self.register(ExplanationKind::Abductive, candidate, decision.exactness)?;
            }
        }
        Ok(Step::Settled)
    }

    /// Store an explanation. Returns `false` when it was dropped instead.
    ///
    /// A clash involving an approximate explanation means an approximate
    /// answer was wrong; the newcomer is dropped. A clash between exact
    /// explanations is left to the dualizer, which reports it as fatal.
    fn register(&mut self, kind: ExplanationKind, features: FeatureSubset, exactness: Exactness) -> Result<bool> {
        if let Some(conflict) = self.dualizer.duality_conflict(&features, kind) {
            if !(conflict.exactness.is_exact() && exactness.is_exact()) {
                warn!(
                    "Dropping {:?} {}: contradicts {} under approximate reasoning",
                    kind, features, conflict
                );
                return Ok(false);
            }
        }
        let shown = features.to_string();
        match self.dualizer.add(kind, features, exactness)? {
            Insertion::Added => {
                debug!("Recorded {:?} {} ({:?})", kind, shown, exactness);
                Ok(true)
            }
            Insertion::Subsumed => {
                debug!("{:?} {} is subsumed by a stored explanation", kind, shown);
                Ok(false)
            }
        }
    }

    fn query_cxp(&mut self, free: &FeatureSubset) -> Result<Decision> {
        if self.config.cache_decisions {
            if let Some(decision) = self.cache.get(free) {
                self.stats.cache_hits += 1;
                return Ok(decision.clone());
            }
        }
        self.stats.oracle_calls += 1;
        let ExplainRequest { instance, target, domains } = &self.request;
        let decision = self.oracle.is_cxp_candidate(instance, free, *target, domains)?;
        trace!("CXp query {} -> {} ({:?})", free, decision.holds, decision.exactness);
        if self.config.cache_decisions {
            self.cache.insert(free.clone(), decision.clone());
        }
        Ok(decision)
    }

    fn query_axp(&mut self, fixed: &FeatureSubset) -> Result<Decision> {
        let free = fixed.complement(self.num_features());
        if self.config.cache_decisions {
            if let Some(decision) = self.cache.get(&free) {
                self.stats.cache_hits += 1;
                return Ok(decision.clone().negated());
            }
        }
        self.stats.oracle_calls += 1;
        let ExplainRequest { instance, target, domains } = &self.request;
        let decision = self.oracle.is_axp_candidate(instance, fixed, *target, domains)?;
        trace!("AXp query {} -> {} ({:?})", fixed, decision.holds, decision.exactness);
        if self.config.cache_decisions {
            self.cache.insert(free, decision.clone().negated());
        }
        Ok(decision)
    }

    /// Turns a query-local failure of one query into `None`; other errors pass through.
    fn settle(answer: Result<Decision>, subset: &FeatureSubset) -> Result<Option<Decision>> {
        match answer {
            Ok(decision) => Ok(Some(decision)),
            Err(err) if err.is_query_local() => {
                warn!("Skipping query on {}: {}", subset, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn discard(&mut self, guess: FeatureSubset) {
        self.stats.discarded += 1;
        self.dualizer.discard(guess);
    }

    fn notify(&mut self) {
        if self.observer.is_none() {
            return;
        }
        let progress = Progress {
            iteration: self.stats.iterations,
            axp_count: self.dualizer.axps().len(),
            cxp_count: self.dualizer.cxps().len(),
            attribution: self.attribution(),
        };
        if let Some(observer) = self.observer.as_mut() {
            observer(&progress);
        }
    }

    fn finish(&mut self, state: FinalState) -> RunState {
        self.state = RunState::Done(state);
        self.stats.elapsed = self.elapsed();
        self.state
    }

    fn elapsed(&self) -> Duration {
        self.started.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn out_of_time(&self) -> bool {
        self.elapsed() >= self.config.time_budget
    }

    fn num_features(&self) -> usize {
        self.request.instance.len()
    }
}

/// Explain one prediction with `config`.
pub fn explain(
    classifier: &dyn Classifier,
    request: ExplainRequest,
    config: &EnumerationConfig,
) -> Result<EnumerationOutcome> {
    XpEnumerator::new(classifier, request, config.clone())?.run()
}

/// Explain one prediction of a model that is also its own constraint backend.
pub fn explain_with_backend<M>(model: &M, request: ExplainRequest, config: &EnumerationConfig) -> Result<EnumerationOutcome>
where
    M: Classifier + ConstraintBackend,
{
    XpEnumerator::with_backend(model, model, request, config.clone())?.run()
}

/// Explain one prediction with a caller-supplied entailment oracle.
pub fn explain_with_oracle(
    oracle: &dyn EntailmentOracle,
    request: ExplainRequest,
    config: &EnumerationConfig,
) -> Result<EnumerationOutcome> {
    XpEnumerator::with_oracle(oracle, request, config.clone())?.run()
}

/// Explain independent predictions in parallel, one run per request.
pub fn explain_batch(
    classifier: &dyn Classifier,
    backend: Option<&dyn ConstraintBackend>,
    requests: &[ExplainRequest],
    config: &EnumerationConfig,
) -> Vec<Result<EnumerationOutcome>> {
    requests
        .par_iter()
        .map(|request| {
            let enumerator = match backend {
                Some(backend) => XpEnumerator::with_backend(classifier, backend, request.clone(), config.clone()),
                None => XpEnumerator::new(classifier, request.clone(), config.clone()),
            };
            enumerator?.run()
        })
        .collect()
}
