// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Current Search
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Step-quantised search for the smallest drive current meeting a force.
//!
//! Trial currents are `k · increment` for k = 1, 2, …, so the result is
//! always a whole multiple of the increment and overestimates the exact
//! root by less than one step. The search stops at the first trial with
//! `|F| ≥ target` or after the trial ceiling.

use crate::force::ForceIntegrator;
use coil_math::cache::EllipticCache;
use coil_types::budget::Budget;
use coil_types::config::SearchConfig;
use coil_types::error::{CoilError, CoilResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Anything that maps a drive current to a signed axial force.
pub trait ForceModel {
    fn force(&self, current: f64) -> CoilResult<f64>;

    /// Diagnostic field at the load [T] recorded next to each trial.
    fn field(&self, _current: f64) -> CoilResult<Option<f64>> {
        Ok(None)
    }
}

impl<C: EllipticCache> ForceModel for ForceIntegrator<C> {
    fn force(&self, current: f64) -> CoilResult<f64> {
        self.total_force(current)
    }

    /// Radially weighted mid-plane field of the magnet.
    fn field(&self, current: f64) -> CoilResult<Option<f64>> {
        self.average_field(current).map(Some)
    }
}

impl<M: ForceModel + ?Sized> ForceModel for &M {
    fn force(&self, current: f64) -> CoilResult<f64> {
        (**self).force(current)
    }

    fn field(&self, current: f64) -> CoilResult<Option<f64>> {
        (**self).field(current)
    }
}

/// Closure adapter, mostly for tests and quick studies.
#[derive(Debug, Clone, Copy)]
pub struct ForceFn<F>(pub F);

impl<F> ForceModel for ForceFn<F>
where
    F: Fn(f64) -> CoilResult<f64>,
{
    fn force(&self, current: f64) -> CoilResult<f64> {
        (self.0)(current)
    }
}

/// Step size and ceiling of a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchLimits {
    increment: f64,
    max_iterations: usize,
    max_current: Option<f64>,
}

impl SearchLimits {
    pub fn new(increment: f64, max_iterations: usize) -> CoilResult<Self> {
        if !increment.is_finite() || increment <= 0.0 {
            return Err(CoilError::ConfigError(format!(
                "current increment must be finite and > 0, got {increment}"
            )));
        }
        if max_iterations == 0 {
            return Err(CoilError::ConfigError(
                "search max_iterations must be >= 1".to_string(),
            ));
        }
        Ok(SearchLimits {
            increment,
            max_iterations,
            max_current: None,
        })
    }

    /// Additional ceiling on the trial current itself.
    pub fn with_max_current(mut self, max_current: f64) -> CoilResult<Self> {
        if !max_current.is_finite() || max_current < self.increment {
            return Err(CoilError::ConfigError(format!(
                "max current must be finite and >= one increment ({}), got {max_current}",
                self.increment
            )));
        }
        self.max_current = Some(max_current);
        Ok(self)
    }

    pub fn from_config(config: &SearchConfig) -> CoilResult<Self> {
        let limits = Self::new(config.current_increment, config.max_iterations)?;
        match config.max_current {
            Some(cap) => limits.with_max_current(cap),
            None => Ok(limits),
        }
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Current of the `k`-th trial, k ≥ 1. Computed as a product so that
    /// no rounding accumulates across steps.
    pub fn candidate(&self, k: usize) -> f64 {
        self.increment * k as f64
    }

    /// Number of trials the search may run.
    pub fn max_trials(&self) -> usize {
        match self.max_current {
            Some(cap) => {
                let by_current = (cap / self.increment + 1e-9).floor() as usize;
                by_current.min(self.max_iterations)
            }
            None => self.max_iterations,
        }
    }
}

/// One evaluated trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchTrial {
    pub current: f64,
    pub force: f64,
    /// Mid-plane field [T], when the model provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<f64>,
}

/// Terminal state of a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found { current: f64, force: f64 },
    Exhausted { last_current: f64, last_force: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub target: f64,
    pub outcome: SearchOutcome,
    /// Every trial in the order a sequential search visits them.
    pub history: Vec<SearchTrial>,
}

impl SearchReport {
    pub fn trials(&self) -> usize {
        self.history.len()
    }

    pub fn is_found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found { .. })
    }

    pub fn current(&self) -> Option<f64> {
        match self.outcome {
            SearchOutcome::Found { current, .. } => Some(current),
            SearchOutcome::Exhausted { .. } => None,
        }
    }

    /// The found current, or `SearchExhausted`.
    pub fn require_current(&self) -> CoilResult<f64> {
        match self.outcome {
            SearchOutcome::Found { current, .. } => Ok(current),
            SearchOutcome::Exhausted {
                last_current,
                last_force,
            } => Err(CoilError::SearchExhausted {
                last_current,
                last_force,
                target: self.target,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CurrentSearch {
    target: f64,
    limits: SearchLimits,
    budget: Budget,
}

impl CurrentSearch {
    pub fn new(target: f64, limits: SearchLimits) -> CoilResult<Self> {
        if !target.is_finite() || target <= 0.0 {
            return Err(CoilError::ConfigError(format!(
                "target force must be finite and > 0, got {target}"
            )));
        }
        Ok(CurrentSearch {
            target,
            limits,
            budget: Budget::unlimited(),
        })
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    fn trial<M: ForceModel + ?Sized>(&self, model: &M, k: usize) -> CoilResult<SearchTrial> {
        let current = self.limits.candidate(k);
        let force = model.force(current)?;
        if !force.is_finite() {
            return Err(CoilError::IntegrationError(format!(
                "non-finite force {force} at I={current}"
            )));
        }
        let field = model.field(current)?;
        Ok(SearchTrial {
            current,
            force,
            field,
        })
    }

    fn finish(&self, history: Vec<SearchTrial>) -> SearchReport {
        let outcome = match history.last() {
            Some(t) if t.force.abs() >= self.target => SearchOutcome::Found {
                current: t.current,
                force: t.force,
            },
            Some(t) => SearchOutcome::Exhausted {
                last_current: t.current,
                last_force: t.force,
            },
            None => SearchOutcome::Exhausted {
                last_current: 0.0,
                last_force: 0.0,
            },
        };
        SearchReport {
            target: self.target,
            outcome,
            history,
        }
    }

    /// Sequential search: one trial at a time, in increasing current.
    pub fn run<M: ForceModel + ?Sized>(&self, model: &M) -> CoilResult<SearchReport> {
        let mut history = Vec::new();
        for k in 1..=self.limits.max_trials() {
            self.budget.check()?;
            let trial = self.trial(model, k)?;
            history.push(trial);
            if trial.force.abs() >= self.target {
                break;
            }
        }
        Ok(self.finish(history))
    }

    /// Search that evaluates `batch` consecutive candidates in parallel.
    ///
    /// Trials after the first success in a batch are discarded, so the
    /// report, history included, equals that of [`run`](Self::run).
    pub fn run_batched<M>(&self, model: &M, batch: usize) -> CoilResult<SearchReport>
    where
        M: ForceModel + Sync + ?Sized,
    {
        let batch = batch.max(1);
        let max_trials = self.limits.max_trials();
        let mut history = Vec::new();
        let mut next = 1;
        while next <= max_trials {
            self.budget.check()?;
            let last = (next + batch - 1).min(max_trials);
            let results: Vec<CoilResult<SearchTrial>> = (next..=last)
                .into_par_iter()
                .map(|k| self.trial(model, k))
                .collect();
            for result in results {
                let trial = result?;
                history.push(trial);
                if trial.force.abs() >= self.target {
                    return Ok(self.finish(history));
                }
            }
            next = last + 1;
        }
        Ok(self.finish(history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::force::ForceIntegrator;
    use coil_math::cache::{LocalEllipticCache, SharedEllipticCache};
    use coil_types::budget::CancelToken;
    use coil_types::config::IntegrationStrategy;
    use coil_types::geometry::{CoilConstants, Geometry, MagnetGeometry, Material};
    use std::time::Duration;

    fn linear(k: f64) -> ForceFn<impl Fn(f64) -> CoilResult<f64>> {
        ForceFn(move |i: f64| Ok(k * i))
    }

    fn limits() -> SearchLimits {
        SearchLimits::new(0.2, 10_000).unwrap()
    }

    #[test]
    fn test_linear_stub_finds_first_multiple() {
        let search = CurrentSearch::new(50.0, limits()).unwrap();
        let report = search.run(&linear(10.0)).unwrap();
        assert_eq!(report.current(), Some(5.0));
        assert_eq!(report.trials(), 25);
        assert_eq!(report.require_current().unwrap(), 5.0);
    }

    #[test]
    fn test_closure_model_records_no_field() {
        let search = CurrentSearch::new(1.0, limits()).unwrap();
        let report = search.run(&linear(1.0)).unwrap();
        assert!(report.history.iter().all(|t| t.field.is_none()));
        let json = serde_json::to_string(&report.history[0]).unwrap();
        assert!(!json.contains("field"), "{json}");
    }

    #[test]
    fn test_history_strictly_increasing() {
        let search = CurrentSearch::new(7.3, limits()).unwrap();
        let report = search.run(&linear(1.0)).unwrap();
        for pair in report.history.windows(2) {
            assert!(pair[1].current > pair[0].current);
        }
        let current = report.current().unwrap();
        assert!(current >= 7.3 && current - 0.2 < 7.3);
    }

    #[test]
    fn test_negative_force_counts_by_magnitude() {
        let search = CurrentSearch::new(50.0, limits()).unwrap();
        let report = search.run(&linear(-10.0)).unwrap();
        assert_eq!(report.current(), Some(5.0));
        assert!(matches!(
            report.outcome,
            SearchOutcome::Found { force, .. } if force == -50.0
        ));
    }

    #[test]
    fn test_zero_force_exhausts() {
        let search = CurrentSearch::new(1.0, SearchLimits::new(0.2, 50).unwrap()).unwrap();
        let report = search.run(&linear(0.0)).unwrap();
        assert_eq!(report.trials(), 50);
        assert!(!report.is_found());
        match report.require_current() {
            Err(CoilError::SearchExhausted { last_current, .. }) => {
                assert!((last_current - 10.0).abs() < 1e-12)
            }
            other => panic!("expected SearchExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_max_current_caps_trials() {
        let limits = SearchLimits::new(0.2, 10_000)
            .unwrap()
            .with_max_current(3.0)
            .unwrap();
        assert_eq!(limits.max_trials(), 15);
        let report = CurrentSearch::new(1e6, limits)
            .unwrap()
            .run(&linear(1.0))
            .unwrap();
        assert_eq!(report.trials(), 15);
        assert!(SearchLimits::new(0.2, 10).unwrap().with_max_current(0.1).is_err());
    }

    #[test]
    fn test_from_config() {
        let cfg = SearchConfig {
            current_increment: 0.5,
            max_iterations: 7,
            max_current: None,
        };
        let limits = SearchLimits::from_config(&cfg).unwrap();
        assert_eq!(limits.max_trials(), 7);
        assert_eq!(limits.candidate(3), 1.5);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(SearchLimits::new(0.0, 10).is_err());
        assert!(SearchLimits::new(f64::NAN, 10).is_err());
        assert!(SearchLimits::new(0.2, 0).is_err());
        assert!(CurrentSearch::new(0.0, limits()).is_err());
        assert!(CurrentSearch::new(f64::INFINITY, limits()).is_err());
    }

    #[test]
    fn test_batched_matches_sequential() {
        let model = linear(3.7);
        let search = CurrentSearch::new(41.0, limits()).unwrap();
        let sequential = search.run(&model).unwrap();
        for batch in [1, 2, 3, 7, 64, 1000] {
            let batched = search.run_batched(&model, batch).unwrap();
            assert_eq!(batched, sequential, "batch {batch}");
        }
        let exhausted = CurrentSearch::new(1.0, SearchLimits::new(0.2, 23).unwrap()).unwrap();
        assert_eq!(
            exhausted.run_batched(&linear(0.0), 5).unwrap(),
            exhausted.run(&linear(0.0)).unwrap()
        );
    }

    #[test]
    fn test_error_after_success_is_ignored_in_batch() {
        // Trials beyond the first success are discarded even if they fail.
        let model = ForceFn(|i: f64| {
            if i > 1.1 {
                Err(CoilError::IntegrationError("past the root".into()))
            } else {
                Ok(10.0 * i)
            }
        });
        let search = CurrentSearch::new(10.0, limits()).unwrap();
        let report = search.run_batched(&model, 8).unwrap();
        assert_eq!(report.current(), Some(1.0));
    }

    #[test]
    fn test_model_error_propagates() {
        let model = ForceFn(|i: f64| {
            if i > 1.1 {
                Err(CoilError::IntegrationError("boom".into()))
            } else {
                Ok(0.0)
            }
        });
        let search = CurrentSearch::new(1.0, limits()).unwrap();
        assert!(matches!(search.run(&model), Err(CoilError::IntegrationError(_))));
        assert!(matches!(
            search.run_batched(&model, 4),
            Err(CoilError::IntegrationError(_))
        ));
    }

    #[test]
    fn test_non_finite_force_is_error() {
        let search = CurrentSearch::new(1.0, limits()).unwrap();
        let res = search.run(&ForceFn(|_: f64| Ok(f64::NAN)));
        assert!(matches!(res, Err(CoilError::IntegrationError(_))));
    }

    #[test]
    fn test_budget_cancel_and_timeout() {
        let token = CancelToken::new();
        token.cancel();
        let cancelled = CurrentSearch::new(1.0, limits())
            .unwrap()
            .with_budget(Budget::new(None, Some(token)));
        assert!(matches!(cancelled.run(&linear(0.0)), Err(CoilError::Cancelled)));

        let expired = CurrentSearch::new(1.0, limits())
            .unwrap()
            .with_budget(Budget::new(Some(Duration::ZERO), None));
        assert!(matches!(
            expired.run_batched(&linear(0.0), 4),
            Err(CoilError::Timeout { .. })
        ));
    }

    fn coarse_geometry(core_radius: f64) -> Geometry {
        let coil = CoilConstants {
            wire_thickness: 0.005,
            ..CoilConstants::default()
        };
        let magnet = MagnetGeometry {
            inner_radius: 0.015,
            outer_radius: 0.03,
            thickness: 0.01,
        };
        Geometry::new(core_radius, 0.06, coil, magnet).unwrap()
    }

    #[test]
    fn test_search_over_real_integrator() {
        // ≈0.0389 N/A, so 0.1 N first holds at 2.6 A.
        let fi = ForceIntegrator::new(
            &coarse_geometry(0.01),
            &Material::default(),
            IntegrationStrategy::fixed_grid(),
            LocalEllipticCache::new(),
            None,
        )
        .unwrap();
        let report = CurrentSearch::new(0.1, limits()).unwrap().run(&fi).unwrap();
        let current = report.current().unwrap();
        assert!((current - 2.6).abs() < 1e-12, "current = {current}");
        assert_eq!(report.trials(), 13);
        // Mid-plane field is recorded per trial and scales with the current.
        let first = report.history[0].field.unwrap();
        let last = report.history[12].field.unwrap();
        assert!(first.is_finite() && first != 0.0);
        assert!((last / first - 13.0).abs() < 1e-9, "{first} -> {last}");
    }

    #[test]
    fn test_batched_over_shared_cache_integrator() {
        let fi = ForceIntegrator::new(
            &coarse_geometry(0.01),
            &Material::default(),
            IntegrationStrategy::fixed_grid(),
            SharedEllipticCache::new(),
            None,
        )
        .unwrap();
        let search = CurrentSearch::new(0.1, limits()).unwrap();
        let batched = search.run_batched(&fi, 4).unwrap();
        assert_eq!(batched, search.run(&fi).unwrap());
    }

    #[test]
    fn test_max_winding_core_exhausts() {
        let fi = ForceIntegrator::new(
            &coarse_geometry(0.04),
            &Material::default(),
            IntegrationStrategy::default(),
            LocalEllipticCache::new(),
            None,
        )
        .unwrap();
        let search = CurrentSearch::new(16.0, SearchLimits::new(0.2, 200).unwrap()).unwrap();
        let report = search.run(&fi).unwrap();
        assert!(!report.is_found());
        assert_eq!(report.trials(), 200);
        assert!(report.history.iter().all(|t| t.force == 0.0));
    }
}
