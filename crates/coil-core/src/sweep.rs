// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Parameter Sweep
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Current search over a core-radius × coil-length grid.
//!
//! Every point is an independent task on a bounded rayon pool. Numeric
//! failures, timeouts and panics stay local to their point and are
//! recorded; only configuration errors abort the sweep, and those are
//! raised before any point runs.

use crate::force::ForceIntegrator;
use crate::search::{CurrentSearch, SearchLimits, SearchOutcome, SearchReport};
use coil_math::cache::{CacheStats, EllipticCache, LocalEllipticCache, SharedEllipticCache};
use coil_types::budget::{Budget, CancelToken};
use coil_types::config::{IntegrationStrategy, SweepAxes, SweepConfig};
use coil_types::error::{CoilError, CoilResult, FailureKind};
use coil_types::geometry::{CoilConstants, Geometry, MagnetGeometry, Material};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// One (core radius, coil length) combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Position in grid order.
    pub index: usize,
    pub core_radius: f64,
    pub coil_length: f64,
}

/// Cartesian product of the two swept axes.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    core_radii: Vec<f64>,
    coil_lengths: Vec<f64>,
}

impl SweepGrid {
    pub fn new(core_radii: Vec<f64>, coil_lengths: Vec<f64>) -> CoilResult<Self> {
        if core_radii.is_empty() || coil_lengths.is_empty() {
            return Err(CoilError::ConfigError("sweep axis is empty".to_string()));
        }
        if let Some(bad) = core_radii
            .iter()
            .chain(coil_lengths.iter())
            .find(|v| !v.is_finite())
        {
            return Err(CoilError::ConfigError(format!(
                "sweep axis contains non-finite value {bad}"
            )));
        }
        Ok(SweepGrid {
            core_radii,
            coil_lengths,
        })
    }

    pub fn from_axes(axes: &SweepAxes) -> CoilResult<Self> {
        Self::new(axes.core_radii.values()?, axes.coil_lengths.values()?)
    }

    pub fn len(&self) -> usize {
        self.core_radii.len() * self.coil_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Points with the core radius as the outer (slow) axis.
    pub fn points(&self) -> Vec<SweepPoint> {
        self.core_radii
            .iter()
            .flat_map(|&core_radius| {
                self.coil_lengths
                    .iter()
                    .map(move |&coil_length| (core_radius, coil_length))
            })
            .enumerate()
            .map(|(index, (core_radius, coil_length))| SweepPoint {
                index,
                core_radius,
                coil_length,
            })
            .collect()
    }
}

/// Solves one sweep point. Implementations are shared by all workers.
pub trait PointSolver: Sync {
    /// Force every point is sized against [N].
    fn target_force(&self) -> f64;

    fn solve(&self, geometry: &Geometry, budget: &Budget) -> CoilResult<SearchReport>;
}

/// Closure adapter for [`PointSolver`].
pub struct SolverFn<F> {
    target: f64,
    solve: F,
}

impl<F> SolverFn<F>
where
    F: Fn(&Geometry, &Budget) -> CoilResult<SearchReport> + Sync,
{
    pub fn new(target: f64, solve: F) -> Self {
        SolverFn { target, solve }
    }
}

impl<F> PointSolver for SolverFn<F>
where
    F: Fn(&Geometry, &Budget) -> CoilResult<SearchReport> + Sync,
{
    fn target_force(&self) -> f64 {
        self.target
    }

    fn solve(&self, geometry: &Geometry, budget: &Budget) -> CoilResult<SearchReport> {
        (self.solve)(geometry, budget)
    }
}

/// Field-model solver: force integration plus current search.
///
/// Each point gets a fresh local cache unless a shared cache is enabled,
/// in which case all points read and fill one concurrent cache.
#[derive(Debug, Clone)]
pub struct ElectromagneticSolver {
    material: Material,
    strategy: IntegrationStrategy,
    fd_step: Option<f64>,
    limits: SearchLimits,
    target: f64,
    shared_cache: Option<Arc<SharedEllipticCache>>,
}

impl ElectromagneticSolver {
    pub fn new(
        magnet: &MagnetGeometry,
        material: Material,
        strategy: IntegrationStrategy,
        limits: SearchLimits,
    ) -> CoilResult<Self> {
        material.validate()?;
        strategy.validate()?;
        let target = material.target_force(magnet)?;
        Ok(ElectromagneticSolver {
            material,
            strategy,
            fd_step: None,
            limits,
            target,
            shared_cache: None,
        })
    }

    pub fn from_config(config: &SweepConfig) -> CoilResult<Self> {
        let solver = Self::new(
            &config.magnet,
            config.material,
            config.integration.strategy,
            SearchLimits::from_config(&config.search)?,
        )?
        .with_fd_step(config.integration.fd_step);
        Ok(if config.sweep.shared_cache {
            solver.with_shared_cache()
        } else {
            solver
        })
    }

    pub fn with_fd_step(mut self, fd_step: Option<f64>) -> Self {
        self.fd_step = fd_step;
        self
    }

    pub fn with_shared_cache(mut self) -> Self {
        self.shared_cache = Some(Arc::new(SharedEllipticCache::new()));
        self
    }

    /// Statistics of the shared cache, when one is in use.
    pub fn shared_cache_stats(&self) -> Option<CacheStats> {
        self.shared_cache.as_ref().map(|c| c.stats())
    }

    fn search_with<C: EllipticCache>(
        &self,
        geometry: &Geometry,
        cache: C,
        budget: &Budget,
    ) -> CoilResult<SearchReport> {
        let integrator =
            ForceIntegrator::new(geometry, &self.material, self.strategy, cache, self.fd_step)?
                .with_budget(budget.clone());
        CurrentSearch::new(self.target, self.limits)?
            .with_budget(budget.clone())
            .run(&integrator)
    }
}

impl PointSolver for ElectromagneticSolver {
    fn target_force(&self) -> f64 {
        self.target
    }

    fn solve(&self, geometry: &Geometry, budget: &Budget) -> CoilResult<SearchReport> {
        match &self.shared_cache {
            Some(cache) => self.search_with(geometry, Arc::clone(cache), budget),
            None => self.search_with(geometry, LocalEllipticCache::new(), budget),
        }
    }
}

/// Result of one sweep point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PointOutcome {
    Found { current: f64, force: f64 },
    NotFound { last_current: f64, last_force: f64 },
    Failed { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub core_radius: f64,
    pub coil_length: f64,
    pub turns_per_layer: usize,
    pub layer_count: usize,
    pub target_force: f64,
    /// Trials evaluated; zero for failed points.
    pub trials: usize,
    /// Mid-plane field at the last trial current [T], when the solver
    /// reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_plane_field: Option<f64>,
    pub outcome: PointOutcome,
}

impl SweepRecord {
    pub fn current(&self) -> Option<f64> {
        match self.outcome {
            PointOutcome::Found { current, .. } => Some(current),
            _ => None,
        }
    }

    /// Force reached by the last trial, if the search ran to completion.
    pub fn achieved_force(&self) -> Option<f64> {
        match self.outcome {
            PointOutcome::Found { force, .. } => Some(force),
            PointOutcome::NotFound { last_force, .. } => Some(last_force),
            PointOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.outcome {
            PointOutcome::Failed { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepCounts {
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// All records of a sweep, in grid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub run_name: String,
    pub target_force: f64,
    pub records: Vec<SweepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

impl SweepReport {
    pub fn counts(&self) -> SweepCounts {
        self.records
            .iter()
            .fold(SweepCounts::default(), |mut acc, r| {
                match r.outcome {
                    PointOutcome::Found { .. } => acc.found += 1,
                    PointOutcome::NotFound { .. } => acc.not_found += 1,
                    PointOutcome::Failed { .. } => acc.failed += 1,
                }
                acc
            })
    }

    /// Records grouped by core radius in order of first appearance, each
    /// group sorted by turns per layer.
    pub fn grouped_by_core_radius(&self) -> Vec<(f64, Vec<&SweepRecord>)> {
        let mut groups: Vec<(f64, Vec<&SweepRecord>)> = Vec::new();
        for record in &self.records {
            match groups
                .iter_mut()
                .find(|(r, _)| r.to_bits() == record.core_radius.to_bits())
            {
                Some((_, members)) => members.push(record),
                None => groups.push((record.core_radius, vec![record])),
            }
        }
        for (_, members) in &mut groups {
            members.sort_by_key(|r| r.turns_per_layer);
        }
        groups
    }

    /// Stable in-place reorder of the records.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&SweepRecord, &SweepRecord) -> Ordering,
    {
        self.records.sort_by(compare);
    }
}

/// Scheduling options of a sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepOptions {
    /// Worker threads; rayon's default when `None`.
    pub workers: Option<usize>,
    /// Wall-clock budget of each point.
    pub point_timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl SweepOptions {
    pub fn from_axes(axes: &SweepAxes) -> Self {
        SweepOptions {
            workers: axes.workers,
            point_timeout: axes
                .point_timeout_secs
                .and_then(|t| Duration::try_from_secs_f64(t).ok()),
            cancel: None,
        }
    }
}

#[derive(Debug)]
pub struct ParameterSweep<S> {
    run_name: String,
    points: Vec<(SweepPoint, Geometry)>,
    solver: S,
    options: SweepOptions,
}

impl ParameterSweep<ElectromagneticSolver> {
    /// Sweep of the field-model solver described by `config`.
    pub fn from_config(config: &SweepConfig) -> CoilResult<Self> {
        config.validate()?;
        let grid = SweepGrid::from_axes(&config.sweep)?;
        let solver = ElectromagneticSolver::from_config(config)?;
        Ok(ParameterSweep::new(
            &grid,
            config.coil,
            config.magnet,
            solver,
            SweepOptions::from_axes(&config.sweep),
        )?
        .with_run_name(&config.run_name))
    }
}

impl<S: PointSolver> ParameterSweep<S> {
    /// Validate every grid point and the options before any work starts.
    pub fn new(
        grid: &SweepGrid,
        coil: CoilConstants,
        magnet: MagnetGeometry,
        solver: S,
        options: SweepOptions,
    ) -> CoilResult<Self> {
        if options.workers == Some(0) {
            return Err(CoilError::ConfigError("workers must be >= 1".to_string()));
        }
        let target = solver.target_force();
        if !target.is_finite() || target <= 0.0 {
            return Err(CoilError::ConfigError(format!(
                "target force must be finite and > 0, got {target}"
            )));
        }
        let points = grid
            .points()
            .into_iter()
            .map(|p| Ok((p, Geometry::new(p.core_radius, p.coil_length, coil, magnet)?)))
            .collect::<CoilResult<Vec<_>>>()?;
        Ok(ParameterSweep {
            run_name: "solenoid-sweep".to_string(),
            points,
            solver,
            options,
        })
    }

    pub fn with_run_name(mut self, name: &str) -> Self {
        self.run_name = name.to_string();
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.options.cancel = Some(token);
        self
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Run every point. Records come back in grid order whatever order the
    /// workers finish in.
    pub fn run(&self) -> CoilResult<SweepReport> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.options.workers {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| CoilError::WorkerFailure(format!("thread pool: {e}")))?;

        let records = pool.install(|| {
            self.points
                .par_iter()
                .map(|(_, geometry)| self.run_point(geometry))
                .collect::<Vec<_>>()
        });

        Ok(SweepReport {
            run_name: self.run_name.clone(),
            target_force: self.solver.target_force(),
            records,
            cache: None,
        })
    }

    fn run_point(&self, geometry: &Geometry) -> SweepRecord {
        let layout = geometry.layout();
        let target = self.solver.target_force();
        let record = |trials: usize, outcome: PointOutcome| SweepRecord {
            core_radius: geometry.core_radius,
            coil_length: geometry.coil_length,
            turns_per_layer: layout.turns_per_layer,
            layer_count: layout.layer_count,
            target_force: target,
            trials,
            mid_plane_field: None,
            outcome,
        };

        let cancel = self.options.cancel.clone();
        if cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return record(0, failed(&CoilError::Cancelled));
        }
        let budget = Budget::new(self.options.point_timeout, cancel);

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.solver.solve(geometry, &budget)));
        match result {
            Ok(Ok(report)) => {
                let outcome = match report.outcome {
                    SearchOutcome::Found { current, force } => PointOutcome::Found { current, force },
                    SearchOutcome::Exhausted {
                        last_current,
                        last_force,
                    } => PointOutcome::NotFound {
                        last_current,
                        last_force,
                    },
                };
                SweepRecord {
                    mid_plane_field: report.history.last().and_then(|t| t.field),
                    ..record(report.trials(), outcome)
                }
            }
            Ok(Err(CoilError::SearchExhausted {
                last_current,
                last_force,
                ..
            })) => record(
                0,
                PointOutcome::NotFound {
                    last_current,
                    last_force,
                },
            ),
            Ok(Err(e)) => record(0, failed(&e)),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "worker panicked".to_string());
                record(0, failed(&CoilError::WorkerFailure(message)))
            }
        }
    }
}

fn failed(e: &CoilError) -> PointOutcome {
    PointOutcome::Failed {
        kind: e.failure_kind(),
        message: e.to_string(),
    }
}
