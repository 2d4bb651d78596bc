//! # Performance analyzer
//!
//! Fan-in of the solver runs: every profile that covers enough of the reference domain is resampled
//! onto one common uniform grid (linear interpolation, no extrapolation) and compared pointwise
//! against the reference and against every other compared method.
//!
//! Relative errors are normalized by `max|h_ref|` on the common grid (a pointwise division would
//! blow up at the far boundary where `h = 0`). Methods carrying a soft flag keep their metrics but
//! do not enter the accuracy ranking; the speed ranking lists every run, failed ones included.
use crate::numerical::Analysis::interpolation::resample;
use crate::numerical::Cornea_problem::uniform_grid;
use crate::numerical::Solver_api::{Method, Profile, SoftFlag, SolverFailure, SolverResult};
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub reference: Method,
    /// fraction of the reference domain a profile has to cover
    pub min_coverage: f64,
    /// number of nodes of the common grid
    pub resolution: usize,
    /// max relative error above which a method gets the `LargeError` flag
    pub large_error_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference: Method::MOL,
            min_coverage: 0.95,
            resolution: 201,
            large_error_threshold: 0.05,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> CorneaResult<()> {
        if self.resolution < 2 {
            return Err(CorneaError::InvalidParameters(format!(
                "the common grid needs at least 2 nodes, got {}",
                self.resolution
            )));
        }
        if !(self.min_coverage > 0.0 && self.min_coverage <= 1.0) {
            return Err(CorneaError::InvalidParameters(format!(
                "required coverage must lie in (0, 1], got {}",
                self.min_coverage
            )));
        }
        if !(self.large_error_threshold > 0.0) {
            return Err(CorneaError::InvalidParameters(format!(
                "large error threshold must be positive, got {}",
                self.large_error_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ErrorStats {
    pub max_abs: f64,
    pub mean_abs: f64,
    pub rmse: f64,
    pub max_rel: f64,
}

impl ErrorStats {
    /// Pointwise absolute and relative (`|h - h_other| / scale`) errors and their summary.
    pub fn between(h: &[f64], h_other: &[f64], scale: f64) -> (Vec<f64>, Vec<f64>, ErrorStats) {
        let abs_error: Vec<f64> = h
            .iter()
            .zip(h_other.iter())
            .map(|(a, b)| (a - b).abs())
            .collect();
        let rel_error: Vec<f64> = abs_error.iter().map(|e| e / scale).collect();
        let n = abs_error.len().max(1) as f64;
        let max_abs = abs_error.iter().fold(0.0_f64, |m, e| m.max(*e));
        let stats = ErrorStats {
            max_abs,
            mean_abs: abs_error.iter().sum::<f64>() / n,
            rmse: (abs_error.iter().map(|e| e * e).sum::<f64>() / n).sqrt(),
            max_rel: max_abs / scale,
        };
        (abs_error, rel_error, stats)
    }
}

/// pointwise errors of one method against the reference on the common grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodErrors {
    pub abs_error: Vec<f64>,
    pub rel_error: Vec<f64>,
    pub stats: ErrorStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseErrors {
    pub first: Method,
    pub second: Method,
    pub stats: ErrorStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pub method: Method,
    pub coverage: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Reference,
    Compared,
    Flagged,
    Excluded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub wall_time: f64,
    pub status: RunStatus,
    /// diagnostics digest, failure message or exclusion reason
    pub note: String,
}

/// one line of the comparison table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub method: Method,
    pub max_abs: Option<f64>,
    pub mean_abs: Option<f64>,
    pub rmse: Option<f64>,
    pub max_rel: Option<f64>,
    pub wall_time: f64,
    pub status: RunStatus,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub reference: Method,
    pub grid: Vec<f64>,
    pub profiles_on_grid: BTreeMap<Method, Vec<f64>>,
    pub errors: BTreeMap<Method, MethodErrors>,
    pub pairwise_errors: Vec<PairwiseErrors>,
    /// (method, rmse), ascending
    pub accuracy_ranking: Vec<(Method, f64)>,
    /// (method, wall time in seconds), ascending
    pub speed_ranking: Vec<(Method, f64)>,
    pub excluded: Vec<Exclusion>,
    pub flags: BTreeMap<Method, Vec<SoftFlag>>,
    pub runs: BTreeMap<Method, RunSummary>,
}

/// Share of the reference domain covered by `profile`.
pub fn coverage(reference: &Profile, profile: &Profile) -> f64 {
    let length = reference.x_max() - reference.x_min();
    let overlap =
        profile.x_max().min(reference.x_max()) - profile.x_min().max(reference.x_min());
    (overlap / length).max(0.0)
}

pub struct PerformanceAnalyzer {
    pub config: AnalysisConfig,
}

impl PerformanceAnalyzer {
    pub fn new(config: AnalysisConfig) -> CorneaResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn analyze(
        &self,
        results: &BTreeMap<Method, SolverResult>,
        failures: &BTreeMap<Method, SolverFailure>,
    ) -> CorneaResult<ComparisonReport> {
        let cfg = &self.config;
        let reference = results
            .get(&cfg.reference)
            .ok_or(CorneaError::MissingReference(cfg.reference))?;
        info!(
            "analyzing {} results against {} ({} failed runs)",
            results.len(),
            cfg.reference,
            failures.len()
        );

        let mut runs: BTreeMap<Method, RunSummary> = BTreeMap::new();
        let mut excluded = Vec::new();
        let mut compared: Vec<&SolverResult> = vec![reference];
        for (method, result) in results.iter().filter(|(m, _)| **m != cfg.reference) {
            let cov = coverage(&reference.profile, &result.profile);
            if cov < cfg.min_coverage {
                let err = CorneaError::IncompatibleDomains {
                    method: *method,
                    coverage: cov,
                    required: cfg.min_coverage,
                };
                warn!("{} excluded from the comparison: {}", method, err);
                runs.insert(
                    *method,
                    RunSummary {
                        wall_time: result.wall_time,
                        status: RunStatus::Excluded,
                        note: err.to_string(),
                    },
                );
                excluded.push(Exclusion {
                    method: *method,
                    coverage: cov,
                    reason: err.to_string(),
                });
                continue;
            }
            compared.push(result);
        }

        // intersection of the compared domains
        let lo = compared
            .iter()
            .map(|r| r.profile.x_min())
            .fold(f64::NEG_INFINITY, f64::max);
        let hi = compared
            .iter()
            .map(|r| r.profile.x_max())
            .fold(f64::INFINITY, f64::min);
        if !(hi > lo) {
            return Err(CorneaError::InvalidProfile(format!(
                "compared profiles have no common domain: [{}, {}]",
                lo, hi
            )));
        }
        let grid = uniform_grid(lo, hi, cfg.resolution);

        let mut profiles_on_grid = BTreeMap::new();
        for result in &compared {
            profiles_on_grid.insert(result.method, resample(&result.profile, &grid)?);
        }
        let h_ref = &profiles_on_grid[&cfg.reference];
        let h_scale = h_ref.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        // an identically flat reference leaves absolute errors only
        let scale = if h_scale > 0.0 { h_scale } else { 1.0 };

        let mut errors = BTreeMap::new();
        for (method, h) in &profiles_on_grid {
            let (abs_error, rel_error, stats) = ErrorStats::between(h, h_ref, scale);
            errors.insert(
                *method,
                MethodErrors {
                    abs_error,
                    rel_error,
                    stats,
                },
            );
        }

        let mut flags: BTreeMap<Method, Vec<SoftFlag>> = BTreeMap::new();
        for result in results.values() {
            if result.is_flagged() {
                flags.insert(result.method, result.flags.clone());
            }
        }
        for (method, errs) in &errors {
            if errs.stats.max_rel > cfg.large_error_threshold {
                warn!(
                    "{} deviates from the reference by {:.3e} (relative), flagged",
                    method, errs.stats.max_rel
                );
                flags.entry(*method).or_default().push(SoftFlag::LargeError {
                    max_rel: errs.stats.max_rel,
                    threshold: cfg.large_error_threshold,
                });
            }
        }

        let pairwise_errors = profiles_on_grid
            .iter()
            .tuple_combinations()
            .map(|((m1, h1), (m2, h2))| PairwiseErrors {
                first: *m1,
                second: *m2,
                stats: ErrorStats::between(h1, h2, scale).2,
            })
            .collect();

        let mut accuracy_ranking: Vec<(Method, f64)> = errors
            .iter()
            .filter(|(m, _)| !flags.contains_key(*m) || **m == cfg.reference)
            .map(|(m, e)| (*m, e.stats.rmse))
            .collect();
        accuracy_ranking.sort_by(|(m1, e1), (m2, e2)| {
            (*m1 != cfg.reference)
                .cmp(&(*m2 != cfg.reference))
                .then(e1.total_cmp(e2))
        });

        let mut speed_ranking: Vec<(Method, f64)> = results
            .values()
            .map(|r| (r.method, r.wall_time))
            .chain(failures.values().map(|f| (f.method, f.wall_time)))
            .collect();
        speed_ranking.sort_by(|(_, t1), (_, t2)| t1.total_cmp(t2));

        for result in &compared {
            let status = if result.method == cfg.reference {
                RunStatus::Reference
            } else if flags.contains_key(&result.method) {
                RunStatus::Flagged
            } else {
                RunStatus::Compared
            };
            let mut note = result.diagnostics.summary();
            if let Some(method_flags) = flags.get(&result.method) {
                for flag in method_flags {
                    note.push_str(&format!("; {}", flag_note(flag)));
                }
            }
            runs.insert(
                result.method,
                RunSummary {
                    wall_time: result.wall_time,
                    status,
                    note,
                },
            );
        }
        for failure in failures.values() {
            runs.insert(
                failure.method,
                RunSummary {
                    wall_time: failure.wall_time,
                    status: RunStatus::Failed,
                    note: failure.error.to_string(),
                },
            );
        }

        let report = ComparisonReport {
            reference: cfg.reference,
            grid,
            profiles_on_grid,
            errors,
            pairwise_errors,
            accuracy_ranking,
            speed_ranking,
            excluded,
            flags,
            runs,
        };
        report.log_tables();
        Ok(report)
    }
}

fn flag_note(flag: &SoftFlag) -> String {
    match flag {
        SoftFlag::TrainingDivergence {
            epochs, best_loss, ..
        } => format!(
            "training diverged after {} epochs (best loss {:.2e})",
            epochs, best_loss
        ),
        SoftFlag::LargeError { max_rel, threshold } => {
            format!("max relative error {:.2e} > {:.2e}", max_rel, threshold)
        }
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{:.3e}", v)).unwrap_or_else(|| "-".to_string())
}

impl ComparisonReport {
    pub fn stats(&self, method: Method) -> Option<&ErrorStats> {
        self.errors.get(&method).map(|e| &e.stats)
    }

    /// order of the two methods does not matter
    pub fn pairwise(&self, a: Method, b: Method) -> Option<&ErrorStats> {
        self.pairwise_errors
            .iter()
            .find(|p| (p.first == a && p.second == b) || (p.first == b && p.second == a))
            .map(|p| &p.stats)
    }

    pub fn is_flagged(&self, method: Method) -> bool {
        self.flags.contains_key(&method)
    }

    /// every run, ordered by method
    pub fn comparison_rows(&self) -> Vec<ComparisonRow> {
        self.runs
            .iter()
            .map(|(method, run)| {
                let stats = self.stats(*method);
                ComparisonRow {
                    method: *method,
                    max_abs: stats.map(|s| s.max_abs),
                    mean_abs: stats.map(|s| s.mean_abs),
                    rmse: stats.map(|s| s.rmse),
                    max_rel: stats.map(|s| s.max_rel),
                    wall_time: run.wall_time,
                    status: run.status,
                    note: run.note.clone(),
                }
            })
            .collect()
    }

    pub fn comparison_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record([
            "method", "max abs", "mean abs", "rmse", "max rel", "time, s", "status", "notes",
        ]);
        for row in self.comparison_rows() {
            builder.push_record([
                row.method.to_string(),
                fmt_opt(row.max_abs),
                fmt_opt(row.mean_abs),
                fmt_opt(row.rmse),
                fmt_opt(row.max_rel),
                format!("{:.4}", row.wall_time),
                format!("{:?}", row.status),
                row.note,
            ]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }

    pub fn pairwise_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["pair", "max abs", "mean abs", "rmse"]);
        for p in &self.pairwise_errors {
            builder.push_record([
                format!("{} vs {}", p.first, p.second),
                format!("{:.3e}", p.stats.max_abs),
                format!("{:.3e}", p.stats.mean_abs),
                format!("{:.3e}", p.stats.rmse),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }

    pub fn rankings_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["rank", "accuracy (rmse)", "speed (s)"]);
        let n = self.accuracy_ranking.len().max(self.speed_ranking.len());
        for i in 0..n {
            let acc = self
                .accuracy_ranking
                .get(i)
                .map(|(m, e)| format!("{} ({:.3e})", m, e))
                .unwrap_or_default();
            let speed = self
                .speed_ranking
                .get(i)
                .map(|(m, t)| format!("{} ({:.4})", m, t))
                .unwrap_or_default();
            builder.push_record([(i + 1).to_string(), acc, speed]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }

    pub fn log_tables(&self) {
        info!(
            "\n \n COMPARISON AGAINST {} on {} nodes \n \n {}",
            self.reference,
            self.grid.len(),
            self.comparison_table()
        );
        if !self.pairwise_errors.is_empty() {
            info!("\n \n PAIRWISE ERRORS \n \n {}", self.pairwise_table());
        }
        info!("\n \n RANKINGS \n \n {}", self.rankings_table());
    }
}
