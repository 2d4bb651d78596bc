//! Common contract of the four solvers and the data they hand over to the analyzer.
//!
//! Every solver implements [`BvpSolver`]: it is constructed from a shared [`CorneaProblem`]
//! plus its own tunables and returns a [`SolverOutput`] (profile + diagnostics).
//! [`timed_solve`] wraps a call with wall-clock timing and turns it into a [`SolverResult`].
#![allow(clippy::upper_case_acronyms)]
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use itertools::Itertools;
use log::{error, info};
use serde::Serialize;
use std::time::Instant;
use strum_macros::{Display, EnumIter, EnumString};

/// Names of the compared methods, as they appear in every report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    Serialize,
)]
pub enum Method {
    /// method of lines, the reference
    MOL,
    Shooting,
    FiniteDiff,
    PINN,
}

/// Sampled sag height: strictly increasing `x`, same-length `h`, at least two nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    x: Vec<f64>,
    h: Vec<f64>,
}

impl Profile {
    pub fn new(x: Vec<f64>, h: Vec<f64>) -> CorneaResult<Self> {
        if x.len() != h.len() {
            return Err(CorneaError::InvalidProfile(format!(
                "x has {} nodes but h has {}",
                x.len(),
                h.len()
            )));
        }
        if x.len() < 2 {
            return Err(CorneaError::InvalidProfile(format!(
                "a profile needs at least 2 nodes, got {}",
                x.len()
            )));
        }
        if let Some((i, (x0, x1))) = x
            .iter()
            .tuple_windows()
            .find_position(|(x0, x1)| !(x1 > x0))
        {
            return Err(CorneaError::InvalidProfile(format!(
                "x must be strictly increasing: x[{}] = {} , x[{}] = {}",
                i,
                x0,
                i + 1,
                x1
            )));
        }
        if h.iter().any(|v| !v.is_finite()) {
            return Err(CorneaError::InvalidProfile(
                "h contains non-finite values".to_string(),
            ));
        }
        Ok(Self { x, h })
    }
    pub fn x(&self) -> &[f64] {
        &self.x
    }
    pub fn h(&self) -> &[f64] {
        &self.h
    }
    pub fn len(&self) -> usize {
        self.x.len()
    }
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
    pub fn x_min(&self) -> f64 {
        self.x[0]
    }
    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum JacobianKind {
    Analytic,
    Numerical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TrainingStatus {
    /// loss fell below the threshold
    Converged,
    EpochLimit,
    TimeLimit,
    /// no improvement within the patience window
    Stalled,
    NonFinite,
}

/// Soft conditions: the profile exists but must be labeled in the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SoftFlag {
    TrainingDivergence {
        epochs: usize,
        final_loss: f64,
        best_loss: f64,
    },
    LargeError {
        max_rel: f64,
        threshold: f64,
    },
}

/// Per-method convergence data, reported next to timings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostics {
    MethodOfLines {
        n_nodes: usize,
        dx: f64,
        pseudo_steps: usize,
        rejected_steps: usize,
        residual: f64,
    },
    Shooting {
        iterations: usize,
        steps_per_integration: usize,
        total_rk4_steps: usize,
        mismatch: f64,
        apex_height: f64,
        trace: Vec<(f64, f64)>,
    },
    FiniteDifference {
        n_nodes: usize,
        iterations: usize,
        residual: f64,
        step_norm: f64,
        jacobian: JacobianKind,
    },
    Pinn {
        epochs: usize,
        final_loss: f64,
        best_loss: f64,
        status: TrainingStatus,
        n_parameters: usize,
    },
}

impl Diagnostics {
    /// one-line human readable digest for tables
    pub fn summary(&self) -> String {
        match self {
            Diagnostics::MethodOfLines {
                n_nodes,
                pseudo_steps,
                residual,
                ..
            } => format!(
                "{} nodes, {} pseudo-time steps, residual {:.2e}",
                n_nodes, pseudo_steps, residual
            ),
            Diagnostics::Shooting {
                iterations,
                total_rk4_steps,
                mismatch,
                ..
            } => format!(
                "{} iterations, {} RK4 steps, mismatch {:.2e}",
                iterations, total_rk4_steps, mismatch
            ),
            Diagnostics::FiniteDifference {
                n_nodes,
                iterations,
                residual,
                ..
            } => format!(
                "{} nodes, {} Newton iterations, residual {:.2e}",
                n_nodes, iterations, residual
            ),
            Diagnostics::Pinn {
                epochs,
                final_loss,
                status,
                ..
            } => format!("{} epochs, loss {:.2e}, {:?}", epochs, final_loss, status),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    pub profile: Profile,
    pub diagnostics: Diagnostics,
    pub flags: Vec<SoftFlag>,
}

/// Written once by its solver run, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverResult {
    pub method: Method,
    pub profile: Profile,
    /// seconds
    pub wall_time: f64,
    pub diagnostics: Diagnostics,
    pub flags: Vec<SoftFlag>,
}

impl SolverResult {
    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// A method that produced no profile, kept for the timing table.
#[derive(Debug)]
pub struct SolverFailure {
    pub method: Method,
    pub error: CorneaError,
    pub wall_time: f64,
}

pub trait BvpSolver {
    fn method(&self) -> Method;
    /// Runs the complete procedure (for the PINN: train, then predict on the output grid).
    fn solve(&mut self) -> CorneaResult<SolverOutput>;
}

/// Runs `solver` and measures its wall time; failures keep their time too.
pub fn timed_solve(solver: &mut dyn BvpSolver) -> Result<SolverResult, SolverFailure> {
    let method = solver.method();
    info!("running {}", method);
    let start = Instant::now();
    let outcome = solver.solve();
    let wall_time = start.elapsed().as_secs_f64();
    match outcome {
        Ok(output) => {
            info!("{} completed in {:.4} s", method, wall_time);
            Ok(SolverResult {
                method,
                profile: output.profile,
                wall_time,
                diagnostics: output.diagnostics,
                flags: output.flags,
            })
        }
        Err(e) => {
            error!("{} failed after {:.4} s: {}", method, wall_time, e);
            Err(SolverFailure {
                method,
                error: e,
                wall_time,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn method_names_match_report_keys() {
        let names: Vec<String> = Method::iter().map(|m| m.to_string()).collect();
        assert_eq!(names, vec!["MOL", "Shooting", "FiniteDiff", "PINN"]);
        assert_eq!(Method::from_str("FiniteDiff").unwrap(), Method::FiniteDiff);
        assert!(Method::from_str("Euler").is_err());
    }

    #[test]
    fn profile_invariants() {
        assert!(Profile::new(vec![0.0, 1.0], vec![1.0, 0.0]).is_ok());
        assert!(Profile::new(vec![0.0], vec![1.0]).is_err());
        assert!(Profile::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(Profile::new(vec![0.0, 0.5, 0.5], vec![1.0, 0.5, 0.0]).is_err());
        assert!(Profile::new(vec![0.0, 0.7, 0.5], vec![1.0, 0.5, 0.0]).is_err());
        assert!(Profile::new(vec![0.0, 1.0], vec![f64::NAN, 0.0]).is_err());
    }

    struct Failing;
    impl BvpSolver for Failing {
        fn method(&self) -> Method {
            Method::FiniteDiff
        }
        fn solve(&mut self) -> CorneaResult<SolverOutput> {
            Err(CorneaError::NewtonDivergence {
                residual: 1.0,
                iterations: 3,
            })
        }
    }

    #[test]
    fn failures_keep_their_time() {
        let failure = timed_solve(&mut Failing).unwrap_err();
        assert_eq!(failure.method, Method::FiniteDiff);
        assert!(failure.wall_time >= 0.0);
        assert!(failure.error.is_solver_failure());
    }
}
