//! Error taxonomy shared by the problem definition, the four solvers, the analyzer and the report writers.
//!
//! Hard failures are variants of [`CorneaError`]. A PINN run that stalls is *not* an error:
//! it is reported through [`crate::numerical::Solver_api::SoftFlag`] and the profile is still produced.
use crate::numerical::Solver_api::Method;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorneaError {
    /// bad `a`/`b` or domain; raised before any solver runs
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// method of lines did not reach steady state
    #[error("method of lines did not converge: residual {residual:e} after {iterations} pseudo-time steps")]
    ConvergenceError { residual: f64, iterations: usize },

    #[error(
        "shooting diverged after {iterations} iterations: last guess {last_guess}, last mismatch {last_mismatch:e}"
    )]
    ShootingDivergence {
        last_guess: f64,
        last_mismatch: f64,
        iterations: usize,
        /// every (guess, mismatch) pair evaluated by the root finder
        trace: Vec<(f64, f64)>,
    },

    #[error("Newton-Raphson diverged: residual norm {residual:e} after {iterations} iterations")]
    NewtonDivergence { residual: f64, iterations: usize },

    #[error("singular Jacobian at Newton iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error(
        "{method} covers {coverage:.3} of the reference domain, at least {required:.3} is required"
    )]
    IncompatibleDomains {
        method: Method,
        coverage: f64,
        required: f64,
    },

    #[error("reference method {0} has no result to compare against")]
    MissingReference(Method),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("plotting error: {0}")]
    Plot(String),
}

impl CorneaError {
    /// true for errors that mean "this solver could not produce a trustworthy profile"
    pub fn is_solver_failure(&self) -> bool {
        matches!(
            self,
            CorneaError::ConvergenceError { .. }
                | CorneaError::ShootingDivergence { .. }
                | CorneaError::NewtonDivergence { .. }
                | CorneaError::SingularJacobian { .. }
        )
    }
}

pub type CorneaResult<T> = Result<T, CorneaError>;
