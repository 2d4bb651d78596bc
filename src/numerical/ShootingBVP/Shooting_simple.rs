//! # Shooting Method for the corneal BVP
//!
//! The BVP `h'' = f(x, h, h')`, `h'(x_min) = 0`, `h(x_max) = 0` is turned into an initial value
//! problem by guessing the one datum missing at the apex, the apex height `s = h(x_min)`.
//! The IVP is integrated with fixed-step RK4 and `s` is corrected until the far boundary
//! condition holds.
//!
//! ## State machine
//! ```text
//! Guess -> Integrate -> EvaluateMismatch -> { Converged | RefineGuess -> Integrate }
//! ```
//! * **Guess**: apex height of the linearized problem, `(b/a)(1 - 1/cosh(sqrt(a) L))`, or a user value
//! * **Integrate**: RK4 on `y = [h, h']` with `n = ceil(L / step_size)` equal steps
//! * **EvaluateMismatch**: `m(s) = h(x_max; s) - h_target`
//! * **RefineGuess**: secant update (default) or bisection inside an outward-searched bracket
//!
//! ## Parameters
//! - **initial_guess**: overrides the heuristic apex height
//! - **tolerance**: convergence tolerance on |m(s)|
//! - **max_iterations**: cap on RefineGuess transitions
//! - **step_size**: RK4 step; RK4 global error is O(step^4), so the default 1e-3 gives ~1e-12
//! - **max_rk4_steps**: cap on the steps of one integration, `ceil(L / step_size)` must not exceed it
//!
//! ## Usage Example
//! ```rust, ignore
//! let problem = Arc::new(CorneaProblem::from_raw(7.8, 0.5, 0.0, 1.0)?);
//! let mut solver = ShootingMethodSolver::new(problem, ShootingConfig::default())?;
//! let result = solver.shoot()?;
//! println!("apex height {} after {} iterations", result.s, result.iterations);
//! ```
use crate::numerical::Cornea_problem::{BoundaryConditionType, CorneaProblem};
use crate::numerical::Solver_api::{BvpSolver, Diagnostics, Method, Profile, SolverOutput};
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use log::{debug, error, info};
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShootingState {
    Guess,
    Integrate,
    EvaluateMismatch,
    RefineGuess,
    Converged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RootFinder {
    Secant,
    Bisection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShootingConfig {
    pub initial_guess: Option<f64>,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub step_size: f64,
    pub root_finder: RootFinder,
    pub max_rk4_steps: usize,
}

impl Default for ShootingConfig {
    fn default() -> Self {
        Self {
            initial_guess: None,
            tolerance: 1e-8,
            max_iterations: 50,
            step_size: 1e-3,
            root_finder: RootFinder::Secant,
            max_rk4_steps: 1_000_000,
        }
    }
}

impl ShootingConfig {
    pub fn validate(&self) -> CorneaResult<()> {
        if !(self.step_size > 0.0) || !(self.tolerance > 0.0) || self.max_iterations == 0 {
            return Err(CorneaError::InvalidParameters(format!(
                "shooting needs positive step size, tolerance and iteration cap, got {}, {} and {}",
                self.step_size, self.tolerance, self.max_iterations
            )));
        }
        if self.max_rk4_steps == 0 {
            return Err(CorneaError::InvalidParameters(
                "cap on RK4 steps must be positive".to_string(),
            ));
        }
        if let Some(guess) = self.initial_guess {
            if !guess.is_finite() {
                return Err(CorneaError::InvalidParameters(format!(
                    "initial guess must be finite, got {}",
                    guess
                )));
            }
        }
        Ok(())
    }

    /// Number of RK4 steps over an interval of `length`, refused above `max_rk4_steps`.
    pub fn steps_for(&self, length: f64) -> CorneaResult<usize> {
        let ratio = (length / self.step_size).ceil();
        if !ratio.is_finite() || ratio > self.max_rk4_steps as f64 {
            return Err(CorneaError::InvalidParameters(format!(
                "step size {} needs {:e} RK4 steps over length {}, the cap is {}",
                self.step_size, ratio, length, self.max_rk4_steps
            )));
        }
        Ok((ratio as usize).max(1))
    }
}

#[derive(Debug, Clone)]
pub struct ShootingMethodResult {
    pub x_mesh: DVector<f64>,
    /// row 0: h, row 1: h'; one column per mesh node
    pub y: DMatrix<f64>,
    /// converged apex height
    pub s: f64,
    /// [h, h'] at x_max
    pub bound_values: DVector<f64>,
    pub mismatch: f64,
    pub iterations: usize,
    pub steps_per_integration: usize,
    pub total_rk4_steps: usize,
    pub trace: Vec<(f64, f64)>,
}

impl Default for ShootingMethodResult {
    fn default() -> Self {
        Self {
            x_mesh: DVector::zeros(0),
            y: DMatrix::zeros(0, 0),
            s: 0.0,
            bound_values: DVector::zeros(0),
            mismatch: f64::NAN,
            iterations: 0,
            steps_per_integration: 0,
            total_rk4_steps: 0,
            trace: Vec::new(),
        }
    }
}

/// Root-finder memory carried between RefineGuess transitions.
enum Refiner {
    Secant {
        prev: Option<(f64, f64)>,
    },
    Bisection {
        origin: Option<(f64, f64)>,
        expansions: i32,
        bracket: Option<((f64, f64), (f64, f64))>,
    },
}

impl Refiner {
    fn new(kind: RootFinder) -> Self {
        match kind {
            RootFinder::Secant => Refiner::Secant { prev: None },
            RootFinder::Bisection => Refiner::Bisection {
                origin: None,
                expansions: 0,
                bracket: None,
            },
        }
    }

    /// perturbation used for the second secant point and for the bracket search
    fn probe_width(s: f64) -> f64 {
        if s.abs() > 1e-12 { 0.1 * s.abs() } else { 1e-3 }
    }

    /// Stores an evaluated (guess, mismatch) pair.
    fn record(&mut self, s: f64, m: f64) {
        if let Refiner::Bisection {
            origin, bracket, ..
        } = self
        {
            let Some((s0, m0)) = *origin else {
                *origin = Some((s, m));
                return;
            };
            match bracket {
                Some((lo, hi)) => {
                    if m.signum() == lo.1.signum() {
                        *lo = (s, m);
                    } else {
                        *hi = (s, m);
                    }
                }
                None => {
                    if m.signum() != m0.signum() {
                        *bracket = Some(((s0, m0), (s, m)));
                        debug!("bracket found: [{}, {}]", s0, s);
                    }
                }
            }
        }
    }

    /// Next guess from the last evaluated pair; `None` when the update breaks down.
    fn next_guess(&mut self, s: f64, m: f64) -> Option<f64> {
        match self {
            Refiner::Secant { prev } => {
                let next = match *prev {
                    None => s + Self::probe_width(s),
                    Some((s_prev, m_prev)) => {
                        let denom = m - m_prev;
                        if denom == 0.0 || !denom.is_finite() {
                            return None;
                        }
                        s - m * (s - s_prev) / denom
                    }
                };
                *prev = Some((s, m));
                Some(next).filter(|v| v.is_finite())
            }
            Refiner::Bisection {
                origin,
                expansions,
                bracket,
            } => match bracket {
                Some((lo, hi)) => Some(0.5 * (lo.0 + hi.0)),
                None => {
                    let (s0, _) = (*origin)?;
                    // s0 + w, s0 - w, s0 + 2w, s0 - 2w, ...
                    let k = *expansions;
                    *expansions += 1;
                    let width = Self::probe_width(s0) * 2.0_f64.powi(k / 2);
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    Some(s0 + sign * width)
                }
            },
        }
    }
}

/// Configuration and state of the shooting method solver.
pub struct ShootingMethodSolver {
    problem: Arc<CorneaProblem>,
    pub config: ShootingConfig,
    pub result: ShootingMethodResult,
    state: ShootingState,
}

impl ShootingMethodSolver {
    pub fn new(problem: Arc<CorneaProblem>, config: ShootingConfig) -> CorneaResult<Self> {
        config.validate()?;
        config.steps_for(problem.domain().length())?;
        Ok(Self {
            problem,
            config,
            result: ShootingMethodResult::default(),
            state: ShootingState::Guess,
        })
    }

    pub fn state(&self) -> ShootingState {
        self.state
    }

    /// initial state [h, h'] at x_min for a given unknown datum
    fn initial_state(&self, guess: f64) -> DVector<f64> {
        let left = self.problem.left_bc();
        match left.bc_type {
            // h(a) = known, h'(a) = guess
            BoundaryConditionType::Dirichlet => DVector::from_vec(vec![left.value, guess]),
            // h'(a) = known, h(a) = guess
            BoundaryConditionType::Neumann => DVector::from_vec(vec![guess, left.value]),
        }
    }

    fn far_mismatch(&self, end: &DVector<f64>) -> f64 {
        let right = self.problem.right_bc();
        match right.bc_type {
            BoundaryConditionType::Dirichlet => end[0] - right.value,
            BoundaryConditionType::Neumann => end[1] - right.value,
        }
    }

    /// Integrates the IVP for one guess: (solution matrix, mesh, number of RK4 steps).
    pub fn integrate(&self, guess: f64) -> (DMatrix<f64>, DVector<f64>, usize) {
        let domain = self.problem.domain();
        let problem = &self.problem;
        let ode_system = |x: f64, y: &DVector<f64>| -> DVector<f64> {
            DVector::from_row_slice(&problem.first_order_rhs(x, &[y[0], y[1]]))
        };
        let (sol, mesh) = RK4_ivp_solver_and_mesh(
            domain.x_min(),
            self.initial_state(guess),
            domain.x_max(),
            self.config.step_size,
            ode_system,
        );
        let steps = mesh.len() - 1;
        (sol, mesh, steps)
    }

    fn divergence(
        &self,
        guess: f64,
        mismatch: f64,
        iterations: usize,
        trace: Vec<(f64, f64)>,
    ) -> CorneaError {
        error!(
            "shooting method did not converge after {} iterations: last guess {}, mismatch {:e}",
            iterations, guess, mismatch
        );
        CorneaError::ShootingDivergence {
            last_guess: guess,
            last_mismatch: mismatch,
            iterations,
            trace,
        }
    }

    /// Runs the state machine to `Converged` or fails with `ShootingDivergence`.
    pub fn shoot(&mut self) -> CorneaResult<ShootingMethodResult> {
        let cfg = self.config.clone();
        cfg.validate()?;
        cfg.steps_for(self.problem.domain().length())?;
        info!("Starting shooting method solver");
        debug!(
            "Solver parameters: initial_guess={:?}, tolerance={}, max_iterations={}, step_size={}, root finder {}",
            cfg.initial_guess, cfg.tolerance, cfg.max_iterations, cfg.step_size, cfg.root_finder
        );

        let mut refiner = Refiner::new(cfg.root_finder);
        let mut guess = 0.0;
        let mut mismatch = f64::NAN;
        let mut iterations = 0;
        let mut total_steps = 0;
        let mut trace: Vec<(f64, f64)> = Vec::new();
        let mut trial: Option<(DMatrix<f64>, DVector<f64>, usize)> = None;
        self.state = ShootingState::Guess;

        while self.state != ShootingState::Converged {
            self.state = match self.state {
                ShootingState::Guess => {
                    guess = cfg
                        .initial_guess
                        .unwrap_or_else(|| self.problem.linearized_apex_height());
                    debug!("initial guess for the apex height: {}", guess);
                    ShootingState::Integrate
                }
                ShootingState::Integrate => {
                    let (sol, mesh, steps) = self.integrate(guess);
                    total_steps += steps;
                    trial = Some((sol, mesh, steps));
                    ShootingState::EvaluateMismatch
                }
                ShootingState::EvaluateMismatch => {
                    let Some((sol, _, _)) = trial.as_ref() else {
                        return Err(self.divergence(guess, mismatch, iterations, trace));
                    };
                    let end = sol.column(sol.ncols() - 1).into_owned();
                    mismatch = self.far_mismatch(&end);
                    trace.push((guess, mismatch));
                    debug!(
                        "Iteration {}: guess = {}, h(b) = {}, h'(b) = {}, mismatch = {:e}",
                        iterations, guess, end[0], end[1], mismatch
                    );
                    if !mismatch.is_finite() {
                        return Err(self.divergence(guess, mismatch, iterations, trace));
                    }
                    refiner.record(guess, mismatch);
                    if mismatch.abs() < cfg.tolerance {
                        ShootingState::Converged
                    } else {
                        ShootingState::RefineGuess
                    }
                }
                ShootingState::RefineGuess => {
                    if iterations >= cfg.max_iterations {
                        return Err(self.divergence(guess, mismatch, iterations, trace));
                    }
                    iterations += 1;
                    match refiner.next_guess(guess, mismatch) {
                        Some(next) => {
                            guess = next;
                            ShootingState::Integrate
                        }
                        None => return Err(self.divergence(guess, mismatch, iterations, trace)),
                    }
                }
                ShootingState::Converged => ShootingState::Converged,
            };
        }

        let Some((sol, mesh, steps)) = trial else {
            return Err(self.divergence(guess, mismatch, iterations, trace));
        };
        let bound_values = sol.column(sol.ncols() - 1).into_owned();
        info!(
            "Found apex height {} after {} iterations; h({})={}, h'({})={}",
            guess,
            iterations,
            self.problem.domain().x_max(),
            bound_values[0],
            self.problem.domain().x_max(),
            bound_values[1]
        );
        self.result = ShootingMethodResult {
            x_mesh: mesh,
            y: sol,
            s: guess,
            bound_values,
            mismatch,
            iterations,
            steps_per_integration: steps,
            total_rk4_steps: total_steps,
            trace,
        };
        Ok(self.result.clone())
    }
}

impl BvpSolver for ShootingMethodSolver {
    fn method(&self) -> Method {
        Method::Shooting
    }
    fn solve(&mut self) -> CorneaResult<SolverOutput> {
        let result = self.shoot()?;
        let h: Vec<f64> = result.y.row(0).iter().copied().collect();
        let profile = Profile::new(result.x_mesh.iter().copied().collect(), h)?;
        Ok(SolverOutput {
            profile,
            diagnostics: Diagnostics::Shooting {
                iterations: result.iterations,
                steps_per_integration: result.steps_per_integration,
                total_rk4_steps: result.total_rk4_steps,
                mismatch: result.mismatch,
                apex_height: result.s,
                trace: result.trace,
            },
            flags: Vec::new(),
        })
    }
}

//////////////////////////////////////////////////////////////////////////////////////////////
pub fn RK4_ivp_solver_and_mesh<F>(
    x0: f64,
    y0: DVector<f64>,
    x_end: f64,
    step_size: f64,
    ode_system: F,
) -> (DMatrix<f64>, DVector<f64>)
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    let ivp_sol = rk4_ivp_solver(x0, y0, x_end, step_size, ode_system);
    let x_mesh = create_mesh(x0, x_end, step_size);
    (ivp_sol, x_mesh)
}

/// number of equal steps covering [x0, x_end] with steps no longer than `step_size`
pub fn n_steps(x0: f64, x_end: f64, step_size: f64) -> usize {
    if (x_end - x0).abs() < f64::EPSILON {
        return 0;
    }
    (((x_end - x0) / step_size).ceil() as usize).max(1)
}

/// Solves an initial value problem (IVP) using the 4th-order Runge-Kutta method.
///
/// # Arguments
/// * `x0` - Initial x value.
/// * `y0` - Initial state vector (y and y' packed into a DVector).
/// * `x_end` - End of the integration interval.
/// * `step_size` - Upper bound on the step; the interval is split into equal steps.
/// * `ode_system` - Function defining the ODE system: dy/dx = f(x, y).
///
/// # Returns
/// * `DMatrix<f64>` - Matrix where each column is the solution at a mesh node
pub fn rk4_ivp_solver<F>(
    x0: f64,
    y0: DVector<f64>,
    x_end: f64,
    step_size: f64,
    ode_system: F,
) -> DMatrix<f64>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    let n = n_steps(x0, x_end, step_size);
    let mut solution = DMatrix::zeros(y0.len(), n + 1);
    solution.set_column(0, &y0);
    if n == 0 {
        return solution;
    }
    let h = (x_end - x0) / n as f64;
    let mut y = y0;
    for step in 0..n {
        let x = x0 + step as f64 * h;
        let k1 = ode_system(x, &y);
        let k2 = ode_system(x + h / 2.0, &(&y + (h / 2.0) * &k1));
        let k3 = ode_system(x + h / 2.0, &(&y + (h / 2.0) * &k2));
        let k4 = ode_system(x + h, &(&y + h * &k3));

        y += (h / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4);
        if y.iter().any(|v| !v.is_finite()) {
            // blown-up trajectory: keep the non-finite state, the caller sees it as mismatch
            for col in step + 1..=n {
                solution.set_column(col, &y);
            }
            break;
        }
        solution.set_column(step + 1, &y);
    }
    solution
}

pub fn create_mesh(x0: f64, x_end: f64, step_size: f64) -> DVector<f64> {
    let n = n_steps(x0, x_end, step_size);
    if n == 0 {
        return DVector::from_element(1, x0);
    }
    let h = (x_end - x0) / n as f64;
    let mut x_mesh = DVector::from_fn(n + 1, |i, _| x0 + i as f64 * h);
    x_mesh[n] = x_end;
    x_mesh
}

/////////////////////////////////////////////////////////////////////////
//          tests
//////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use simplelog::*;

    fn init_logger() {
        let _ = SimpleLogger::init(LevelFilter::Info, Config::default());
    }

    fn cornea(a: f64, b: f64) -> Arc<CorneaProblem> {
        Arc::new(CorneaProblem::from_raw(a, b, 0.0, 1.0).unwrap())
    }

    #[test]
    fn rk4_reproduces_sinh() {
        // y'' = y, y(-1) = sinh(-1), y'(-1) = cosh(-1)
        let ode_system =
            |_x: f64, y: &DVector<f64>| -> DVector<f64> { DVector::from_vec(vec![y[1], y[0]]) };
        let y0 = DVector::from_vec(vec![(-1.0_f64).sinh(), (-1.0_f64).cosh()]);
        let (y, x_mesh) = RK4_ivp_solver_and_mesh(-1.0, y0, 0.0, 0.001, ode_system);
        assert_eq!(x_mesh.len(), y.ncols());
        for i in 0..x_mesh.len() {
            assert_abs_diff_eq!(y[(0, i)], x_mesh[i].sinh(), epsilon = 1e-10);
            assert_abs_diff_eq!(y[(1, i)], x_mesh[i].cosh(), epsilon = 1e-10);
        }
    }

    #[test]
    fn mesh_uses_equal_steps_and_hits_the_end() {
        let mesh = create_mesh(0.0, 1.0, 0.3);
        // ceil(1/0.3) = 4 steps of 0.25
        assert_eq!(mesh.len(), 5);
        assert_abs_diff_eq!(mesh[1], 0.25, epsilon = 1e-15);
        assert_eq!(mesh[4], 1.0);
        assert_eq!(n_steps(0.0, 1.0, 1e-3), 1000);
        assert_eq!(create_mesh(2.0, 2.0, 0.1).len(), 1);
    }

    #[test]
    fn converges_for_reference_parameters() {
        init_logger();
        let mut solver =
            ShootingMethodSolver::new(cornea(7.8, 0.5), ShootingConfig::default()).unwrap();
        let result = solver.shoot().unwrap();
        assert_eq!(solver.state(), ShootingState::Converged);
        assert!(result.mismatch.abs() < 1e-8);
        assert_abs_diff_eq!(result.bound_values[0], 0.0, epsilon = 1e-8);
        assert_eq!(result.steps_per_integration, 1000);
        assert_eq!(result.total_rk4_steps, 1000 * result.trace.len());
        assert_eq!(result.trace.len(), result.iterations + 1);
        // the apex slope is imposed exactly
        assert_eq!(result.y[(1, 0)], 0.0);
    }

    #[test]
    fn converged_guess_round_trips() {
        init_logger();
        let problem = cornea(7.8, 0.5);
        let mut solver =
            ShootingMethodSolver::new(problem.clone(), ShootingConfig::default()).unwrap();
        let result = solver.shoot().unwrap();
        let (sol, _, _) = solver.integrate(result.s);
        let end = sol.column(sol.ncols() - 1);
        assert!((end[0] - problem.right_bc().value).abs() < solver.config.tolerance);
    }

    #[test]
    fn linear_limit_matches_closed_form() {
        init_logger();
        let problem = cornea(7.8, 1e-3);
        let mut solver = ShootingMethodSolver::new(
            problem.clone(),
            ShootingConfig {
                tolerance: 1e-12,
                ..ShootingConfig::default()
            },
        )
        .unwrap();
        let result = solver.shoot().unwrap();
        for i in 0..result.x_mesh.len() {
            assert_abs_diff_eq!(
                result.y[(0, i)],
                problem.linearized_solution(result.x_mesh[i]),
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn bisection_agrees_with_secant() {
        init_logger();
        let problem = cornea(7.8, 0.5);
        let mut secant =
            ShootingMethodSolver::new(problem.clone(), ShootingConfig::default()).unwrap();
        let mut bisection = ShootingMethodSolver::new(
            problem,
            ShootingConfig {
                root_finder: RootFinder::Bisection,
                max_iterations: 100,
                ..ShootingConfig::default()
            },
        )
        .unwrap();
        let s1 = secant.shoot().unwrap();
        let s2 = bisection.shoot().unwrap();
        assert!(s2.mismatch.abs() < 1e-8);
        assert_abs_diff_eq!(s1.s, s2.s, epsilon = 1e-7);
        assert!(s2.iterations > s1.iterations);
    }

    #[test]
    fn iteration_cap_raises_shooting_divergence() {
        init_logger();
        let mut solver = ShootingMethodSolver::new(
            cornea(7.8, 0.5),
            ShootingConfig {
                tolerance: 1e-20,
                max_iterations: 1,
                ..ShootingConfig::default()
            },
        )
        .unwrap();
        match solver.shoot() {
            Err(CorneaError::ShootingDivergence {
                iterations,
                trace,
                last_guess,
                last_mismatch,
            }) => {
                assert_eq!(iterations, 1);
                assert_eq!(trace.len(), 2);
                assert_eq!(trace[1], (last_guess, last_mismatch));
            }
            other => panic!("expected ShootingDivergence, got {:?}", other.map(|r| r.s)),
        }
        assert_ne!(solver.state(), ShootingState::Converged);
    }

    #[test]
    fn bisection_without_bracket_diverges() {
        init_logger();
        // two expansions cannot reach the root from a far-off guess
        let mut solver = ShootingMethodSolver::new(
            cornea(7.8, 0.5),
            ShootingConfig {
                root_finder: RootFinder::Bisection,
                initial_guess: Some(0.1),
                max_iterations: 2,
                ..ShootingConfig::default()
            },
        )
        .unwrap();
        assert!(matches!(
            solver.shoot(),
            Err(CorneaError::ShootingDivergence { iterations: 2, .. })
        ));
    }

    #[test]
    fn flat_cornea_converges_immediately() {
        // b = 0 gives h = 0 and the heuristic guess is already exact
        let mut solver =
            ShootingMethodSolver::new(cornea(7.8, 0.0), ShootingConfig::default()).unwrap();
        let result = solver.shoot().unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.s, 0.0);
    }

    #[test]
    fn step_count_above_cap_is_invalid() {
        for step_size in [1e-300, 1e-7] {
            let config = ShootingConfig {
                step_size,
                ..ShootingConfig::default()
            };
            assert!(config.validate().is_ok());
            assert!(matches!(
                ShootingMethodSolver::new(cornea(7.8, 0.5), config),
                Err(CorneaError::InvalidParameters(_))
            ));
        }
        let config = ShootingConfig {
            max_rk4_steps: 500,
            ..ShootingConfig::default()
        };
        assert!(config.steps_for(1.0).is_err());
        assert_eq!(config.steps_for(0.5).unwrap(), 500);
        // a config edited after construction is checked again before integrating
        let mut solver =
            ShootingMethodSolver::new(cornea(7.8, 0.5), ShootingConfig::default()).unwrap();
        solver.config.step_size = 1e-300;
        assert!(matches!(solver.shoot(), Err(CorneaError::InvalidParameters(_))));
    }

    #[test]
    fn trait_solve_builds_profile() {
        init_logger();
        let mut solver =
            ShootingMethodSolver::new(cornea(7.8, 0.5), ShootingConfig::default()).unwrap();
        let out = solver.solve().unwrap();
        assert_eq!(out.profile.len(), 1001);
        assert_eq!(out.profile.x_max(), 1.0);
        match out.diagnostics {
            Diagnostics::Shooting {
                steps_per_integration,
                ..
            } => assert_eq!(steps_per_integration, 1000),
            other => panic!("unexpected diagnostics {:?}", other),
        }
    }
}
