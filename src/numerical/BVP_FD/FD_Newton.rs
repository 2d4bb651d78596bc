//! # Finite differences + Newton-Raphson
//!
//! Fixed grid of `M` uniform nodes (default 201). Unknowns are the node heights `H`.
//! ```text
//! row 0        : (-3 H_0 + 4 H_1 - H_2) / (2 dx) - h'(x_min)           = 0
//! row i        : (H_{i+1} - 2 H_i + H_{i-1}) / dx^2 - f(x_i, H_i, (H_{i+1} - H_{i-1}) / (2 dx)) = 0
//! row M-1      : H_{M-1} - h(x_max)                                     = 0
//! ```
//! The boundary rows enforce the boundary conditions directly, the apex one with a second-order
//! one-sided stencil. `F(H) = 0` is solved with Newton-Raphson, `J dH = -F(H)`, dense LU.
//!
//! Initial guess: the flat profile at the far boundary value, i.e. the linear interpolant
//! between the boundary data that also has the prescribed zero apex slope.
//! Any other profile (for instance another method's result) can be chained in through
//! [`FiniteDifferenceSolver::solve_from`] / [`FiniteDifferenceSolver::resample`].
use crate::numerical::Analysis::interpolation::LinearInterpolator;
use crate::numerical::Cornea_problem::CorneaProblem;
use crate::numerical::Solver_api::{
    BvpSolver, Diagnostics, JacobianKind, Method, Profile, SolverOutput,
};
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use log::{debug, error, info};
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;
use std::time::Instant;
use tabled::{builder::Builder, settings::Style};

/// largest accepted node count, the Jacobian is a dense `M x M` matrix
pub const MAX_FD_NODES: usize = 4001;

#[derive(Debug, Clone, PartialEq)]
pub struct FdConfig {
    pub n_nodes: usize,
    /// on both ||F||_inf and ||dH||_inf
    pub tolerance: f64,
    pub max_iterations: usize,
    pub jacobian: JacobianKind,
}

impl Default for FdConfig {
    fn default() -> Self {
        Self {
            n_nodes: 201,
            tolerance: 1e-10,
            max_iterations: 100,
            jacobian: JacobianKind::Analytic,
        }
    }
}

impl FdConfig {
    pub fn validate(&self) -> CorneaResult<()> {
        if self.n_nodes < 3 || self.n_nodes > MAX_FD_NODES {
            return Err(CorneaError::InvalidParameters(format!(
                "finite differences need between 3 and {} nodes, got {}",
                MAX_FD_NODES, self.n_nodes
            )));
        }
        if self.max_iterations == 0 || !(self.tolerance > 0.0) {
            return Err(CorneaError::InvalidParameters(
                "Newton iteration cap and tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewtonResult {
    pub x_mesh: Vec<f64>,
    pub h: DVector<f64>,
    pub iterations: usize,
    /// ||F(H)||_inf at the returned iterate
    pub residual: f64,
    /// ||dH||_inf of the last update, infinity if no update was taken
    pub step_norm: f64,
}

pub struct FiniteDifferenceSolver {
    problem: Arc<CorneaProblem>,
    pub config: FdConfig,
    x_mesh: Vec<f64>,
    dx: f64,
}

impl FiniteDifferenceSolver {
    pub fn new(problem: Arc<CorneaProblem>, config: FdConfig) -> CorneaResult<Self> {
        config.validate()?;
        let x_mesh = problem.uniform_grid(config.n_nodes);
        let dx = x_mesh[1] - x_mesh[0];
        Ok(Self {
            problem,
            config,
            x_mesh,
            dx,
        })
    }

    pub fn x_mesh(&self) -> &[f64] {
        &self.x_mesh
    }

    /// F(H)
    pub fn residual_vector(&self, H: &DVector<f64>) -> DVector<f64> {
        let m = H.len();
        let dx = self.dx;
        let x = &self.x_mesh;
        let mut F = DVector::zeros(m);
        F[0] = (-3.0 * H[0] + 4.0 * H[1] - H[2]) / (2.0 * dx) - self.problem.left_bc().value;
        for i in 1..m - 1 {
            let dh = (H[i + 1] - H[i - 1]) / (2.0 * dx);
            let d2h = (H[i + 1] - 2.0 * H[i] + H[i - 1]) / (dx * dx);
            F[i] = self.problem.residual(x[i], H[i], dh, d2h);
        }
        F[m - 1] = H[m - 1] - self.problem.right_bc().value;
        F
    }

    /// dF/dH assembled from the analytic partial derivatives of f
    pub fn analytic_jacobian(&self, H: &DVector<f64>) -> DMatrix<f64> {
        let m = H.len();
        let dx = self.dx;
        let inv_dx2 = 1.0 / (dx * dx);
        let x = &self.x_mesh;
        let mut J = DMatrix::zeros(m, m);
        J[(0, 0)] = -3.0 / (2.0 * dx);
        J[(0, 1)] = 4.0 / (2.0 * dx);
        J[(0, 2)] = -1.0 / (2.0 * dx);
        for i in 1..m - 1 {
            let dh = (H[i + 1] - H[i - 1]) / (2.0 * dx);
            let f_dh = self.problem.df_dh(x[i], H[i], dh);
            let f_ddh = self.problem.df_ddh(x[i], H[i], dh);
            J[(i, i - 1)] = inv_dx2 + f_ddh / (2.0 * dx);
            J[(i, i)] = -2.0 * inv_dx2 - f_dh;
            J[(i, i + 1)] = inv_dx2 - f_ddh / (2.0 * dx);
        }
        J[(m - 1, m - 1)] = 1.0;
        J
    }

    /// forward-difference approximation of dF/dH
    pub fn numerical_jacobian(&self, H: &DVector<f64>) -> DMatrix<f64> {
        let m = H.len();
        let F0 = self.residual_vector(H);
        let mut J = DMatrix::zeros(m, m);
        let mut Hp = H.clone();
        let sqrt_eps = f64::EPSILON.sqrt();
        for j in 0..m {
            let delta = sqrt_eps * H[j].abs().max(1.0);
            Hp[j] = H[j] + delta;
            let Fp = self.residual_vector(&Hp);
            J.set_column(j, &((Fp - &F0) / delta));
            Hp[j] = H[j];
        }
        J
    }

    fn jacobian(&self, H: &DVector<f64>) -> DMatrix<f64> {
        match self.config.jacobian {
            JacobianKind::Analytic => self.analytic_jacobian(H),
            JacobianKind::Numerical => self.numerical_jacobian(H),
        }
    }

    /// flat profile at the far boundary value
    pub fn initial_guess(&self) -> DVector<f64> {
        DVector::from_element(self.config.n_nodes, self.problem.right_bc().value)
    }

    /// Linear interpolation of another profile onto the finite-difference grid.
    pub fn resample(&self, profile: &Profile) -> CorneaResult<DVector<f64>> {
        let interpolator = LinearInterpolator::new(profile.x(), profile.h())?;
        let values = self
            .x_mesh
            .iter()
            .map(|&x| interpolator.sample(x))
            .collect::<CorneaResult<Vec<f64>>>()?;
        Ok(DVector::from_vec(values))
    }

    pub fn newton(&self) -> CorneaResult<NewtonResult> {
        self.solve_from(self.initial_guess())
    }

    /// Newton-Raphson from an explicit initial guess on the solver grid.
    pub fn solve_from(&self, initial_guess: DVector<f64>) -> CorneaResult<NewtonResult> {
        let cfg = &self.config;
        if initial_guess.len() != cfg.n_nodes {
            return Err(CorneaError::InvalidParameters(format!(
                "initial guess has {} nodes, the grid has {}",
                initial_guess.len(),
                cfg.n_nodes
            )));
        }
        info!(
            "\n \n solving finite difference system with Newton-Raphson method: {} nodes, {:?} Jacobian",
            cfg.n_nodes, cfg.jacobian
        );
        let begin = Instant::now();
        let mut H = initial_guess;
        let mut step_norm = f64::INFINITY;
        let mut iteration = 0;
        loop {
            let F = self.residual_vector(&H);
            let norm = F.amax();
            debug!("iteration {}: ||F|| = {:e}, ||dH|| = {:e}", iteration, norm, step_norm);
            if !norm.is_finite() {
                error!("residual became non-finite at iteration {}", iteration);
                return Err(CorneaError::NewtonDivergence {
                    residual: norm,
                    iterations: iteration,
                });
            }
            if norm < cfg.tolerance {
                info!("Solution has converged after {} iterations, ||F|| = {:e}", iteration, norm);
                return Ok(self.finish(H, iteration, norm, step_norm, begin));
            }
            if iteration >= cfg.max_iterations {
                error!(
                    "Newton-Raphson did not converge after {} iterations, ||F|| = {:e}",
                    iteration, norm
                );
                return Err(CorneaError::NewtonDivergence {
                    residual: norm,
                    iterations: iteration,
                });
            }
            let J = self.jacobian(&H);
            let dH = J
                .lu()
                .solve(&(-F))
                .ok_or(CorneaError::SingularJacobian {
                    iteration: iteration + 1,
                })?;
            H += &dH;
            step_norm = dH.amax();
            iteration += 1;
            if step_norm < cfg.tolerance {
                let norm = self.residual_vector(&H).amax();
                info!(
                    "Newton step below tolerance after {} iterations, ||F|| = {:e}",
                    iteration, norm
                );
                return Ok(self.finish(H, iteration, norm, step_norm, begin));
            }
        }
    }

    fn finish(
        &self,
        H: DVector<f64>,
        iterations: usize,
        residual: f64,
        step_norm: f64,
        begin: Instant,
    ) -> NewtonResult {
        let mut builder = Builder::default();
        let rows = [
            ("number of grid points", self.config.n_nodes.to_string()),
            ("Newton iterations", iterations.to_string()),
            ("final residual", format!("{:e}", residual)),
            ("last step norm", format!("{:e}", step_norm)),
            ("time elapsed, ms", begin.elapsed().as_millis().to_string()),
        ];
        for (key, value) in rows {
            builder.push_record([key.to_string(), value]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        info!("\n \n CALC STATISTICS \n \n {}", table);
        NewtonResult {
            x_mesh: self.x_mesh.clone(),
            h: H,
            iterations,
            residual,
            step_norm,
        }
    }
}

impl BvpSolver for FiniteDifferenceSolver {
    fn method(&self) -> Method {
        Method::FiniteDiff
    }
    fn solve(&mut self) -> CorneaResult<SolverOutput> {
        let result = self.newton()?;
        let profile = Profile::new(result.x_mesh, result.h.iter().copied().collect())?;
        Ok(SolverOutput {
            profile,
            diagnostics: Diagnostics::FiniteDifference {
                n_nodes: self.config.n_nodes,
                iterations: result.iterations,
                residual: result.residual,
                step_norm: result.step_norm,
                jacobian: self.config.jacobian,
            },
            flags: Vec::new(),
        })
    }
}
