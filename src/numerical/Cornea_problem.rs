//! # Corneal shape boundary value problem
//!
//! Nonlinear model of the corneal sagittal height `h(x)`:
//!
//! ```text
//!  -h'' / sqrt(1 + h'^2) + a h = b / sqrt(1 + h'^2),   x in [x_min, x_max]
//!  h'(x_min) = 0   (apex symmetry)
//!  h(x_max)  = 0   (anchoring at the limbus)
//! ```
//! Solved for h'' this reads `h'' = f(x, h, h') = a h sqrt(1 + h'^2) - b`.
//! `a > 0` is the (scaled) apical curvature constant, `b` the shape/asphericity constant.
//!
//! Every solver in the crate consumes the right-hand side, the residual form and the
//! boundary conditions defined here, nothing else.
//!
//! ## Usage Example
//! ```rust, ignore
//! let params = ModelParameters::new(7.8, 0.5)?;
//! let problem = CorneaProblem::new(params, Domain::default())?;
//! let h_apex_guess = problem.linearized_apex_height();
//! ```
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use serde::Serialize;

/// Boundary condition types
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BoundaryConditionType {
    /// Dirichlet: h = value
    Dirichlet,
    /// Neumann: h' = value
    Neumann,
}

/// Boundary condition: value and type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundaryCondition {
    pub value: f64,
    pub bc_type: BoundaryConditionType,
}

/// apical curvature constant `a` and shape constant `b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelParameters {
    a: f64,
    b: f64,
}

impl ModelParameters {
    pub fn new(a: f64, b: f64) -> CorneaResult<Self> {
        if !a.is_finite() || !b.is_finite() {
            return Err(CorneaError::InvalidParameters(format!(
                "a and b must be finite, got a = {}, b = {}",
                a, b
            )));
        }
        if a <= 0.0 {
            return Err(CorneaError::InvalidParameters(format!(
                "a must be positive, got {}",
                a
            )));
        }
        Ok(Self { a, b })
    }
    pub fn a(&self) -> f64 {
        self.a
    }
    pub fn b(&self) -> f64 {
        self.b
    }
}

/// Closed interval `[x_min, x_max]`, apex at `x_min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Domain {
    x_min: f64,
    x_max: f64,
}

impl Domain {
    pub fn new(x_min: f64, x_max: f64) -> CorneaResult<Self> {
        if !x_min.is_finite() || !x_max.is_finite() {
            return Err(CorneaError::InvalidParameters(format!(
                "domain bounds must be finite, got [{}, {}]",
                x_min, x_max
            )));
        }
        if x_min >= x_max {
            return Err(CorneaError::InvalidParameters(format!(
                "domain bounds out of order: x_min = {} must be below x_max = {}",
                x_min, x_max
            )));
        }
        Ok(Self { x_min, x_max })
    }
    pub fn x_min(&self) -> f64 {
        self.x_min
    }
    pub fn x_max(&self) -> f64 {
        self.x_max
    }
    pub fn length(&self) -> f64 {
        self.x_max - self.x_min
    }
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x_min && x <= self.x_max
    }
}

/// normalized corneal half-width
impl Default for Domain {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorneaProblem {
    params: ModelParameters,
    domain: Domain,
    left_bc: BoundaryCondition,
    right_bc: BoundaryCondition,
}

impl CorneaProblem {
    pub fn new(params: ModelParameters, domain: Domain) -> CorneaResult<Self> {
        Ok(Self {
            params,
            domain,
            left_bc: BoundaryCondition {
                value: 0.0,
                bc_type: BoundaryConditionType::Neumann,
            },
            right_bc: BoundaryCondition {
                value: 0.0,
                bc_type: BoundaryConditionType::Dirichlet,
            },
        })
    }

    /// validates raw numbers and builds the problem in one go
    pub fn from_raw(a: f64, b: f64, x_min: f64, x_max: f64) -> CorneaResult<Self> {
        let params = ModelParameters::new(a, b)?;
        let domain = Domain::new(x_min, x_max)?;
        Self::new(params, domain)
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }
    pub fn domain(&self) -> &Domain {
        &self.domain
    }
    pub fn left_bc(&self) -> BoundaryCondition {
        self.left_bc
    }
    pub fn right_bc(&self) -> BoundaryCondition {
        self.right_bc
    }

    /// h'' = f(x, h, h')
    #[inline]
    pub fn rhs(&self, _x: f64, h: f64, dh: f64) -> f64 {
        let s = (1.0 + dh * dh).sqrt();
        self.params.a * h * s - self.params.b
    }

    /// R(x, h, h', h'') = h'' - f(x, h, h'); zero on the exact solution
    #[inline]
    pub fn residual(&self, x: f64, h: f64, dh: f64, d2h: f64) -> f64 {
        d2h - self.rhs(x, h, dh)
    }

    /// df/dh
    #[inline]
    pub fn df_dh(&self, _x: f64, _h: f64, dh: f64) -> f64 {
        self.params.a * (1.0 + dh * dh).sqrt()
    }

    /// df/dh'
    #[inline]
    pub fn df_ddh(&self, _x: f64, h: f64, dh: f64) -> f64 {
        self.params.a * h * dh / (1.0 + dh * dh).sqrt()
    }

    /// first-order system y = [h, h'] used by the IVP integrators
    pub fn first_order_rhs(&self, x: f64, y: &[f64; 2]) -> [f64; 2] {
        [y[1], self.rhs(x, y[0], y[1])]
    }

    /// Solution of the linearized problem `-h'' + a h = b` with the same boundary conditions.
    pub fn linearized_solution(&self, x: f64) -> f64 {
        let (a, b) = (self.params.a, self.params.b);
        let k = a.sqrt();
        let l = self.domain.length();
        (b / a) * (1.0 - (k * (x - self.domain.x_min)).cosh() / (k * l).cosh())
    }

    pub fn linearized_apex_height(&self) -> f64 {
        self.linearized_solution(self.domain.x_min)
    }

    /// `n` equally spaced nodes covering the domain, endpoints included
    pub fn uniform_grid(&self, n: usize) -> Vec<f64> {
        uniform_grid(self.domain.x_min, self.domain.x_max, n)
    }

    /// ODE defect of a sampled profile on a uniform grid: central differences inside,
    /// mirrored ghost node at the apex. The far node carries the Dirichlet mismatch.
    pub fn discrete_residual(&self, x: &[f64], h: &[f64]) -> CorneaResult<Vec<f64>> {
        let n = x.len();
        if n < 3 || h.len() != n {
            return Err(CorneaError::InvalidProfile(format!(
                "discrete residual needs at least 3 matching nodes, got x: {}, h: {}",
                n,
                h.len()
            )));
        }
        let dx = x[1] - x[0];
        let mut res = Vec::with_capacity(n);
        // ghost node h[-1] = h[1] - 2 dx h'(x_min)
        let slope = self.left_bc.value;
        let d2h0 = (2.0 * h[1] - 2.0 * h[0] - 2.0 * dx * slope) / (dx * dx);
        res.push(self.residual(x[0], h[0], slope, d2h0));
        for i in 1..n - 1 {
            let dh = (h[i + 1] - h[i - 1]) / (2.0 * dx);
            let d2h = (h[i + 1] - 2.0 * h[i] + h[i - 1]) / (dx * dx);
            res.push(self.residual(x[i], h[i], dh, d2h));
        }
        res.push(h[n - 1] - self.right_bc.value);
        Ok(res)
    }

    /// Mismatch of a profile against both boundary conditions: (|h'(x_min) - α|, |h(x_max) - β|).
    /// The apex slope is estimated with a second-order one-sided difference.
    pub fn boundary_mismatch(&self, x: &[f64], h: &[f64]) -> (f64, f64) {
        let n = x.len().min(h.len());
        let slope = if n >= 3 {
            let dx = x[1] - x[0];
            (-3.0 * h[0] + 4.0 * h[1] - h[2]) / (2.0 * dx)
        } else {
            (h[1] - h[0]) / (x[1] - x[0])
        };
        (
            (slope - self.left_bc.value).abs(),
            (h[n - 1] - self.right_bc.value).abs(),
        )
    }
}

pub fn uniform_grid(x0: f64, x_end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![x0];
    }
    let dx = (x_end - x0) / (n - 1) as f64;
    let mut grid: Vec<f64> = (0..n).map(|i| x0 + i as f64 * dx).collect();
    // the last node lands exactly on the boundary
    grid[n - 1] = x_end;
    grid
}
