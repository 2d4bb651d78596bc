//! Corneal shape boundary-value problem and the four methods that solve it
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// comparison of solution profiles on a common grid: error metrics, rankings, exclusions
pub mod Analysis;
/// finite differences on a uniform mesh, the algebraic system is solved by Newton-Raphson
pub mod BVP_FD;
/// method of lines: semi-discretization in x and implicit pseudo-time marching to steady state
pub mod BVP_MOL;
/// runs the selected solvers (sequentially or in parallel) and hands the results to the analyzer
pub mod Comparison_api;
/// model parameters, right-hand side and the linearized closed-form solution
pub mod Cornea_problem;
/// physics-informed neural network trained on the ODE residual and boundary conditions
pub mod PINN;
/// shooting method: RK4 initial value integration + root finding on the apex height
pub mod ShootingBVP;
/// trait every solver implements, profiles, diagnostics and timings
pub mod Solver_api;
pub mod solver_errors;
