pub mod PINN_solver;
mod PINN_tests;
pub mod jet;
pub mod mlp;
