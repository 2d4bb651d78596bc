//! Reference solver: method of lines relaxed to steady state
pub mod MOL_solver;
