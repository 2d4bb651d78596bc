//! examples of usage of RustedCornea
/// comparison of the four corneal shape solvers
pub mod cornea_examples;
