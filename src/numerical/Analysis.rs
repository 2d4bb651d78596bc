pub mod analyzer;
pub mod interpolation;
