//! Shooting method: RK4 initial value integration plus root finding on the apex height
pub mod Shooting_simple;
