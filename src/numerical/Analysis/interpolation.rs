//! Piecewise linear resampling of profiles onto a common grid (splines crate, `Interpolation::Linear` keys).
//! Sampling outside the tabulated range is an error: profiles are never extrapolated.
use crate::numerical::Solver_api::Profile;
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use splines::{Interpolation, Key, Spline};

/// relative slack on the range check, absorbs roundoff of grids built from the same bounds
const RANGE_SLACK: f64 = 1e-12;

pub struct LinearInterpolator {
    spline: Spline<f64, f64>,
    x_min: f64,
    x_max: f64,
}

impl LinearInterpolator {
    pub fn new(x: &[f64], h: &[f64]) -> CorneaResult<Self> {
        if x.len() != h.len() || x.len() < 2 {
            return Err(CorneaError::InvalidProfile(format!(
                "interpolation needs at least 2 matching nodes, got x: {}, h: {}",
                x.len(),
                h.len()
            )));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(CorneaError::InvalidProfile(
                "interpolation nodes must be strictly increasing".to_string(),
            ));
        }
        let keys: Vec<Key<f64, f64>> = x
            .iter()
            .zip(h.iter())
            .map(|(&t, &v)| Key::new(t, v, Interpolation::Linear))
            .collect();
        Ok(Self {
            spline: Spline::from_vec(keys),
            x_min: x[0],
            x_max: x[x.len() - 1],
        })
    }

    pub fn from_profile(profile: &Profile) -> CorneaResult<Self> {
        Self::new(profile.x(), profile.h())
    }

    pub fn x_min(&self) -> f64 {
        self.x_min
    }
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    pub fn sample(&self, x: f64) -> CorneaResult<f64> {
        let slack = RANGE_SLACK * (self.x_max - self.x_min).abs().max(1.0);
        if !(x >= self.x_min - slack && x <= self.x_max + slack) {
            return Err(CorneaError::InvalidProfile(format!(
                "x = {} lies outside the tabulated range [{}, {}]",
                x, self.x_min, self.x_max
            )));
        }
        self.spline.clamped_sample(x).ok_or_else(|| {
            CorneaError::InvalidProfile(format!("interpolation failed at x = {}", x))
        })
    }

    pub fn sample_grid(&self, grid: &[f64]) -> CorneaResult<Vec<f64>> {
        grid.iter().map(|&x| self.sample(x)).collect()
    }
}

/// `profile` resampled on `grid`
pub fn resample(profile: &Profile, grid: &[f64]) -> CorneaResult<Vec<f64>> {
    LinearInterpolator::from_profile(profile)?.sample_grid(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reproduces_linear_data_exactly() {
        let x = vec![0.0, 0.25, 0.6, 1.0];
        let h: Vec<f64> = x.iter().map(|x| 2.0 * x - 1.0).collect();
        let interp = LinearInterpolator::new(&x, &h).unwrap();
        for &t in &[0.0, 0.1, 0.25, 0.5, 0.99, 1.0] {
            assert_relative_eq!(interp.sample(t).unwrap(), 2.0 * t - 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn midpoint_of_a_kink() {
        let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 2.0, 0.0]).unwrap();
        assert_relative_eq!(interp.sample(0.5).unwrap(), 1.0, epsilon = 1e-14);
        assert_relative_eq!(interp.sample(1.5).unwrap(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn never_extrapolates() {
        let interp = LinearInterpolator::new(&[0.0, 1.0], &[1.0, 0.0]).unwrap();
        assert!(interp.sample(-0.1).is_err());
        assert!(interp.sample(1.1).is_err());
        assert!(interp.sample(f64::NAN).is_err());
        assert!(LinearInterpolator::new(&[0.0, 0.0], &[1.0, 0.0]).is_err());
    }
}
