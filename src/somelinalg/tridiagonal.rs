#![allow(non_snake_case)]
use nalgebra::DVector;

/// Banded matrix with one sub- and one super-diagonal, stored by diagonals.
///
/// Row `i` reads `lower[i] * x[i-1] + diag[i] * x[i] + upper[i] * x[i+1]`;
/// `lower[0]` and `upper[n-1]` are never touched.
/// LU factorization without pivoting (Thomas algorithm): O(n) instead of the O(n^3) dense LU,
/// fine for the diagonally dominant Jacobians of discretized second-order BVPs.
#[derive(Debug, Clone, PartialEq)]
pub struct Tridiagonal {
    pub lower: Vec<f64>,
    pub diag: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Tridiagonal {
    pub fn zeros(n: usize) -> Self {
        Tridiagonal {
            lower: vec![0.0; n],
            diag: vec![0.0; n],
            upper: vec![0.0; n],
        }
    }

    pub fn n(&self) -> usize {
        self.diag.len()
    }

    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        let n = self.n();
        DVector::from_fn(n, |i, _| {
            let mut s = self.diag[i] * x[i];
            if i > 0 {
                s += self.lower[i] * x[i - 1];
            }
            if i + 1 < n {
                s += self.upper[i] * x[i + 1];
            }
            s
        })
    }

    /// Solves `A x = b`. Returns `None` on a zero (or vanishing) pivot.
    pub fn solve(&self, b: &DVector<f64>) -> Option<DVector<f64>> {
        let n = self.n();
        if n == 0 || b.len() != n {
            return None;
        }
        let mut c_star = vec![0.0; n];
        let mut d_star = vec![0.0; n];

        let mut pivot = self.diag[0];
        if pivot.abs() < f64::MIN_POSITIVE {
            return None;
        }
        c_star[0] = self.upper[0] / pivot;
        d_star[0] = b[0] / pivot;
        // forward sweep
        for i in 1..n {
            pivot = self.diag[i] - self.lower[i] * c_star[i - 1];
            if pivot.abs() < f64::MIN_POSITIVE || !pivot.is_finite() {
                return None;
            }
            c_star[i] = if i + 1 < n { self.upper[i] / pivot } else { 0.0 };
            d_star[i] = (b[i] - self.lower[i] * d_star[i - 1]) / pivot;
        }
        // back substitution
        let mut x = DVector::zeros(n);
        x[n - 1] = d_star[n - 1];
        for i in (0..n - 1).rev() {
            x[i] = d_star[i] - c_star[i] * x[i + 1];
        }
        Some(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    #[test]
    fn matches_dense_lu() {
        let n = 8;
        let mut A = Tridiagonal::zeros(n);
        for i in 0..n {
            A.diag[i] = 4.0 + i as f64 * 0.1;
            A.lower[i] = -1.0 - 0.05 * i as f64;
            A.upper[i] = -0.7;
        }
        let mut dense = DMatrix::zeros(n, n);
        for i in 0..n {
            dense[(i, i)] = A.diag[i];
            if i > 0 {
                dense[(i, i - 1)] = A.lower[i];
            }
            if i + 1 < n {
                dense[(i, i + 1)] = A.upper[i];
            }
        }
        let b = DVector::from_fn(n, |i, _| (i as f64).sin() + 1.0);
        let x = A.solve(&b).unwrap();
        let x_dense = dense.lu().solve(&b).unwrap();
        for i in 0..n {
            assert_relative_eq!(x[i], x_dense[i], epsilon = 1e-12);
        }
        let back = A.mul_vec(&x);
        for i in 0..n {
            assert_relative_eq!(back[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_pivot_is_reported() {
        let mut A = Tridiagonal::zeros(3);
        A.diag = vec![0.0, 1.0, 1.0];
        assert!(A.solve(&DVector::from_vec(vec![1.0, 1.0, 1.0])).is_none());
        assert!(A.solve(&DVector::from_vec(vec![1.0])).is_none());
    }
}
