//! Second-order Taylor jets for forward-mode differentiation in one variable.
//!
//! A jet `(v, d1, d2)` carries a value together with its first and second derivative with respect
//! to the independent variable. Pushing the seed `(x, 1, 0)` through a composition of jet
//! operations yields `(f(x), f'(x), f''(x))` exactly, without truncation error.
use std::ops::{Add, Mul};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Jet {
    pub v: f64,
    pub d1: f64,
    pub d2: f64,
}

impl Jet {
    pub fn new(v: f64, d1: f64, d2: f64) -> Self {
        Jet { v, d1, d2 }
    }
    pub fn constant(c: f64) -> Self {
        Jet::new(c, 0.0, 0.0)
    }
    /// the independent variable itself
    pub fn variable(x: f64) -> Self {
        Jet::new(x, 1.0, 0.0)
    }

    pub fn tanh(self) -> Self {
        let t = self.v.tanh();
        let u = 1.0 - t * t;
        Jet::new(t, u * self.d1, u * self.d2 - 2.0 * t * u * self.d1 * self.d1)
    }

    /// Pulls the gradient `g` of some scalar with respect to `tanh(self)` back onto `self`.
    pub fn tanh_backward(self, g: Jet) -> Jet {
        let t = self.v.tanh();
        let u = 1.0 - t * t;
        let (z1, z2) = (self.d1, self.d2);
        Jet::new(
            g.v * u
                + g.d1 * (-2.0 * t * u * z1)
                + g.d2 * (-2.0 * t * u * z2 - 2.0 * u * (u - 2.0 * t * t) * z1 * z1),
            g.d1 * u + g.d2 * (-4.0 * t * u * z1),
            g.d2 * u,
        )
    }
}

impl Add for Jet {
    type Output = Jet;
    fn add(self, o: Jet) -> Jet {
        Jet::new(self.v + o.v, self.d1 + o.d1, self.d2 + o.d2)
    }
}

impl Mul for Jet {
    type Output = Jet;
    /// Leibniz rule
    fn mul(self, o: Jet) -> Jet {
        Jet::new(
            self.v * o.v,
            self.d1 * o.v + self.v * o.d1,
            self.d2 * o.v + 2.0 * self.d1 * o.d1 + self.v * o.d2,
        )
    }
}

impl Mul<f64> for Jet {
    type Output = Jet;
    fn mul(self, c: f64) -> Jet {
        Jet::new(self.v * c, self.d1 * c, self.d2 * c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tanh_of_affine_matches_analytic_derivatives() {
        for &x in &[-1.3, -0.2, 0.0, 0.4, 2.1] {
            let j = (Jet::variable(x) * 3.0 + Jet::constant(1.0)).tanh();
            let t = (3.0 * x + 1.0_f64).tanh();
            let u = 1.0 - t * t;
            assert_relative_eq!(j.v, t, epsilon = 1e-14);
            assert_relative_eq!(j.d1, 3.0 * u, epsilon = 1e-13);
            assert_relative_eq!(j.d2, -18.0 * t * u, epsilon = 1e-12);
        }
    }

    #[test]
    fn product_rule() {
        let x = 0.7;
        // x^2 * tanh(x)
        let xj = Jet::variable(x);
        let f = xj * xj * xj.tanh();
        let t = x.tanh();
        let u = 1.0 - t * t;
        let d1 = 2.0 * x * t + x * x * u;
        let d2 = 2.0 * t + 4.0 * x * u - 2.0 * x * x * t * u;
        assert_relative_eq!(f.v, x * x * t, epsilon = 1e-14);
        assert_relative_eq!(f.d1, d1, epsilon = 1e-13);
        assert_relative_eq!(f.d2, d2, epsilon = 1e-12);
    }

    #[test]
    fn tanh_backward_matches_finite_differences() {
        let z = Jet::new(0.3, -0.8, 1.7);
        let g = Jet::new(0.5, -1.1, 0.9);
        // scalar functional  <g, tanh(z)>
        let phi = |z: Jet| {
            let a = z.tanh();
            g.v * a.v + g.d1 * a.d1 + g.d2 * a.d2
        };
        let back = z.tanh_backward(g);
        let eps = 1e-6;
        let fd_v = (phi(Jet::new(z.v + eps, z.d1, z.d2)) - phi(Jet::new(z.v - eps, z.d1, z.d2)))
            / (2.0 * eps);
        let fd_d1 = (phi(Jet::new(z.v, z.d1 + eps, z.d2)) - phi(Jet::new(z.v, z.d1 - eps, z.d2)))
            / (2.0 * eps);
        let fd_d2 = (phi(Jet::new(z.v, z.d1, z.d2 + eps)) - phi(Jet::new(z.v, z.d1, z.d2 - eps)))
            / (2.0 * eps);
        assert_relative_eq!(back.v, fd_v, epsilon = 1e-8);
        assert_relative_eq!(back.d1, fd_d1, epsilon = 1e-8);
        assert_relative_eq!(back.d2, fd_d2, epsilon = 1e-8);
    }
}
