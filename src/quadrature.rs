//! Gauss-Legendre quadrature rules on the reference interval `[-1, 1]`.

use crate::Real;
use std::f64::consts::PI;

/// Recurrence relation for Legendre polynomials.
///
/// The derivative formula is undefined at |x| == 1, so the recurrence is only
/// suitable for evaluation in the open interval (-1, 1).
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // p_n(x)
    p1: f64,
    // p_{n-1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    fn evaluate(n: usize, x: f64) -> Self {
        // m P_m(x) = (2m - 1) x P_{m-1}(x) - (m - 1) P_{m-2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        let mut p3;
        for m in 1..=n {
            let m = m as f64;
            p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }
        Self { n, x, p1, p2 }
    }

    fn value_and_derivative(&self) -> (f64, f64) {
        let Self { n, x, p1, p2 } = self;
        let n = *n as f64;
        // dp_n/dx (x) = n (x p_n(x) - p_{n-1}(x)) / (x^2 - 1)
        (*p1, n * (x * p1 - p2) / (x * x - 1.0))
    }
}

/// A Gauss quadrature rule on `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussRule<T> {
    weights: Vec<T>,
    points: Vec<T>,
}

impl<T: Real> GaussRule<T> {
    /// Constructs the Gauss-Legendre rule with the given number of points.
    ///
    /// With `n` points the rule integrates polynomials of order up to
    /// `2n - 1` exactly.
    ///
    /// # Panics
    ///
    /// Panics if zero points are requested.
    pub fn gauss(num_points: usize) -> Self {
        let n = num_points;
        assert!(n > 0, "number of quadrature points must be positive");

        let m = (n + 1) / 2;
        let mut points = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);

        // Only the first m roots are computed; the rest follow by symmetry.
        for i in 0..m {
            let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            let (mut p, mut dp) = LegendreRecurrence::evaluate(n, x).value_and_derivative();

            // Newton's method, starting from an accurate initial guess
            loop {
                let dx = -p / dp;
                x += dx;
                let (p_new, dp_new) = LegendreRecurrence::evaluate(n, x).value_and_derivative();
                p = p_new;
                dp = dp_new;
                if dx.abs() <= 1e-15 {
                    break;
                }
            }

            let w = 2.0 / ((1.0 - x * x) * dp * dp);
            points.push(x);
            weights.push(w);
        }

        for i in m..n {
            let mirror = n - i - 1;
            points.push(-points[mirror]);
            weights.push(weights[mirror]);
        }

        Self {
            weights: weights
                .into_iter()
                .map(|w| T::from_f64(w).expect("weight must fit in T"))
                .collect(),
            points: points
                .into_iter()
                .map(|x| T::from_f64(x).expect("point must fit in T"))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight(&self, q: usize) -> T {
        self.weights[q]
    }

    pub fn point(&self, q: usize) -> T {
        self.points[q]
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn points(&self) -> &[T] {
        &self.points
    }

    /// Approximates the integral of `f` over `[-1, 1]`.
    pub fn integrate(&self, f: impl Fn(T) -> T) -> T {
        let mut integral = T::zero();
        for (&w, &x) in self.weights.iter().zip(&self.points) {
            integral += w * f(x);
        }
        integral
    }
}
