//! Influence functions: nonnegative kernels with compact support of radius
//! `r`, normalised so their integral over the support equals one.

use crate::Real;
use nalgebra::Point2;
use numeric_literals::replace_float_literals;

fn binomial(n: u32, k: u32) -> f64 {
    let mut result = 1.0f64;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// The moment `sum_k C(q, k) (-1)^k / (p k + s)` that appears in the
/// closed-form normalisation of the polynomial kernel.
fn alternating_moment(p: u32, q: u32, s: u32) -> f64 {
    (0..=q)
        .map(|k| {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            sign * binomial(q, k) / (p * k + s) as f64
        })
        .sum()
}

/// Polynomial bump `phi(x, y) = A (1 - (|x - y| / r)^p)^q` on the disk of
/// radius `r`, zero outside; `A` normalises the integral over the disk to 1.
#[derive(Debug, Clone, Copy)]
pub struct Polynomial<T> {
    radius: T,
    p: u32,
    q: u32,
    norm: T,
}

impl<T: Real> Polynomial<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn new(radius: T, p: u32, q: u32) -> Self {
        assert!(radius > T::zero(), "influence radius must be positive");
        assert!(p > 0 && q > 0, "polynomial exponents must be positive");
        // integral over the disk = 2 pi r^2 * sum_k C(q,k) (-1)^k / (p k + 2)
        let moment = T::from_f64(alternating_moment(p, q, 2)).unwrap();
        let norm = 1.0 / (2.0 * T::pi() * radius * radius * moment);
        Self { radius, p, q, norm }
    }

    pub fn radius(&self) -> T {
        self.radius
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate(&self, x: &Point2<T>, y: &Point2<T>) -> T {
        let distance = (*x - *y).norm();
        if distance > self.radius {
            return 0.0;
        }
        let h = 1.0 - (distance / self.radius).powi(self.p as i32);
        self.norm * h.powi(self.q as i32)
    }
}

/// One-dimensional polynomial bump, normalised over the segment
/// `[-r, r]`.
#[derive(Debug, Clone, Copy)]
pub struct Polynomial1d<T> {
    radius: T,
    p: u32,
    q: u32,
    norm: T,
}

impl<T: Real> Polynomial1d<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn new(radius: T, p: u32, q: u32) -> Self {
        assert!(radius > T::zero(), "influence radius must be positive");
        assert!(p > 0 && q > 0, "polynomial exponents must be positive");
        // integral over [-r, r] = 2 r * sum_k C(q,k) (-1)^k / (p k + 1)
        let moment = T::from_f64(alternating_moment(p, q, 1)).unwrap();
        let norm = 1.0 / (2.0 * radius * moment);
        Self { radius, p, q, norm }
    }

    pub fn radius(&self) -> T {
        self.radius
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate(&self, x: T, y: T) -> T {
        let distance = (x - y).abs();
        if distance > self.radius {
            return 0.0;
        }
        let h = 1.0 - (distance / self.radius).powi(self.p as i32);
        self.norm * h.powi(self.q as i32)
    }
}
