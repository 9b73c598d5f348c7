//! Shape functions on the biunit reference square `[-1, 1]^2`.
//!
//! Nodes are ordered counter-clockwise starting from `(-1, -1)`, with edge
//! nodes interleaved between the corners. Shape functions are written as
//! closures over the node position `(a, b)` so each family is a single
//! formula, following the `N_{alpha,beta}([alpha, beta]) = 1` convention.

use crate::Real;
use numeric_literals::replace_float_literals;

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn bilinear_node<T: Real>(i: usize) -> (T, T) {
    match i {
        0 => (-1.0, -1.0),
        1 => (1.0, -1.0),
        2 => (1.0, 1.0),
        3 => (-1.0, 1.0),
        _ => panic!("bilinear quad has 4 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn bilinear_n<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (a, b) = bilinear_node::<T>(i);
    (1.0 + a * xi) * (1.0 + b * eta) / 4.0
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn bilinear_n_xi<T: Real>(i: usize, _xi: T, eta: T) -> T {
    let (a, b) = bilinear_node::<T>(i);
    a * (1.0 + b * eta) / 4.0
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn bilinear_n_eta<T: Real>(i: usize, xi: T, _eta: T) -> T {
    let (a, b) = bilinear_node::<T>(i);
    b * (1.0 + a * xi) / 4.0
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn serendipity_node<T: Real>(i: usize) -> (T, T) {
    match i {
        0 => (-1.0, -1.0),
        1 => (0.0, -1.0),
        2 => (1.0, -1.0),
        3 => (1.0, 0.0),
        4 => (1.0, 1.0),
        5 => (0.0, 1.0),
        6 => (-1.0, 1.0),
        7 => (-1.0, 0.0),
        _ => panic!("quadratic serendipity quad has 8 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn serendipity_n<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (a, b) = serendipity_node::<T>(i);
    if a == 0.0 {
        (1.0 - xi * xi) * (1.0 + b * eta) / 2.0
    } else if b == 0.0 {
        (1.0 + a * xi) * (1.0 - eta * eta) / 2.0
    } else {
        (1.0 + a * xi) * (1.0 + b * eta) * (a * xi + b * eta - 1.0) / 4.0
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn serendipity_n_xi<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (a, b) = serendipity_node::<T>(i);
    if a == 0.0 {
        -xi * (1.0 + b * eta)
    } else if b == 0.0 {
        a * (1.0 - eta * eta) / 2.0
    } else {
        a * (1.0 + b * eta) * (2.0 * a * xi + b * eta) / 4.0
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn serendipity_n_eta<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (a, b) = serendipity_node::<T>(i);
    if a == 0.0 {
        b * (1.0 - xi * xi) / 2.0
    } else if b == 0.0 {
        -eta * (1.0 + a * xi)
    } else {
        b * (1.0 + a * xi) * (a * xi + 2.0 * b * eta) / 4.0
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn lagrange_node<T: Real>(i: usize) -> (T, T) {
    if i == 8 {
        (0.0, 0.0)
    } else {
        serendipity_node::<T>(i)
    }
}

/// 1D quadratic Lagrange factor associated with the node coordinate
/// `alpha = -1, 0, 1`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn lagrange_phi_1d<T: Real>(alpha: T, x: T) -> T {
    let alpha2 = alpha * alpha;
    ((3.0 / 2.0) * alpha2 - 1.0) * x * x + (alpha / 2.0) * x + (1.0 - alpha2)
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn lagrange_phi_grad_1d<T: Real>(alpha: T, x: T) -> T {
    let alpha2 = alpha * alpha;
    (3.0 * alpha2 - 2.0) * x + alpha / 2.0
}

pub(crate) fn lagrange_n<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (a, b) = lagrange_node::<T>(i);
    lagrange_phi_1d(a, xi) * lagrange_phi_1d(b, eta)
}

pub(crate) fn lagrange_n_xi<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (a, b) = lagrange_node::<T>(i);
    lagrange_phi_grad_1d(a, xi) * lagrange_phi_1d(b, eta)
}

pub(crate) fn lagrange_n_eta<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (a, b) = lagrange_node::<T>(i);
    lagrange_phi_1d(a, xi) * lagrange_phi_grad_1d(b, eta)
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_node<T: Real>(i: usize) -> (T, T) {
    let third = 1.0 / 3.0;
    match i {
        0 => (-1.0, -1.0),
        1 => (-third, -1.0),
        2 => (third, -1.0),
        3 => (1.0, -1.0),
        4 => (1.0, -third),
        5 => (1.0, third),
        6 => (1.0, 1.0),
        7 => (third, 1.0),
        8 => (-third, 1.0),
        9 => (-1.0, 1.0),
        10 => (-1.0, third),
        11 => (-1.0, -third),
        _ => panic!("cubic serendipity quad has 12 nodes"),
    }
}

/// Which family a cubic serendipity node belongs to.
#[derive(Clone, Copy, PartialEq)]
enum CubicFamily {
    Corner,
    // a = +-1/3, b = +-1
    HorizontalEdge,
    // a = +-1, b = +-1/3
    VerticalEdge,
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn cubic_family<T: Real>(i: usize) -> (CubicFamily, T, T) {
    let (a, b) = cubic_node::<T>(i);
    let one = 1.0;
    let family = if a.abs() == one && b.abs() == one {
        CubicFamily::Corner
    } else if b.abs() == one {
        CubicFamily::HorizontalEdge
    } else {
        CubicFamily::VerticalEdge
    };
    (family, a, b)
}

// Edge profile (1 - x^2)(1 + 9 a x) and its derivatives.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn cubic_edge_profile<T: Real>(a: T, x: T) -> T {
    (1.0 - x * x) * (1.0 + 9.0 * a * x)
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn cubic_edge_profile_d1<T: Real>(a: T, x: T) -> T {
    9.0 * a - 2.0 * x - 27.0 * a * x * x
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn cubic_edge_profile_d2<T: Real>(a: T, x: T) -> T {
    -2.0 - 54.0 * a * x
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn cubic_edge_profile_d3<T: Real>(a: T) -> T {
    -54.0 * a
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => {
            (1.0 + a * xi) * (1.0 + b * eta) * (9.0 * (xi * xi + eta * eta) - 10.0) / 32.0
        }
        CubicFamily::HorizontalEdge => {
            9.0 / 32.0 * (1.0 + b * eta) * cubic_edge_profile(a, xi)
        }
        CubicFamily::VerticalEdge => {
            9.0 / 32.0 * (1.0 + a * xi) * cubic_edge_profile(b, eta)
        }
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_xi<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => {
            (1.0 + b * eta)
                * (a * (9.0 * (xi * xi + eta * eta) - 10.0) + 18.0 * xi * (1.0 + a * xi))
                / 32.0
        }
        CubicFamily::HorizontalEdge => 9.0 / 32.0 * (1.0 + b * eta) * cubic_edge_profile_d1(a, xi),
        CubicFamily::VerticalEdge => 9.0 / 32.0 * a * cubic_edge_profile(b, eta),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_eta<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => {
            (1.0 + a * xi)
                * (b * (9.0 * (xi * xi + eta * eta) - 10.0) + 18.0 * eta * (1.0 + b * eta))
                / 32.0
        }
        CubicFamily::HorizontalEdge => 9.0 / 32.0 * b * cubic_edge_profile(a, xi),
        CubicFamily::VerticalEdge => 9.0 / 32.0 * (1.0 + a * xi) * cubic_edge_profile_d1(b, eta),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_xi2<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => (1.0 + b * eta) * (18.0 + 54.0 * a * xi) / 32.0,
        CubicFamily::HorizontalEdge => 9.0 / 32.0 * (1.0 + b * eta) * cubic_edge_profile_d2(a, xi),
        CubicFamily::VerticalEdge => 0.0,
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_xieta<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => {
            (18.0 * a * eta * (1.0 + b * eta)
                + b * (a * (9.0 * (xi * xi + eta * eta) - 10.0) + 18.0 * xi * (1.0 + a * xi)))
                / 32.0
        }
        CubicFamily::HorizontalEdge => 9.0 / 32.0 * b * cubic_edge_profile_d1(a, xi),
        CubicFamily::VerticalEdge => 9.0 / 32.0 * a * cubic_edge_profile_d1(b, eta),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_eta2<T: Real>(i: usize, xi: T, eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => (1.0 + a * xi) * (18.0 + 54.0 * b * eta) / 32.0,
        CubicFamily::HorizontalEdge => 0.0,
        CubicFamily::VerticalEdge => 9.0 / 32.0 * (1.0 + a * xi) * cubic_edge_profile_d2(b, eta),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_xi3<T: Real>(i: usize, _xi: T, eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => 54.0 * a * (1.0 + b * eta) / 32.0,
        CubicFamily::HorizontalEdge => 9.0 / 32.0 * (1.0 + b * eta) * cubic_edge_profile_d3(a),
        CubicFamily::VerticalEdge => 0.0,
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_xi2eta<T: Real>(i: usize, xi: T, _eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => b * (18.0 + 54.0 * a * xi) / 32.0,
        CubicFamily::HorizontalEdge => 9.0 / 32.0 * b * cubic_edge_profile_d2(a, xi),
        CubicFamily::VerticalEdge => 0.0,
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_xieta2<T: Real>(i: usize, _xi: T, eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => a * (18.0 + 54.0 * b * eta) / 32.0,
        CubicFamily::HorizontalEdge => 0.0,
        CubicFamily::VerticalEdge => 9.0 / 32.0 * a * cubic_edge_profile_d2(b, eta),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn cubic_n_eta3<T: Real>(i: usize, xi: T, _eta: T) -> T {
    let (family, a, b) = cubic_family::<T>(i);
    match family {
        CubicFamily::Corner => 54.0 * b * (1.0 + a * xi) / 32.0,
        CubicFamily::HorizontalEdge => 0.0,
        CubicFamily::VerticalEdge => 9.0 / 32.0 * (1.0 + a * xi) * cubic_edge_profile_d3(b),
    }
}
