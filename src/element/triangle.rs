//! Shape functions on the unit reference triangle `(0,0) - (1,0) - (0,1)`.
//!
//! Written in barycentric form: `L0 = 1 - xi - eta`, `L1 = xi`, `L2 = eta`.
//! The quadratic triangle orders corners first, then the mid-side nodes of
//! edges 0-1, 1-2, 2-0.

use crate::Real;
use numeric_literals::replace_float_literals;

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn linear_node<T: Real>(i: usize) -> (T, T) {
    match i {
        0 => (0.0, 0.0),
        1 => (1.0, 0.0),
        2 => (0.0, 1.0),
        _ => panic!("triangle has 3 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn linear_n<T: Real>(i: usize, xi: T, eta: T) -> T {
    match i {
        0 => 1.0 - xi - eta,
        1 => xi,
        2 => eta,
        _ => panic!("triangle has 3 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn linear_n_xi<T: Real>(i: usize) -> T {
    match i {
        0 => -1.0,
        1 => 1.0,
        2 => 0.0,
        _ => panic!("triangle has 3 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn linear_n_eta<T: Real>(i: usize) -> T {
    match i {
        0 => -1.0,
        1 => 0.0,
        2 => 1.0,
        _ => panic!("triangle has 3 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn quadratic_node<T: Real>(i: usize) -> (T, T) {
    match i {
        0 => (0.0, 0.0),
        1 => (1.0, 0.0),
        2 => (0.0, 1.0),
        3 => (0.5, 0.0),
        4 => (0.5, 0.5),
        5 => (0.0, 0.5),
        _ => panic!("quadratic triangle has 6 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn quadratic_n<T: Real>(i: usize, xi: T, eta: T) -> T {
    let l0 = 1.0 - xi - eta;
    match i {
        0 => l0 * (2.0 * l0 - 1.0),
        1 => xi * (2.0 * xi - 1.0),
        2 => eta * (2.0 * eta - 1.0),
        3 => 4.0 * l0 * xi,
        4 => 4.0 * xi * eta,
        5 => 4.0 * eta * l0,
        _ => panic!("quadratic triangle has 6 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn quadratic_n_xi<T: Real>(i: usize, xi: T, eta: T) -> T {
    let l0 = 1.0 - xi - eta;
    match i {
        0 => 1.0 - 4.0 * l0,
        1 => 4.0 * xi - 1.0,
        2 => 0.0,
        3 => 4.0 * (l0 - xi),
        4 => 4.0 * eta,
        5 => -4.0 * eta,
        _ => panic!("quadratic triangle has 6 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn quadratic_n_eta<T: Real>(i: usize, xi: T, eta: T) -> T {
    let l0 = 1.0 - xi - eta;
    match i {
        0 => 1.0 - 4.0 * l0,
        1 => 0.0,
        2 => 4.0 * eta - 1.0,
        3 => -4.0 * xi,
        4 => 4.0 * xi,
        5 => 4.0 * (l0 - eta),
        _ => panic!("quadratic triangle has 6 nodes"),
    }
}
