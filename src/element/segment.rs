//! Shape functions on the reference segment `[-1, 1]`.

use crate::Real;
use numeric_literals::replace_float_literals;

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn linear_node<T: Real>(i: usize) -> T {
    match i {
        0 => -1.0,
        1 => 1.0,
        _ => panic!("linear segment has 2 nodes"),
    }
}

/// Linear basis: `N_alpha(xi) = (1 + alpha xi) / 2` with `alpha = -1, 1`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn linear_n<T: Real>(i: usize, xi: T) -> T {
    let alpha = linear_node::<T>(i);
    (1.0 + alpha * xi) / 2.0
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn linear_n_xi<T: Real>(i: usize, _xi: T) -> T {
    linear_node::<T>(i) / 2.0
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn quadratic_node<T: Real>(i: usize) -> T {
    match i {
        0 => -1.0,
        1 => 0.0,
        2 => 1.0,
        _ => panic!("quadratic segment has 3 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn quadratic_n<T: Real>(i: usize, xi: T) -> T {
    match i {
        0 => xi * (xi - 1.0) / 2.0,
        1 => 1.0 - xi * xi,
        2 => xi * (xi + 1.0) / 2.0,
        _ => panic!("quadratic segment has 3 nodes"),
    }
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn quadratic_n_xi<T: Real>(i: usize, xi: T) -> T {
    match i {
        0 => xi - 0.5,
        1 => -2.0 * xi,
        2 => xi + 0.5,
        _ => panic!("quadratic segment has 3 nodes"),
    }
}
