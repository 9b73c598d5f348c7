//! Two-pass assembly of the partitioned sparse system.
//!
//! Rows are `DoF * node + component`. Entries with `col < row` are dropped
//! (symmetric upper-triangular storage). Couplings whose column belongs to a
//! first-kind (Dirichlet) degree of freedom are routed into `K_bound`
//! instead of `K_inner`; Dirichlet rows keep an exact 1 on the `K_inner`
//! diagonal so they hold the prescribed value through the solve.
//!
//! The stencil is a property of the connectivity (plus the neighbour
//! relation when the nonlocal weight is active), so it is computed once in a
//! symbolic pass that only counts columns per row; the numeric pass repeats
//! the identical traversal, appending each column once and accumulating the
//! integral contributions in place. Both passes parallelise over the owned
//! row-node range; every row is written by exactly one task.

use crate::{Error, Real, Result};
use nalgebra::{SMatrix, SVector};
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

/// Local weights above this threshold disable the nonlocal term entirely.
pub const MAX_LOCAL_WEIGHT: f64 = 0.999;

/// Whether the given local weight activates the nonlocal stencil.
pub fn is_nonlocal<T: Real>(local_weight: T) -> bool {
    local_weight < T::from_f64(MAX_LOCAL_WEIGHT).unwrap()
}

/// Connectivity view the assembler traverses.
///
/// Implemented by the 2D mesh proxy and the 1D mesh, so both share the same
/// two-pass engine and stencil rules.
pub trait Topology {
    fn nodes_count(&self) -> usize;

    /// Owned `[first_node, last_node)` row-node range.
    fn owned_range(&self) -> (usize, usize);

    /// Calls `f(element, local_index)` for every element incident on `node`.
    fn for_each_incident(&self, node: usize, f: &mut dyn FnMut(usize, usize));

    fn element_nodes_count(&self, e: usize) -> usize;

    fn node_number(&self, e: usize, i: usize) -> usize;

    /// Calls `f(neighbor)` for every element within the nonlocal radius of
    /// `e` (including `e` itself).
    fn for_each_neighbor(&self, e: usize, f: &mut dyn FnMut(usize));
}

/// The assembled pair: interior block (upper triangular) and
/// interior-Dirichlet coupling block.
#[derive(Debug)]
pub struct SystemMatrices<T> {
    pub inner: CsrMatrix<T>,
    pub bound: CsrMatrix<T>,
}

/// Where a `(row, col)` pair is stored.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Route {
    Inner,
    Bound,
    /// Dirichlet identity diagonal: stored in `K_inner` with value 1.
    Diagonal,
    Skip,
}

/// Stamp-based "already seen columns" set.
///
/// Rows are processed exactly once each, so the row index itself serves as
/// the stamp; resetting between rows costs nothing.
struct StampSet {
    stamp: Vec<usize>,
    position: Vec<usize>,
}

impl StampSet {
    fn new(columns: usize) -> Self {
        Self {
            stamp: vec![usize::MAX; columns],
            position: vec![0; columns],
        }
    }

    #[inline]
    fn position(&self, row: usize, col: usize) -> Option<usize> {
        (self.stamp[col] == row).then(|| self.position[col])
    }

    #[inline]
    fn record(&mut self, row: usize, col: usize, position: usize) {
        self.stamp[col] = row;
        self.position[col] = position;
    }
}

struct Scratch<T> {
    inner: StampSet,
    bound: StampSet,
    sort_buffer: Vec<(usize, T)>,
}

impl<T> Scratch<T> {
    fn new(columns: usize) -> Self {
        Self {
            inner: StampSet::new(columns),
            bound: StampSet::new(columns),
            sort_buffer: Vec::new(),
        }
    }
}

/// Two-pass assembler of `K_inner` / `K_bound` for a fixed number of degrees
/// of freedom per node.
pub struct CsrPairAssembler<'a, Topo, const DOF: usize> {
    topology: &'a Topo,
    inner_dofs: Vec<bool>,
    neumann: bool,
}

impl<'a, Topo, const DOF: usize> CsrPairAssembler<'a, Topo, DOF>
where
    Topo: Topology + Sync,
{
    /// `inner_dofs[DoF * node + c]` is false exactly when that degree of
    /// freedom carries a first-kind boundary condition. For pure-Neumann
    /// problems (`neumann = true`) the system is augmented with `DoF` extra
    /// rows/columns pinning the solution mean.
    pub fn new(topology: &'a Topo, inner_dofs: Vec<bool>, neumann: bool) -> Result<Self> {
        let expected = DOF * topology.nodes_count();
        if inner_dofs.len() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                found: inner_dofs.len(),
            });
        }
        Ok(Self {
            topology,
            inner_dofs,
            neumann,
        })
    }

    #[inline]
    fn route(&self, row: usize, col: usize) -> Route {
        let inner_row = self.inner_dofs[row];
        let inner_col = self.inner_dofs[col];
        if inner_row && inner_col {
            if row <= col {
                Route::Inner
            } else {
                Route::Skip
            }
        } else if row != col {
            if !inner_col {
                Route::Bound
            } else {
                Route::Skip
            }
        } else {
            Route::Diagonal
        }
    }

    /// Runs both passes and returns the assembled pair.
    ///
    /// `local_rule(e, i, j)` and `nonlocal_rule(eL, eNL, iL, jNL)` return the
    /// `DoF x DoF` component block of the respective bilinear form;
    /// `mean_rule(e, i)` returns `integral(N_i)` restricted to element `e`
    /// and feeds the Neumann augmentation column.
    pub fn assemble<T, L, NL, M>(
        &self,
        nonlocal: bool,
        local_rule: L,
        nonlocal_rule: NL,
        mean_rule: M,
    ) -> Result<SystemMatrices<T>>
    where
        T: Real + Send + Sync,
        L: Fn(usize, usize, usize) -> SMatrix<T, DOF, DOF> + Sync,
        NL: Fn(usize, usize, usize, usize) -> SMatrix<T, DOF, DOF> + Sync,
        M: Fn(usize, usize) -> T + Sync,
    {
        let nodes_count = self.topology.nodes_count();
        let (first, last) = self.topology.owned_range();
        let owned = last - first;

        // The augmentation rows live on the rank that owns the tail of the
        // node range.
        let aug_rows = if self.neumann && last == nodes_count { DOF } else { 0 };
        let rows_local = DOF * owned + aug_rows;
        let ncols_inner = DOF * nodes_count + if self.neumann { DOF } else { 0 };
        let ncols_bound = DOF * nodes_count;

        // Pass S: count entries per row.
        let mut outer_inner = vec![0usize; rows_local + 1];
        let mut outer_bound = vec![0usize; rows_local + 1];
        {
            let counts_inner = &mut outer_inner[1..1 + DOF * owned];
            let counts_bound = &mut outer_bound[1..1 + DOF * owned];
            counts_inner
                .par_chunks_mut(DOF)
                .zip(counts_bound.par_chunks_mut(DOF))
                .enumerate()
                .for_each_init(
                    || Scratch::<T>::new(DOF * nodes_count),
                    |scratch, (k, (ci, cb))| {
                        self.count_node(first + k, nonlocal, ci, cb, scratch);
                    },
                );
        }
        for i in 0..rows_local {
            outer_inner[i + 1] += outer_inner[i];
            outer_bound[i + 1] += outer_bound[i];
        }

        let nnz_inner = outer_inner[rows_local];
        let nnz_bound = outer_bound[rows_local];
        log::debug!(
            "assembled stencil: {} rows, {} interior and {} boundary-coupling entries",
            rows_local,
            nnz_inner,
            nnz_bound
        );

        let mut indices_inner = vec![0usize; nnz_inner];
        let mut values_inner = vec![T::zero(); nnz_inner];
        let mut indices_bound = vec![0usize; nnz_bound];
        let mut values_bound = vec![T::zero(); nnz_bound];

        // Pass N: identical traversal, appending columns and accumulating
        // the integrals. Rows are pre-split into disjoint slices so the
        // parallel tasks never share a write target.
        {
            let mut rows_inner = split_rows(&outer_inner, &mut indices_inner, &mut values_inner);
            let mut rows_bound = split_rows(&outer_bound, &mut indices_bound, &mut values_bound);
            rows_inner
                .par_chunks_mut(DOF)
                .zip(rows_bound.par_chunks_mut(DOF))
                .enumerate()
                .for_each_init(
                    || Scratch::<T>::new(DOF * nodes_count),
                    |scratch, (k, (ri, rb))| {
                        if k < owned {
                            self.fill_node(
                                first + k,
                                nonlocal,
                                ri,
                                rb,
                                scratch,
                                &local_rule,
                                &nonlocal_rule,
                                &mean_rule,
                            );
                        }
                    },
                );
        }

        let inner = CsrMatrix::try_from_csr_data(rows_local, ncols_inner, outer_inner, indices_inner, values_inner)
            .expect("CSR data must be valid by construction");
        let bound = CsrMatrix::try_from_csr_data(rows_local, ncols_bound, outer_bound, indices_bound, values_bound)
            .expect("CSR data must be valid by construction");
        Ok(SystemMatrices { inner, bound })
    }

    fn count_node<T>(
        &self,
        node: usize,
        nonlocal: bool,
        counts_inner: &mut [usize],
        counts_bound: &mut [usize],
        scratch: &mut Scratch<T>,
    ) {
        let mut mark = |col_node: usize| {
            for c_row in 0..DOF {
                let row = DOF * node + c_row;
                for c_col in 0..DOF {
                    let col = DOF * col_node + c_col;
                    match self.route(row, col) {
                        Route::Inner | Route::Diagonal => {
                            if scratch.inner.position(row, col).is_none() {
                                scratch.inner.record(row, col, 0);
                                counts_inner[c_row] += 1;
                            }
                        }
                        Route::Bound => {
                            if scratch.bound.position(row, col).is_none() {
                                scratch.bound.record(row, col, 0);
                                counts_bound[c_row] += 1;
                            }
                        }
                        Route::Skip => {}
                    }
                }
            }
        };

        self.topology.for_each_incident(node, &mut |e, _i| {
            if nonlocal {
                self.topology.for_each_neighbor(e, &mut |e_nl| {
                    for j in 0..self.topology.element_nodes_count(e_nl) {
                        mark(self.topology.node_number(e_nl, j));
                    }
                });
            } else {
                for j in 0..self.topology.element_nodes_count(e) {
                    mark(self.topology.node_number(e, j));
                }
            }
        });

        if self.neumann {
            // One augmentation column per component row.
            for count in counts_inner.iter_mut().take(DOF) {
                *count += 1;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_node<T, L, NL, M>(
        &self,
        node: usize,
        nonlocal: bool,
        rows_inner: &mut [(&mut [usize], &mut [T])],
        rows_bound: &mut [(&mut [usize], &mut [T])],
        scratch: &mut Scratch<T>,
        local_rule: &L,
        nonlocal_rule: &NL,
        mean_rule: &M,
    ) where
        T: Real,
        L: Fn(usize, usize, usize) -> SMatrix<T, DOF, DOF>,
        NL: Fn(usize, usize, usize, usize) -> SMatrix<T, DOF, DOF>,
        M: Fn(usize, usize) -> T,
    {
        let mut cursor_inner = [0usize; DOF];
        let mut cursor_bound = [0usize; DOF];

        {
            let mut add_block = |col_node: usize, block: &SMatrix<T, DOF, DOF>| {
                for c_row in 0..DOF {
                    let row = DOF * node + c_row;
                    for c_col in 0..DOF {
                        let col = DOF * col_node + c_col;
                        match self.route(row, col) {
                            Route::Inner => {
                                if let Some(pos) = scratch.inner.position(row, col) {
                                    rows_inner[c_row].1[pos] += block[(c_row, c_col)];
                                } else {
                                    let pos = cursor_inner[c_row];
                                    rows_inner[c_row].0[pos] = col;
                                    rows_inner[c_row].1[pos] = block[(c_row, c_col)];
                                    scratch.inner.record(row, col, pos);
                                    cursor_inner[c_row] += 1;
                                }
                            }
                            Route::Diagonal => {
                                // Identity row holding the Dirichlet value.
                                if scratch.inner.position(row, col).is_none() {
                                    let pos = cursor_inner[c_row];
                                    rows_inner[c_row].0[pos] = col;
                                    rows_inner[c_row].1[pos] = T::one();
                                    scratch.inner.record(row, col, pos);
                                    cursor_inner[c_row] += 1;
                                }
                            }
                            Route::Bound => {
                                if let Some(pos) = scratch.bound.position(row, col) {
                                    rows_bound[c_row].1[pos] += block[(c_row, c_col)];
                                } else {
                                    let pos = cursor_bound[c_row];
                                    rows_bound[c_row].0[pos] = col;
                                    rows_bound[c_row].1[pos] = block[(c_row, c_col)];
                                    scratch.bound.record(row, col, pos);
                                    cursor_bound[c_row] += 1;
                                }
                            }
                            Route::Skip => {}
                        }
                    }
                }
            };

            self.topology.for_each_incident(node, &mut |e, i| {
                for j in 0..self.topology.element_nodes_count(e) {
                    let block = local_rule(e, i, j);
                    add_block(self.topology.node_number(e, j), &block);
                }
                if nonlocal {
                    self.topology.for_each_neighbor(e, &mut |e_nl| {
                        for j in 0..self.topology.element_nodes_count(e_nl) {
                            let block = nonlocal_rule(e, e_nl, i, j);
                            add_block(self.topology.node_number(e_nl, j), &block);
                        }
                    });
                }
            });
        }

        if self.neumann {
            let mut mean = T::zero();
            self.topology.for_each_incident(node, &mut |e, i| {
                mean += mean_rule(e, i);
            });
            let aug_base = DOF * self.topology.nodes_count();
            for c_row in 0..DOF {
                let pos = cursor_inner[c_row];
                rows_inner[c_row].0[pos] = aug_base + c_row;
                rows_inner[c_row].1[pos] = mean;
                cursor_inner[c_row] += 1;
            }
        }

        for c_row in 0..DOF {
            debug_assert_eq!(cursor_inner[c_row], rows_inner[c_row].0.len());
            debug_assert_eq!(cursor_bound[c_row], rows_bound[c_row].0.len());
            let (cols, vals) = &mut rows_inner[c_row];
            sort_row(cols, vals, &mut scratch.sort_buffer);
            let (cols, vals) = &mut rows_bound[c_row];
            sort_row(cols, vals, &mut scratch.sort_buffer);
        }
    }
}

/// Splits flat CSR storage into disjoint per-row slices.
fn split_rows<'b, T>(
    outer: &[usize],
    indices: &'b mut [usize],
    values: &'b mut [T],
) -> Vec<(&'b mut [usize], &'b mut [T])> {
    let mut rows = Vec::with_capacity(outer.len().saturating_sub(1));
    let mut indices_rest = indices;
    let mut values_rest = values;
    for window in outer.windows(2) {
        let len = window[1] - window[0];
        let (cols, tail) = std::mem::take(&mut indices_rest).split_at_mut(len);
        indices_rest = tail;
        let (vals, tail) = std::mem::take(&mut values_rest).split_at_mut(len);
        values_rest = tail;
        rows.push((cols, vals));
    }
    rows
}

/// Sorts a row's column/value pairs by column index.
fn sort_row<T: Copy>(cols: &mut [usize], vals: &mut [T], buffer: &mut Vec<(usize, T)>) {
    buffer.clear();
    buffer.extend(cols.iter().copied().zip(vals.iter().copied()));
    buffer.sort_unstable_by_key(|&(col, _)| col);
    for (k, &(col, val)) in buffer.iter().enumerate() {
        cols[k] = col;
        vals[k] = val;
    }
}

/// Accumulates per-node integrals of the right-hand side into the owned
/// block of `f`, whose layout is `DoF * (node - first_node) + component`.
pub fn integrate_right_part<T, Topo, F, const DOF: usize>(f: &mut [T], topology: &Topo, rule: F)
where
    T: Real + Send + Sync,
    Topo: Topology + Sync,
    F: Fn(usize, usize) -> SVector<T, DOF> + Sync,
{
    let (first, last) = topology.owned_range();
    let owned = last - first;
    assert!(f.len() >= DOF * owned, "right-hand side too short for the owned node range");
    f[..DOF * owned]
        .par_chunks_mut(DOF)
        .enumerate()
        .for_each(|(k, f_node)| {
            let node = first + k;
            topology.for_each_incident(node, &mut |e, i| {
                let integral = rule(e, i);
                for (c, f_c) in f_node.iter_mut().enumerate() {
                    *f_c += integral[c];
                }
            });
        });
}
