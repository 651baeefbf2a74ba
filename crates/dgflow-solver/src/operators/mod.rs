//! Matrix-free spatial operators.
//!
//! Operators never store a global matrix. `apply_add` runs a parallel cell
//! loop over the per-cell dof blocks followed by a sequential face loop.
//! Diagonals and cell blocks default to probing with unit vectors, which
//! for face terms leaves the trace of the opposing cell at zero.
//!
//! ```text
//! LinearOperator          u -> A u
//!   └─ AffineOperator     u -> A u - b(t)   (b: inhomogeneous boundary data)
//! EvaluationOperator      u -> N(u, t)      (nonlinear)
//! ```

pub mod body_force;
pub mod convective;
pub mod coupling;
pub mod laplace;
pub mod mass;
pub mod set;

pub use body_force::BodyForceOperator;
pub use convective::{ConvectiveOperator, TransportOperator};
pub use coupling::{DivergenceOperator, GradientOperator};
pub use laplace::LaplaceOperator;
pub use mass::{InverseMassOperator, MassOperator};
pub use set::{DgNavierStokesOperators, DgScalarOperators, SpatialOperatorSet};

use nalgebra::{DMatrix, DVector};

use crate::space::DOFS_PER_CELL;

pub trait LinearOperator: Sync {
    fn n_dofs(&self) -> usize;

    /// `dst += A src`
    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>);

    /// `dst = A src`
    fn apply(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        dst.fill(0.0);
        self.apply_add(dst, src);
    }

    fn calculate_diagonal(&self, diagonal: &mut DVector<f64>) {
        diagonal.fill(0.0);
        self.add_diagonal(diagonal);
    }

    fn add_diagonal(&self, diagonal: &mut DVector<f64>) {
        let n = self.n_dofs();
        let mut unit = DVector::zeros(n);
        let mut column = DVector::zeros(n);
        for j in 0..n {
            unit[j] = 1.0;
            self.apply(&mut column, &unit);
            diagonal[j] += column[j];
            unit[j] = 0.0;
        }
    }

    /// Cell-local blocks, coupling to neighbouring cells dropped.
    fn calculate_block_diagonal(&self) -> Vec<DMatrix<f64>> {
        let n = self.n_dofs();
        let n_cells = n / DOFS_PER_CELL;
        let mut unit = DVector::zeros(n);
        let mut column = DVector::zeros(n);
        let mut blocks = vec![DMatrix::zeros(DOFS_PER_CELL, DOFS_PER_CELL); n_cells];
        for (cell, block) in blocks.iter_mut().enumerate() {
            for j in 0..DOFS_PER_CELL {
                let dof = DOFS_PER_CELL * cell + j;
                unit[dof] = 1.0;
                self.apply(&mut column, &unit);
                for i in 0..DOFS_PER_CELL {
                    block[(i, j)] = column[DOFS_PER_CELL * cell + i];
                }
                unit[dof] = 0.0;
            }
        }
        blocks
    }
}

pub trait AffineOperator: LinearOperator {
    /// Adds the inhomogeneous boundary contribution at `time` moved to the
    /// right-hand side.
    fn rhs_add(&self, dst: &mut DVector<f64>, time: f64);

    /// `dst = A src - b(time)`
    fn evaluate(&self, dst: &mut DVector<f64>, src: &DVector<f64>, time: f64) {
        let mut rhs = DVector::zeros(self.n_dofs());
        self.rhs_add(&mut rhs, time);
        self.apply(dst, src);
        *dst -= rhs;
    }
}

pub trait EvaluationOperator: Sync {
    fn n_dofs(&self) -> usize;

    fn evaluate_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>, time: f64);

    fn evaluate(&self, dst: &mut DVector<f64>, src: &DVector<f64>, time: f64) {
        dst.fill(0.0);
        self.evaluate_add(dst, src, time);
    }
}

/// `factor * M + L`, the implicit operator of every BDF step.
///
/// The mass factor is `gamma0 / dt` and owned by the integrator, which
/// resets it whenever the coefficients change.
pub struct HelmholtzOperator<'a> {
    mass: &'a dyn LinearOperator,
    laplace: &'a dyn AffineOperator,
    scaling_factor_mass: f64,
}

impl<'a> HelmholtzOperator<'a> {
    pub fn new(mass: &'a dyn LinearOperator, laplace: &'a dyn AffineOperator) -> Self {
        Self {
            mass,
            laplace,
            scaling_factor_mass: 1.0,
        }
    }

    pub fn set_scaling_factor_mass(&mut self, factor: f64) {
        self.scaling_factor_mass = factor;
    }

    pub fn scaling_factor_mass(&self) -> f64 {
        self.scaling_factor_mass
    }

    /// Boundary data of the Laplace part.
    pub fn rhs_add(&self, dst: &mut DVector<f64>, time: f64) {
        self.laplace.rhs_add(dst, time);
    }
}

impl LinearOperator for HelmholtzOperator<'_> {
    fn n_dofs(&self) -> usize {
        self.mass.n_dofs()
    }

    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        let mut tmp = DVector::zeros(self.n_dofs());
        self.mass.apply(&mut tmp, src);
        dst.axpy(self.scaling_factor_mass, &tmp, 1.0);
        self.laplace.apply_add(dst, src);
    }

    fn add_diagonal(&self, diagonal: &mut DVector<f64>) {
        let mut tmp = DVector::zeros(self.n_dofs());
        self.mass.calculate_diagonal(&mut tmp);
        diagonal.axpy(self.scaling_factor_mass, &tmp, 1.0);
        self.laplace.add_diagonal(diagonal);
    }

    fn calculate_block_diagonal(&self) -> Vec<DMatrix<f64>> {
        let mass = self.mass.calculate_block_diagonal();
        let laplace = self.laplace.calculate_block_diagonal();
        mass.into_iter()
            .zip(laplace)
            .map(|(m, l)| m * self.scaling_factor_mass + l)
            .collect()
    }
}

/// Cell loop helper: `f(cell, dst_block, src_block)` over all cells in parallel.
pub(crate) fn for_each_cell<F>(dst: &mut DVector<f64>, src: &DVector<f64>, f: F)
where
    F: Fn(usize, &mut [f64], &[f64]) + Sync,
{
    use rayon::prelude::*;

    dst.as_mut_slice()
        .par_chunks_mut(DOFS_PER_CELL)
        .zip(src.as_slice().par_chunks(DOFS_PER_CELL))
        .enumerate()
        .for_each(|(cell, (d, s))| f(cell, d, s));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::space::DgSpace;
    use std::sync::Arc;

    #[test]
    fn probed_diagonal_matches_explicit_diagonal() {
        let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, 5, false).unwrap()));
        let laplace = LaplaceOperator::new(space.clone(), 0.7, 1.0).with_dirichlet(crate::functions::zero());
        let mass = MassOperator::new(space);
        let mut helmholtz = HelmholtzOperator::new(&mass, &laplace);
        helmholtz.set_scaling_factor_mass(12.0);

        let mut fast = DVector::zeros(10);
        helmholtz.calculate_diagonal(&mut fast);

        let mut probed = DVector::zeros(10);
        let mut unit = DVector::zeros(10);
        let mut column = DVector::zeros(10);
        for j in 0..10 {
            unit[j] = 1.0;
            helmholtz.apply(&mut column, &unit);
            probed[j] = column[j];
            unit[j] = 0.0;
        }
        assert!((fast - probed).amax() < 1e-12);
    }
}
