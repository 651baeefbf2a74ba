use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use super::{LinearOperator, for_each_cell};
use crate::space::{DOFS_PER_CELL, DgSpace};

/// Consistent mass matrix, cell blocks `h/6 [[2, 1], [1, 2]]`.
pub struct MassOperator {
    space: Arc<DgSpace>,
}

impl MassOperator {
    pub fn new(space: Arc<DgSpace>) -> Self {
        Self { space }
    }
}

impl LinearOperator for MassOperator {
    fn n_dofs(&self) -> usize {
        self.space.n_dofs()
    }

    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        let mesh = self.space.mesh();
        for_each_cell(dst, src, |cell, d, s| {
            let w = mesh.cell_size(cell) / 6.0;
            d[0] += w * (2.0 * s[0] + s[1]);
            d[1] += w * (s[0] + 2.0 * s[1]);
        });
    }

    fn add_diagonal(&self, diagonal: &mut DVector<f64>) {
        let mesh = self.space.mesh();
        for cell in 0..mesh.n_cells() {
            let d = mesh.cell_size(cell) / 3.0;
            diagonal[DgSpace::dof(cell, 0)] += d;
            diagonal[DgSpace::dof(cell, 1)] += d;
        }
    }

    fn calculate_block_diagonal(&self) -> Vec<DMatrix<f64>> {
        let mesh = self.space.mesh();
        (0..mesh.n_cells())
            .map(|cell| {
                let w = mesh.cell_size(cell) / 6.0;
                DMatrix::from_row_slice(DOFS_PER_CELL, DOFS_PER_CELL, &[2.0 * w, w, w, 2.0 * w])
            })
            .collect()
    }
}

/// Exact inverse of the block-diagonal mass matrix, `2/h [[2, -1], [-1, 2]]`.
pub struct InverseMassOperator {
    space: Arc<DgSpace>,
}

impl InverseMassOperator {
    pub fn new(space: Arc<DgSpace>) -> Self {
        Self { space }
    }
}

impl LinearOperator for InverseMassOperator {
    fn n_dofs(&self) -> usize {
        self.space.n_dofs()
    }

    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        let mesh = self.space.mesh();
        for_each_cell(dst, src, |cell, d, s| {
            let w = 2.0 / mesh.cell_size(cell);
            d[0] += w * (2.0 * s[0] - s[1]);
            d[1] += w * (2.0 * s[1] - s[0]);
        });
    }
}
