//! Matrix assembly and direct solves.
//!
//! Operators are assembled column by column by probing with unit vectors
//! into COO triplets, then converted to CSR. Duplicate entries are summed
//! by the conversion, zeros are dropped before insertion.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use super::{LinearSolver, Preconditioner, SolveInfo};
use crate::error::{Result, SolverError, check_dimension};
use crate::operators::LinearOperator;
use crate::space::DOFS_PER_CELL;

pub fn assemble_csr(operator: &dyn LinearOperator) -> CsrMatrix<f64> {
    let n = operator.n_dofs();
    let mut coo = CooMatrix::new(n, n);
    let mut unit = DVector::zeros(n);
    let mut column = DVector::zeros(n);
    for j in 0..n {
        unit[j] = 1.0;
        operator.apply(&mut column, &unit);
        for (i, value) in column.iter().enumerate() {
            if *value != 0.0 {
                coo.push(i, j, *value);
            }
        }
        unit[j] = 0.0;
    }
    CsrMatrix::from(&coo)
}

/// Dense LU of the assembled operator; meant for small systems and for
/// checking the iterative solvers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSolver;

impl LinearSolver for DirectSolver {
    fn solve(
        &self,
        operator: &dyn LinearOperator,
        _preconditioner: &dyn Preconditioner,
        x: &mut DVector<f64>,
        b: &DVector<f64>,
    ) -> Result<SolveInfo> {
        let n = operator.n_dofs();
        check_dimension("direct solver rhs", n, b.len())?;
        let csr = assemble_csr(operator);

        let mut dense = DMatrix::zeros(n, n);
        for (i, j, value) in csr.triplet_iter() {
            dense[(i, j)] += *value;
        }
        let solution = dense
            .lu()
            .solve(b)
            .ok_or(SolverError::Singular("LU decomposition"))?;
        x.copy_from(&solution);

        Ok(SolveInfo {
            iterations: 1,
            residual_norm: None,
            solver_name: "nalgebra-LU",
        })
    }
}

/// Solves a block-diagonal system cell by cell with LU.
pub fn solve_block_diagonal(
    blocks: &[DMatrix<f64>],
    x: &mut DVector<f64>,
    b: &DVector<f64>,
) -> Result<SolveInfo> {
    check_dimension("block LU rhs", blocks.len() * DOFS_PER_CELL, b.len())?;
    for (cell, block) in blocks.iter().enumerate() {
        let range = cell * DOFS_PER_CELL..(cell + 1) * DOFS_PER_CELL;
        let local = block
            .clone()
            .lu()
            .solve(&b.rows_range(range.clone()).into_owned())
            .ok_or(SolverError::Singular("elementwise LU"))?;
        x.rows_range_mut(range).copy_from(&local);
    }
    Ok(SolveInfo {
        iterations: 1,
        residual_norm: None,
        solver_name: "elementwise-LU",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::operators::{LaplaceOperator, MassOperator};
    use crate::solvers::IdentityPreconditioner;
    use crate::space::DgSpace;
    use std::sync::Arc;

    #[test]
    fn assembled_mass_matrix_is_block_diagonal() {
        let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 3.0, 3, false).unwrap()));
        let csr = assemble_csr(&MassOperator::new(space));
        assert_eq!(csr.nnz(), 12);
        for (i, j, value) in csr.triplet_iter() {
            assert_eq!(i / 2, j / 2);
            let expected = if i == j { 1.0 / 3.0 } else { 1.0 / 6.0 };
            assert!((value - expected).abs() < 1e-14);
        }
    }

    #[test]
    fn direct_solve_matches_operator() {
        let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, 4, false).unwrap()));
        let laplace =
            LaplaceOperator::new(space.clone(), 1.0, 2.0).with_dirichlet(crate::functions::zero());
        let expected = space.interpolate(|x| x * (1.0 - x));
        let mut b = space.zeros();
        laplace.apply(&mut b, &expected);

        let mut x = space.zeros();
        let info = DirectSolver
            .solve(&laplace, &IdentityPreconditioner, &mut x, &b)
            .unwrap();
        assert_eq!(info.iterations, 1);
        assert!((x - expected).amax() < 1e-10);
    }
}
