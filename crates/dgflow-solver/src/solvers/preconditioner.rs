use dgflow_model::PreconditionerKind;
use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SolverError};
use crate::operators::LinearOperator;
use crate::space::DOFS_PER_CELL;

pub trait Preconditioner {
    /// `dst = P^-1 src`
    fn vmult(&self, dst: &mut DVector<f64>, src: &DVector<f64>);
}

pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn vmult(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        dst.copy_from(src);
    }
}

/// Applies an inverse mass operator.
pub struct InverseMassPreconditioner<'a> {
    inverse_mass: &'a dyn LinearOperator,
}

impl<'a> InverseMassPreconditioner<'a> {
    pub fn new(inverse_mass: &'a dyn LinearOperator) -> Self {
        Self { inverse_mass }
    }
}

impl Preconditioner for InverseMassPreconditioner<'_> {
    fn vmult(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        self.inverse_mass.apply(dst, src);
    }
}

pub struct JacobiPreconditioner {
    inverse_diagonal: DVector<f64>,
}

impl JacobiPreconditioner {
    pub fn new(operator: &dyn LinearOperator) -> Self {
        let mut diagonal = DVector::zeros(operator.n_dofs());
        operator.calculate_diagonal(&mut diagonal);
        let inverse_diagonal = diagonal.map(|d| if d.abs() > f64::EPSILON { 1.0 / d } else { 1.0 });
        Self { inverse_diagonal }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn vmult(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        dst.copy_from(src);
        dst.component_mul_assign(&self.inverse_diagonal);
    }
}

/// Inverse of the cell-local blocks of an operator.
pub struct BlockJacobiPreconditioner {
    inverse_blocks: Vec<DMatrix<f64>>,
}

impl BlockJacobiPreconditioner {
    pub fn new(operator: &dyn LinearOperator) -> Result<Self> {
        let inverse_blocks = operator
            .calculate_block_diagonal()
            .into_iter()
            .map(|block| {
                block
                    .try_inverse()
                    .ok_or(SolverError::Singular("block Jacobi cell matrix"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { inverse_blocks })
    }
}

impl Preconditioner for BlockJacobiPreconditioner {
    fn vmult(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        for (cell, inverse) in self.inverse_blocks.iter().enumerate() {
            let range = cell * DOFS_PER_CELL..(cell + 1) * DOFS_PER_CELL;
            let local = inverse * src.rows_range(range.clone());
            dst.rows_range_mut(range).copy_from(&local);
        }
    }
}

/// Builds the preconditioner selected in the parameters for `operator`.
pub fn build_preconditioner<'a>(
    kind: PreconditionerKind,
    operator: &dyn LinearOperator,
    inverse_mass: &'a dyn LinearOperator,
) -> Result<Box<dyn Preconditioner + 'a>> {
    Ok(match kind {
        PreconditionerKind::None => Box::new(IdentityPreconditioner),
        PreconditionerKind::InverseMassMatrix => {
            Box::new(InverseMassPreconditioner::new(inverse_mass))
        }
        PreconditionerKind::PointJacobi => Box::new(JacobiPreconditioner::new(operator)),
        PreconditionerKind::BlockJacobi => Box::new(BlockJacobiPreconditioner::new(operator)?),
    })
}
