//! Linear solver layer.
//!
//! All solvers work on [`LinearOperator`]s and never see a matrix, except
//! the direct solver which assembles one by probing.
//!
//! ```text
//! LinearOperator ──┬── ConjugateGradient (SPD, preconditioned)
//!                  ├── Gmres             (restarted, right preconditioned)
//!                  └── DirectSolver      (COO -> CSR -> dense LU)
//! ```

pub mod direct;
pub mod krylov;
pub mod preconditioner;

pub use direct::{DirectSolver, assemble_csr, solve_block_diagonal};
pub use krylov::{ConjugateGradient, Gmres};
pub use preconditioner::{
    BlockJacobiPreconditioner, IdentityPreconditioner, InverseMassPreconditioner,
    JacobiPreconditioner, Preconditioner, build_preconditioner,
};

use nalgebra::DVector;

use crate::error::Result;
use crate::operators::LinearOperator;

/// Solver convergence and diagnostic info.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveInfo {
    /// Number of iterations (1 for direct solvers)
    pub iterations: usize,
    /// Final residual norm (if available)
    pub residual_norm: Option<f64>,
    /// Human-readable solver name
    pub solver_name: &'static str,
}

pub trait LinearSolver {
    /// Solves `A x = b`, using `x` as the initial guess.
    fn solve(
        &self,
        operator: &dyn LinearOperator,
        preconditioner: &dyn Preconditioner,
        x: &mut DVector<f64>,
        b: &DVector<f64>,
    ) -> Result<SolveInfo>;
}

/// Removes the mean nodal value, making a right-hand side compatible with a
/// singular operator whose kernel is spanned by constants.
pub fn set_zero_mean_value(v: &mut DVector<f64>) {
    if v.is_empty() {
        return;
    }
    let mean = v.mean();
    v.add_scalar_mut(-mean);
}
