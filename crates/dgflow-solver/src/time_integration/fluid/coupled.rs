//! Monolithic BDF solver.
//!
//! Each step solves the saddle-point system
//!
//! ```text
//! [ gamma0/dt M + nu L    G ] [u]   [ rhs_conv + nu b_L ]
//! [ -D                    0 ] [p] = [ -r_D              ]
//! ```
//!
//! with GMRES. The pressure is determined up to a constant, so the
//! continuity row is made compatible first and the level is fixed after the
//! solve.

use dgflow_model::FluidParameters;
use nalgebra::DVector;

use super::{BdfScheme, FluidCore};
use crate::error::Result;
use crate::functions::FluidFunctions;
use crate::operators::{AffineOperator, LinearOperator, SpatialOperatorSet};
use crate::solvers::{Gmres, LinearSolver, Preconditioner, set_zero_mean_value};

/// Block operator acting on `[u; p]`.
struct SaddlePointOperator<'b> {
    momentum: &'b dyn LinearOperator,
    gradient: &'b dyn LinearOperator,
    divergence: &'b dyn AffineOperator,
    n: usize,
}

impl LinearOperator for SaddlePointOperator<'_> {
    fn n_dofs(&self) -> usize {
        2 * self.n
    }

    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        let n = self.n;
        let u = src.rows(0, n).into_owned();
        let p = src.rows(n, n).into_owned();

        let mut top = DVector::zeros(n);
        self.momentum.apply_add(&mut top, &u);
        self.gradient.apply_add(&mut top, &p);
        let mut bottom = DVector::zeros(n);
        self.divergence.apply(&mut bottom, &u);

        let mut head = dst.rows_mut(0, n);
        head += &top;
        let mut tail = dst.rows_mut(n, n);
        tail -= &bottom;
    }
}

/// Momentum preconditioner on the velocity block, identity on the pressure.
struct BlockDiagonalPreconditioner<'b> {
    momentum: &'b dyn Preconditioner,
    n: usize,
}

impl Preconditioner for BlockDiagonalPreconditioner<'_> {
    fn vmult(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        let n = self.n;
        let mut u = DVector::zeros(n);
        self.momentum.vmult(&mut u, &src.rows(0, n).into_owned());
        dst.rows_mut(0, n).copy_from(&u);
        dst.rows_mut(n, n).copy_from(&src.rows(n, n));
    }
}

pub struct CoupledSolver<'a> {
    core: FluidCore<'a>,
}

impl<'a> CoupledSolver<'a> {
    pub fn new(
        params: &FluidParameters,
        refine_time: u32,
        operators: &'a dyn SpatialOperatorSet,
        functions: &'a FluidFunctions,
    ) -> Result<Self> {
        Ok(Self {
            core: FluidCore::new(params, refine_time, operators, functions)?,
        })
    }
}

impl<'a> BdfScheme<'a> for CoupledSolver<'a> {
    fn core(&self) -> &FluidCore<'a> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FluidCore<'a> {
        &mut self.core
    }

    fn do_timestep(&mut self) -> Result<()> {
        let core = &self.core;
        let n = core.n_dofs();
        let t = core.next_time();

        let mut rhs_momentum = core.momentum_rhs()?;
        core.helmholtz.rhs_add(&mut rhs_momentum, t);
        let mut rhs_continuity = DVector::zeros(n);
        core.operators.divergence().rhs_add(&mut rhs_continuity, t);
        rhs_continuity.neg_mut();
        set_zero_mean_value(&mut rhs_continuity);

        let mut b = DVector::zeros(2 * n);
        b.rows_mut(0, n).copy_from(&rhs_momentum);
        b.rows_mut(n, n).copy_from(&rhs_continuity);
        let mut x = DVector::zeros(2 * n);
        x.rows_mut(0, n).copy_from(&core.extrapolated_velocity());
        x.rows_mut(n, n).copy_from(core.history.pressure(0));

        let info = {
            let operator = SaddlePointOperator {
                momentum: &core.helmholtz,
                gradient: core.operators.gradient(),
                divergence: core.operators.divergence(),
                n,
            };
            let preconditioner = BlockDiagonalPreconditioner {
                momentum: core.viscous_preconditioner()?,
                n,
            };
            Gmres::new(core.params.solver_coupled).solve(&operator, &preconditioner, &mut x, &b)?
        };
        self.core.record("coupled", &info);

        let velocity = x.rows(0, n).into_owned();
        let mut pressure = x.rows(n, n).into_owned();
        self.core.adjust_pressure_level(&mut pressure, t);
        self.core.finish_step(velocity, pressure);
        Ok(())
    }
}
