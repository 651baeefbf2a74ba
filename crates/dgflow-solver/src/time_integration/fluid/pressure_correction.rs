//! Incremental pressure-correction scheme.
//!
//! The momentum equation is solved with an extrapolated pressure gradient,
//! then a pressure increment `phi` with homogeneous Neumann data corrects
//! the velocity:
//!
//! ```text
//! (gamma0/dt M + nu L) u* = rhs_conv + nu b_L - G p_extrap
//! L phi                   = -(gamma0/dt) D u*
//! (M + dt A_penalty) u    = M u* - dt/gamma0 G phi
//! p                       = p_extrap + phi
//! ```
//!
//! With `order_pressure_extrapolation == 0` the scheme is non-incremental.

use dgflow_model::FluidParameters;
use nalgebra::DVector;

use super::{BdfScheme, Dissipation, FluidCore, ProjectionStep};
use crate::error::Result;
use crate::functions::FluidFunctions;
use crate::operators::SpatialOperatorSet;
use crate::solvers::{ConjugateGradient, LinearSolver, Preconditioner, set_zero_mean_value};

pub struct PressureCorrectionSolver<'a> {
    core: FluidCore<'a>,
    projection: ProjectionStep<'a>,
    pressure_preconditioner: Option<Box<dyn Preconditioner + 'a>>,
}

impl<'a> PressureCorrectionSolver<'a> {
    pub fn new(
        params: &FluidParameters,
        refine_time: u32,
        operators: &'a dyn SpatialOperatorSet,
        functions: &'a FluidFunctions,
    ) -> Result<Self> {
        Ok(Self {
            core: FluidCore::new(params, refine_time, operators, functions)?,
            projection: ProjectionStep::new(params, operators),
            pressure_preconditioner: None,
        })
    }

    fn momentum_step(&mut self, pressure: &DVector<f64>, time: f64) -> Result<DVector<f64>> {
        let core = &self.core;
        let mut rhs = core.momentum_rhs()?;
        core.helmholtz.rhs_add(&mut rhs, time);
        let mut gradient = DVector::zeros(pressure.len());
        core.operators.gradient().apply(&mut gradient, pressure);
        rhs -= gradient;

        let mut velocity = core.extrapolated_velocity();
        let info = ConjugateGradient::new(core.params.solver_viscous).solve(
            &core.helmholtz,
            core.viscous_preconditioner()?,
            &mut velocity,
            &rhs,
        )?;
        self.core.record("momentum", &info);
        Ok(velocity)
    }

    fn pressure_increment(&mut self, intermediate: &DVector<f64>, time: f64) -> Result<DVector<f64>> {
        let preconditioner = match self.pressure_preconditioner.take() {
            Some(p) => p,
            None => self.core.build_pressure_preconditioner()?,
        };
        let core = &self.core;
        let mut rhs = core.divergence_source(intermediate, time);
        set_zero_mean_value(&mut rhs);

        let mut increment = DVector::zeros(rhs.len());
        let result = ConjugateGradient::new(core.params.solver_pressure_poisson).solve(
            core.operators.pressure_laplace(),
            preconditioner.as_ref(),
            &mut increment,
            &rhs,
        );
        self.pressure_preconditioner = Some(preconditioner);
        let info = result?;
        self.core.record("pressure_increment", &info);
        Ok(increment)
    }
}

impl<'a> BdfScheme<'a> for PressureCorrectionSolver<'a> {
    fn core(&self) -> &FluidCore<'a> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FluidCore<'a> {
        &mut self.core
    }

    fn setup_solvers(&mut self) -> Result<()> {
        self.pressure_preconditioner = Some(self.core.build_pressure_preconditioner()?);
        Ok(())
    }

    fn on_time_step_size_changed_scheme(&mut self, dt: f64) {
        self.projection.set_time_step_size(dt);
    }

    fn do_timestep(&mut self) -> Result<()> {
        let t = self.core.next_time();
        let extrapolated = self
            .core
            .extrapolated_pressure(self.core.params.order_pressure_extrapolation);

        let intermediate = self.momentum_step(&extrapolated, t)?;
        let increment = self.pressure_increment(&intermediate, t)?;

        let mut rhs = DVector::zeros(intermediate.len());
        self.core.operators.mass().apply(&mut rhs, &intermediate);
        let mut gradient = DVector::zeros(increment.len());
        self.core.operators.gradient().apply(&mut gradient, &increment);
        rhs.axpy(-1.0 / self.core.state.scaling_factor_time_derivative_term(), &gradient, 1.0);
        let velocity = self.projection.project(&mut self.core, &intermediate, &rhs)?;

        let mut pressure = extrapolated + increment;
        self.core.adjust_pressure_level(&mut pressure, t);
        self.core.finish_step(velocity, pressure);
        Ok(())
    }

    fn dissipation(&self) -> Dissipation {
        let mut dissipation = self.core.base_dissipation();
        self.projection
            .add_dissipation(&mut dissipation, self.core.velocity());
        dissipation
    }
}
