//! Dual splitting scheme.
//!
//! One step consists of
//!
//! 1. explicit step: `u^ = dt/gamma0 M^-1 (M sum alpha_i u_i / dt - sum beta_i N_i + F)`
//! 2. pressure Poisson: `L p = -(gamma0/dt) D u^ + h`
//! 3. projection: `(M + dt A_penalty) u^^ = M u^ - dt/gamma0 G p`
//! 4. viscous step: `(gamma0/dt M + nu L) u = gamma0/dt M u^^ + nu b_L`
//!
//! followed by fixing the pressure level. The divergence in step 2 takes
//! the interior trace of `u^` on the boundary, and the Neumann data
//! `h = n . (f - dg/dt - sum beta_i N_i)` closes it. A velocity matching
//! its Dirichlet data then yields the exact pressure gradient.

use dgflow_model::FluidParameters;
use nalgebra::DVector;

use super::{BdfScheme, Dissipation, FluidCore, ProjectionStep};
use crate::error::Result;
use crate::functions::FluidFunctions;
use crate::operators::SpatialOperatorSet;
use crate::solvers::{ConjugateGradient, LinearSolver, Preconditioner, set_zero_mean_value};
use crate::space::DgSpace;

pub struct DualSplittingSolver<'a> {
    core: FluidCore<'a>,
    projection: ProjectionStep<'a>,
    pressure_preconditioner: Option<Box<dyn Preconditioner + 'a>>,
}

impl<'a> DualSplittingSolver<'a> {
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

    /// BDF sum, extrapolated convective term and body force, no pressure
    /// and no viscosity.
    fn explicit_step(&self) -> Result<DVector<f64>> {
        let core = &self.core;
        let rhs = core.momentum_rhs()?;
        let mut velocity = DVector::zeros(rhs.len());
        core.operators.inverse_mass().apply(&mut velocity, &rhs);
        velocity /= core.state.scaling_factor_time_derivative_term();
        Ok(velocity)
    }

    fn pressure_rhs(&self, explicit: &DVector<f64>, time: f64) -> DVector<f64> {
        let core = &self.core;
        let operators = core.operators;
        let boundary_dofs: Vec<(usize, f64)> = operators
            .space()
            .mesh()
            .boundary_faces()
            .map(|face| (DgSpace::dof(face.owner, face.owner_node), face.normal))
            .collect();

        let mut rhs = DVector::zeros(explicit.len());
        operators.divergence().apply(&mut rhs, explicit);
        for &(dof, normal) in &boundary_dofs {
            rhs[dof] += normal * explicit[dof];
        }
        rhs *= -core.state.scaling_factor_time_derivative_term();

        operators.pressure_neumann_add(&mut rhs, time);
        if let Some(convective) = core.extrapolated_convective_term() {
            let mut nodal = DVector::zeros(convective.len());
            operators.inverse_mass().apply(&mut nodal, &convective);
            for &(dof, normal) in &boundary_dofs {
                rhs[dof] -= normal * nodal[dof];
            }
        }
        set_zero_mean_value(&mut rhs);
        rhs
    }

    fn pressure_step(&mut self, explicit: &DVector<f64>, time: f64) -> Result<DVector<f64>> {
        let preconditioner = match self.pressure_preconditioner.take() {
            Some(p) => p,
            None => self.core.build_pressure_preconditioner()?,
        };
        let rhs = self.pressure_rhs(explicit, time);

        let core = &self.core;
        let mut pressure = core.history.pressure(0).clone();
        let result = ConjugateGradient::new(core.params.solver_pressure_poisson).solve(
            core.operators.pressure_laplace(),
            preconditioner.as_ref(),
            &mut pressure,
            &rhs,
        );
        self.pressure_preconditioner = Some(preconditioner);
        self.core.record("pressure_poisson", &result?);
        Ok(pressure)
    }

    fn viscous_step(&mut self, projected: &DVector<f64>, time: f64) -> Result<DVector<f64>> {
        let core = &self.core;
        let mut rhs = DVector::zeros(projected.len());
        core.operators.mass().apply(&mut rhs, projected);
        rhs *= core.state.scaling_factor_time_derivative_term();
        core.helmholtz.rhs_add(&mut rhs, time);

        let mut velocity = projected.clone();
        let info = ConjugateGradient::new(core.params.solver_viscous).solve(
            &core.helmholtz,
            core.viscous_preconditioner()?,
            &mut velocity,
            &rhs,
        )?;
        self.core.record("viscous", &info);
        Ok(velocity)
    }
}

impl<'a> BdfScheme<'a> for DualSplittingSolver<'a> {
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

        let explicit = self.explicit_step()?;
        let mut pressure = self.pressure_step(&explicit, t)?;

        let mut rhs = DVector::zeros(explicit.len());
        self.core.operators.mass().apply(&mut rhs, &explicit);
        let mut gradient = DVector::zeros(pressure.len());
        self.core.operators.gradient().apply(&mut gradient, &pressure);
        rhs.axpy(-1.0 / self.core.state.scaling_factor_time_derivative_term(), &gradient, 1.0);
        let projected = self.projection.project(&mut self.core, &explicit, &rhs)?;
        let velocity = self.viscous_step(&projected, t)?;

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
