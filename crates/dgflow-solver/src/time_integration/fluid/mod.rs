//! BDF integrators of the incompressible Navier-Stokes equations.
//!
//! All three schemes treat the convective term explicitly by extrapolation
//! and differ in how velocity and pressure are coupled:
//!
//! - [`CoupledSolver`]: one saddle-point system per step (GMRES)
//! - [`DualSplittingSolver`]: explicit step, pressure Poisson, projection,
//!   viscous step
//! - [`PressureCorrectionSolver`]: momentum predictor, pressure increment,
//!   correction
//!
//! [`FluidSolver`] selects one of them at runtime.

mod coupled;
mod dual_splitting;
mod pressure_correction;

pub use coupled::CoupledSolver;
pub use dual_splitting::DualSplittingSolver;
pub use pressure_correction::PressureCorrectionSolver;

use std::collections::{BTreeMap, VecDeque};

use dgflow_io::SolveStatistics;
use dgflow_model::{AdjustPressureLevel, FluidParameters, FluidScheme, TimeStepCalculation};
use nalgebra::DVector;
use tracing::{debug, warn};

use super::bdf::{TimeStepState, linear_combination};
use super::TIME_EPSILON;
use crate::error::{Result, SolverError};
use crate::functions::FluidFunctions;
use crate::operators::{HelmholtzOperator, SpatialOperatorSet};
use crate::projection::{ProjectionOperator, ProjectionOperatorData, ProjectionSolver};
use crate::solvers::{Preconditioner, SolveInfo, build_preconditioner};
use crate::time_step_calculation::{calculate_const_time_step_cfl, cfl_number};

/// Common interface of the fluid time integrators.
pub trait FluidIntegrator {
    /// Initializes the solution at the start time and builds solvers.
    fn setup(&mut self, restart: bool) -> Result<()>;

    fn set_time(&mut self, time: f64);
    fn time(&self) -> f64;
    fn start_time(&self) -> f64;
    fn end_time(&self) -> f64;

    /// Step size requested by the parameters before synchronization.
    fn calculate_time_step_size(&self) -> Result<f64>;
    fn set_time_step_size(&mut self, dt: f64);
    fn get_time_step_size(&self) -> f64;
    /// `gamma0 / dt` of the current step
    fn get_scaling_factor_time_derivative_term(&self) -> f64;
    /// Recomputes the BDF constants and pushes them into every implicit operator.
    fn on_time_step_size_changed(&mut self) -> Result<()>;

    /// Takes one step if `accepting` and returns whether the end time is reached.
    ///
    /// Before the integrator's own start time only the clock advances. With
    /// `accepting == false` nothing is mutated.
    fn advance_one_timestep(&mut self, accepting: bool) -> Result<bool>;
    fn is_finished(&self) -> bool;

    /// Number of the next step, starting at 1.
    fn step_number(&self) -> usize;
    fn velocity(&self) -> &DVector<f64>;
    fn pressure(&self) -> &DVector<f64>;
    fn statistics(&self) -> &BTreeMap<String, SolveStatistics>;
    fn dissipation(&self) -> Dissipation;
}

/// Energy dissipated by the individual terms, `u . T u` for term `T`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dissipation {
    pub convective: f64,
    pub viscous: f64,
    pub divergence_penalty: f64,
    pub continuity_penalty: f64,
}

/// Velocity, pressure and convective term at previous time levels, most
/// recent first.
#[derive(Debug, Clone)]
pub struct FluidHistory {
    order: usize,
    velocity: VecDeque<DVector<f64>>,
    pressure: VecDeque<DVector<f64>>,
    convective: VecDeque<DVector<f64>>,
}

impl FluidHistory {
    pub fn new(order: usize) -> Self {
        Self {
            order,
            velocity: VecDeque::with_capacity(order + 1),
            pressure: VecDeque::with_capacity(order + 1),
            convective: VecDeque::with_capacity(order + 1),
        }
    }

    /// Adds the newest level and evicts the oldest beyond the order.
    pub fn push(&mut self, velocity: DVector<f64>, pressure: DVector<f64>, convective: DVector<f64>) {
        self.velocity.push_front(velocity);
        self.pressure.push_front(pressure);
        self.convective.push_front(convective);
        self.velocity.truncate(self.order);
        self.pressure.truncate(self.order);
        self.convective.truncate(self.order);
    }

    pub fn clear(&mut self) {
        self.velocity.clear();
        self.pressure.clear();
        self.convective.clear();
    }

    pub fn len(&self) -> usize {
        self.velocity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocity.is_empty()
    }

    pub fn velocity(&self, i: usize) -> &DVector<f64> {
        &self.velocity[i]
    }

    pub fn pressure(&self, i: usize) -> &DVector<f64> {
        &self.pressure[i]
    }

    pub fn velocities(&self) -> impl Iterator<Item = &DVector<f64>> {
        self.velocity.iter()
    }

    pub fn pressures(&self) -> impl Iterator<Item = &DVector<f64>> {
        self.pressure.iter()
    }

    pub fn convective_terms(&self) -> impl Iterator<Item = &DVector<f64>> {
        self.convective.iter()
    }
}

/// State and building blocks shared by the three fluid schemes.
pub(crate) struct FluidCore<'a> {
    pub params: FluidParameters,
    pub refine_time: u32,
    pub operators: &'a dyn SpatialOperatorSet,
    pub functions: &'a FluidFunctions,
    pub state: TimeStepState,
    pub history: FluidHistory,
    pub helmholtz: HelmholtzOperator<'a>,
    viscous_preconditioner: Option<Box<dyn Preconditioner + 'a>>,
    preconditioner_factor: f64,
    pub statistics: BTreeMap<String, SolveStatistics>,
    seeded: bool,
    is_setup: bool,
    velocity: DVector<f64>,
    pressure: DVector<f64>,
}

impl<'a> FluidCore<'a> {
    pub fn new(
        params: &FluidParameters,
        refine_time: u32,
        operators: &'a dyn SpatialOperatorSet,
        functions: &'a FluidFunctions,
    ) -> Result<Self> {
        params.check()?;
        let state = TimeStepState::new(
            params.order_time_integrator,
            params.start_with_low_order,
            params.start_time,
        )?;
        let n = operators.space().n_dofs();
        Ok(Self {
            params: params.clone(),
            refine_time,
            operators,
            functions,
            state,
            history: FluidHistory::new(params.order_time_integrator),
            helmholtz: HelmholtzOperator::new(operators.mass(), operators.viscous()),
            viscous_preconditioner: None,
            preconditioner_factor: f64::NAN,
            statistics: BTreeMap::new(),
            seeded: false,
            is_setup: false,
            velocity: DVector::zeros(n),
            pressure: DVector::zeros(n),
        })
    }

    pub fn n_dofs(&self) -> usize {
        self.operators.space().n_dofs()
    }

    pub fn setup(&mut self, restart: bool) -> Result<()> {
        if restart {
            return Err(SolverError::Unimplemented("restart".to_string()));
        }
        let t0 = self.params.start_time;
        let space = self.operators.space();
        let velocity = space.interpolate(|x| (self.functions.initial_velocity)(x, t0));
        let pressure = space.interpolate(|x| (self.functions.initial_pressure)(x, t0));
        let convective = self.evaluate_convective_term(&velocity, t0);
        self.history.clear();
        self.history.push(velocity.clone(), pressure.clone(), convective);
        self.velocity = velocity;
        self.pressure = pressure;
        self.seeded = self.params.start_with_low_order;
        self.is_setup = true;
        Ok(())
    }

    pub fn calculate_time_step_size(&self) -> Result<f64> {
        let refine = 2f64.powi(self.refine_time as i32);
        let space = self.operators.space();
        let h_min = space.mesh().min_cell_size();
        let dt = match self.params.time_step_calculation {
            TimeStepCalculation::UserSpecified => self.params.time_step_size / refine,
            TimeStepCalculation::ConstTimeStepCfl => {
                calculate_const_time_step_cfl(
                    self.params.cfl,
                    self.params.max_velocity,
                    h_min,
                    space.degree(),
                    self.params.cfl_exponent_fe_degree,
                ) / refine
            }
            TimeStepCalculation::AdaptiveTimeStepCfl => {
                return Err(SolverError::Unimplemented(
                    "adaptive time stepping".to_string(),
                ));
            }
        };
        let cfl = cfl_number(
            dt,
            self.params.max_velocity,
            h_min,
            space.degree(),
            self.params.cfl_exponent_fe_degree,
        );
        if self.operators.convective().is_some() && cfl > 1.0 {
            warn!(cfl, dt, "fluid time step exceeds the CFL limit of the explicit convective term");
        }
        Ok(dt)
    }

    /// Recomputes the BDF constants and pushes `gamma0 / dt` into the
    /// Helmholtz operator, rebuilding its preconditioner if it changed.
    pub fn on_time_step_size_changed(&mut self) -> Result<()> {
        self.state.update_time_integration_constants();
        let factor = self.state.scaling_factor_time_derivative_term();
        self.helmholtz.set_scaling_factor_mass(factor);
        if factor != self.preconditioner_factor {
            self.viscous_preconditioner = Some(build_preconditioner(
                self.params.preconditioner_viscous,
                &self.helmholtz,
                self.operators.inverse_mass(),
            )?);
            self.preconditioner_factor = factor;
        }
        Ok(())
    }

    pub fn viscous_preconditioner(&self) -> Result<&dyn Preconditioner> {
        self.viscous_preconditioner.as_deref().ok_or_else(|| {
            SolverError::Configuration("time step size was never set".to_string())
        })
    }

    pub fn is_finished(&self) -> bool {
        self.state.time() > self.params.end_time - TIME_EPSILON
    }

    pub fn has_started(&self) -> bool {
        self.state.time() > self.params.start_time - TIME_EPSILON
    }

    /// Start of every step: seeds the history if requested and refreshes
    /// the BDF constants for the current effective order.
    pub fn prepare_step(&mut self) -> Result<()> {
        if !self.is_setup {
            return Err(SolverError::Configuration(
                "fluid integrator used before setup".to_string(),
            ));
        }
        if !self.seeded {
            self.seed_history_from_analytical_solution();
            self.seeded = true;
        }
        self.on_time_step_size_changed()
    }

    fn seed_history_from_analytical_solution(&mut self) {
        let dt = self.state.time_step_size();
        let t0 = self.state.time();
        self.history.clear();
        for i in (0..self.params.order_time_integrator).rev() {
            let t = t0 - i as f64 * dt;
            let space = self.operators.space();
            let velocity = space.interpolate(|x| (self.functions.analytical_velocity)(x, t));
            let pressure = space.interpolate(|x| (self.functions.analytical_pressure)(x, t));
            let convective = self.evaluate_convective_term(&velocity, t);
            self.history.push(velocity, pressure, convective);
        }
        self.velocity = self.history.velocity(0).clone();
        self.pressure = self.history.pressure(0).clone();
        debug!(levels = self.history.len(), "seeded BDF history from analytical solution");
    }

    /// Time of the level being computed.
    pub fn next_time(&self) -> f64 {
        self.state.time() + self.state.time_step_size()
    }

    pub fn evaluate_convective_term(&self, velocity: &DVector<f64>, time: f64) -> DVector<f64> {
        let mut dst = DVector::zeros(velocity.len());
        if let Some(convective) = self.operators.convective() {
            convective.evaluate(&mut dst, velocity, time);
        }
        dst
    }

    /// `M sum_i alpha_i u_i / dt - sum_i beta_i N(u_i) + F(t_{n+1})`
    pub fn momentum_rhs(&self) -> Result<DVector<f64>> {
        let n = self.n_dofs();
        let order = self.state.alpha().len();
        if self.history.len() < order {
            return Err(SolverError::Configuration(format!(
                "BDF order {order} needs {order} levels, history has {}",
                self.history.len()
            )));
        }
        let dt = self.state.time_step_size();
        let sum_alpha = linear_combination(self.state.alpha(), self.history.velocities())
            .unwrap_or_else(|| DVector::zeros(n));
        let mut rhs = DVector::zeros(n);
        self.operators.mass().apply(&mut rhs, &sum_alpha);
        rhs /= dt;
        if let Some(extrapolated) = self.extrapolated_convective_term() {
            rhs -= extrapolated;
        }
        self.operators.body_force_add(&mut rhs, self.next_time());
        Ok(rhs)
    }

    /// `sum_i beta_i N(u_i)`, `None` for Stokes flow.
    pub fn extrapolated_convective_term(&self) -> Option<DVector<f64>> {
        self.operators.convective()?;
        linear_combination(self.state.beta(), self.history.convective_terms())
    }

    /// Velocity extrapolated to `t_{n+1}`, the initial guess of implicit solves.
    pub fn extrapolated_velocity(&self) -> DVector<f64> {
        linear_combination(self.state.beta(), self.history.velocities())
            .unwrap_or_else(|| self.velocity.clone())
    }

    /// Pressure extrapolated with the given order, zero for order 0.
    pub fn extrapolated_pressure(&self, order: usize) -> DVector<f64> {
        let order = order.min(self.history.len()).min(self.state.alpha().len());
        if order == 0 {
            return DVector::zeros(self.n_dofs());
        }
        let beta = self.state.extrapolation_coefficients(order);
        linear_combination(&beta, self.history.pressures())
            .unwrap_or_else(|| DVector::zeros(self.n_dofs()))
    }

    /// Fixes the undetermined constant of the pressure.
    pub fn adjust_pressure_level(&self, pressure: &mut DVector<f64>, time: f64) {
        let space = self.operators.space();
        let current = space.mean_value(pressure);
        let target = match self.params.adjust_pressure_level {
            AdjustPressureLevel::ApplyZeroMeanValue => 0.0,
            AdjustPressureLevel::ApplyAnalyticalMeanValue => {
                space.integrate_with(|_, x, _| (self.functions.analytical_pressure)(x, time))
                    / space.mesh().length()
            }
        };
        space.shift(pressure, target - current);
    }

    pub fn record(&mut self, name: &str, info: &SolveInfo) {
        debug!(
            solve = name,
            solver = info.solver_name,
            iterations = info.iterations,
            residual = info.residual_norm,
            "linear solve"
        );
        self.statistics
            .entry(name.to_string())
            .or_default()
            .record(info.iterations);
    }

    /// End of every step: stores the new level and advances the clock.
    pub fn finish_step(&mut self, velocity: DVector<f64>, pressure: DVector<f64>) {
        let t = self.next_time();
        let convective = self.evaluate_convective_term(&velocity, t);
        self.velocity = velocity.clone();
        self.pressure = pressure.clone();
        self.history.push(velocity, pressure, convective);
        self.state.push_time_step();
    }

    pub fn velocity(&self) -> &DVector<f64> {
        &self.velocity
    }

    pub fn pressure(&self) -> &DVector<f64> {
        &self.pressure
    }

    pub fn base_dissipation(&self) -> Dissipation {
        let u = &self.velocity;
        let convective = self.evaluate_convective_term(u, self.state.time()).dot(u);
        let mut viscous = DVector::zeros(u.len());
        self.operators.viscous().apply(&mut viscous, u);
        Dissipation {
            convective,
            viscous: viscous.dot(u),
            ..Default::default()
        }
    }

    /// Preconditioner of the pressure Laplacian, which never changes.
    pub fn build_pressure_preconditioner(&self) -> Result<Box<dyn Preconditioner + 'a>> {
        build_preconditioner(
            self.params.preconditioner_pressure_poisson,
            self.operators.pressure_laplace(),
            self.operators.inverse_mass(),
        )
    }

    /// `-(gamma0 / dt) (D u - r_D(t))`, the divergence source of the
    /// pressure increment.
    pub fn divergence_source(&self, velocity: &DVector<f64>, time: f64) -> DVector<f64> {
        let mut rhs = DVector::zeros(velocity.len());
        self.operators.divergence().evaluate(&mut rhs, velocity, time);
        rhs *= -self.state.scaling_factor_time_derivative_term();
        rhs
    }
}

/// Projection of an intermediate velocity onto the (weakly) divergence-free
/// space, shared by the splitting schemes.
pub(crate) struct ProjectionStep<'a> {
    operator: ProjectionOperator,
    solver: ProjectionSolver<'a>,
    penalized: bool,
}

impl<'a> ProjectionStep<'a> {
    pub fn new(params: &FluidParameters, operators: &'a dyn SpatialOperatorSet) -> Self {
        Self {
            operator: ProjectionOperator::new(
                operators.space_handle(),
                ProjectionOperatorData::new(&params.projection, params.viscosity),
            ),
            solver: ProjectionSolver::new(&params.projection, operators.inverse_mass()),
            penalized: params.projection.any_penalty(),
        }
    }

    pub fn set_time_step_size(&mut self, dt: f64) {
        self.operator.set_time_step_size(dt);
    }

    /// Solves `(M + dt A_penalty) u = rhs`, or applies the inverse mass
    /// matrix when no penalty is active. Penalty coefficients follow
    /// `intermediate`.
    pub fn project(
        &mut self,
        core: &mut FluidCore<'a>,
        intermediate: &DVector<f64>,
        rhs: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        let mut velocity = intermediate.clone();
        if self.penalized {
            self.operator
                .update(intermediate, core.state.time_step_size());
            let info = self.solver.solve(&self.operator, &mut velocity, rhs)?;
            core.record("projection", &info);
        } else {
            core.operators.inverse_mass().apply(&mut velocity, rhs);
        }
        Ok(velocity)
    }

    pub fn add_dissipation(&self, dissipation: &mut Dissipation, velocity: &DVector<f64>) {
        let data = self.operator.data();
        if data.use_divergence_penalty {
            dissipation.divergence_penalty = self.operator.divergence_penalty_dissipation(velocity);
        }
        if data.use_continuity_penalty {
            dissipation.continuity_penalty = self.operator.continuity_penalty_dissipation(velocity);
        }
    }
}

/// Scheme-specific part of a fluid integrator.
pub(crate) trait BdfScheme<'a> {
    fn core(&self) -> &FluidCore<'a>;
    fn core_mut(&mut self) -> &mut FluidCore<'a>;
    /// Builds solvers that only depend on time-independent operators.
    fn setup_solvers(&mut self) -> Result<()> {
        Ok(())
    }
    fn on_time_step_size_changed_scheme(&mut self, _dt: f64) {}
    fn do_timestep(&mut self) -> Result<()>;
    fn dissipation(&self) -> Dissipation {
        self.core().base_dissipation()
    }
}

/// Every scheme exposes the same integrator interface on top of its
/// [`BdfScheme`] hooks.
macro_rules! impl_fluid_integrator {
    ($solver:ident) => {
        impl FluidIntegrator for $solver<'_> {
            fn setup(&mut self, restart: bool) -> Result<()> {
                self.core_mut().setup(restart)?;
                self.setup_solvers()
            }

            fn set_time(&mut self, time: f64) {
                self.core_mut().state.set_time(time);
            }

            fn time(&self) -> f64 {
                self.core().state.time()
            }

            fn start_time(&self) -> f64 {
                self.core().params.start_time
            }

            fn end_time(&self) -> f64 {
                self.core().params.end_time
            }

            fn calculate_time_step_size(&self) -> Result<f64> {
                self.core().calculate_time_step_size()
            }

            fn set_time_step_size(&mut self, dt: f64) {
                self.core_mut().state.set_time_step_size(dt);
                self.on_time_step_size_changed_scheme(dt);
            }

            fn get_time_step_size(&self) -> f64 {
                self.core().state.time_step_size()
            }

            fn get_scaling_factor_time_derivative_term(&self) -> f64 {
                self.core().state.scaling_factor_time_derivative_term()
            }

            fn on_time_step_size_changed(&mut self) -> Result<()> {
                let dt = self.core().state.time_step_size();
                self.on_time_step_size_changed_scheme(dt);
                self.core_mut().on_time_step_size_changed()
            }

            fn advance_one_timestep(&mut self, accepting: bool) -> Result<bool> {
                if !accepting {
                    return Ok(self.core().is_finished());
                }
                if !self.core().has_started() {
                    let core = self.core_mut();
                    let t = core.state.time() + core.state.time_step_size();
                    core.state.set_time(t);
                } else if !self.core().is_finished() {
                    self.core_mut().prepare_step()?;
                    self.do_timestep()?;
                }
                Ok(self.core().is_finished())
            }

            fn is_finished(&self) -> bool {
                self.core().is_finished()
            }

            fn step_number(&self) -> usize {
                self.core().state.step_number()
            }

            fn velocity(&self) -> &DVector<f64> {
                self.core().velocity()
            }

            fn pressure(&self) -> &DVector<f64> {
                self.core().pressure()
            }

            fn statistics(&self) -> &BTreeMap<String, SolveStatistics> {
                &self.core().statistics
            }

            fn dissipation(&self) -> Dissipation {
                BdfScheme::dissipation(self)
            }
        }
    };
}

impl_fluid_integrator!(CoupledSolver);
impl_fluid_integrator!(DualSplittingSolver);
impl_fluid_integrator!(PressureCorrectionSolver);

/// Fluid integrator chosen at runtime from [`FluidParameters::scheme`].
pub enum FluidSolver<'a> {
    Coupled(CoupledSolver<'a>),
    DualSplitting(DualSplittingSolver<'a>),
    PressureCorrection(PressureCorrectionSolver<'a>),
}

impl<'a> FluidSolver<'a> {
    pub fn new(
        params: &FluidParameters,
        refine_time: u32,
        operators: &'a dyn SpatialOperatorSet,
        functions: &'a FluidFunctions,
    ) -> Result<Self> {
        Ok(match params.scheme {
            FluidScheme::Coupled => {
                Self::Coupled(CoupledSolver::new(params, refine_time, operators, functions)?)
            }
            FluidScheme::DualSplitting => Self::DualSplitting(DualSplittingSolver::new(
                params,
                refine_time,
                operators,
                functions,
            )?),
            FluidScheme::PressureCorrection => Self::PressureCorrection(
                PressureCorrectionSolver::new(params, refine_time, operators, functions)?,
            ),
        })
    }

    pub fn scheme(&self) -> FluidScheme {
        match self {
            Self::Coupled(_) => FluidScheme::Coupled,
            Self::DualSplitting(_) => FluidScheme::DualSplitting,
            Self::PressureCorrection(_) => FluidScheme::PressureCorrection,
        }
    }

    fn inner(&self) -> &dyn FluidIntegrator {
        match self {
            Self::Coupled(s) => s,
            Self::DualSplitting(s) => s,
            Self::PressureCorrection(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FluidIntegrator {
        match self {
            Self::Coupled(s) => s,
            Self::DualSplitting(s) => s,
            Self::PressureCorrection(s) => s,
        }
    }
}

impl FluidIntegrator for FluidSolver<'_> {
    fn setup(&mut self, restart: bool) -> Result<()> {
        self.inner_mut().setup(restart)
    }

    fn set_time(&mut self, time: f64) {
        self.inner_mut().set_time(time);
    }

    fn time(&self) -> f64 {
        self.inner().time()
    }

    fn start_time(&self) -> f64 {
        self.inner().start_time()
    }

    fn end_time(&self) -> f64 {
        self.inner().end_time()
    }

    fn calculate_time_step_size(&self) -> Result<f64> {
        self.inner().calculate_time_step_size()
    }

    fn set_time_step_size(&mut self, dt: f64) {
        self.inner_mut().set_time_step_size(dt);
    }

    fn get_time_step_size(&self) -> f64 {
        self.inner().get_time_step_size()
    }

    fn get_scaling_factor_time_derivative_term(&self) -> f64 {
        self.inner().get_scaling_factor_time_derivative_term()
    }

    fn on_time_step_size_changed(&mut self) -> Result<()> {
        self.inner_mut().on_time_step_size_changed()
    }

    fn advance_one_timestep(&mut self, accepting: bool) -> Result<bool> {
        self.inner_mut().advance_one_timestep(accepting)
    }

    fn is_finished(&self) -> bool {
        self.inner().is_finished()
    }

    fn step_number(&self) -> usize {
        self.inner().step_number()
    }

    fn velocity(&self) -> &DVector<f64> {
        self.inner().velocity()
    }

    fn pressure(&self) -> &DVector<f64> {
        self.inner().pressure()
    }

    fn statistics(&self) -> &BTreeMap<String, SolveStatistics> {
        self.inner().statistics()
    }

    fn dissipation(&self) -> Dissipation {
        self.inner().dissipation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_never_exceeds_order() {
        let mut history = FluidHistory::new(2);
        for i in 0..5 {
            let v = DVector::from_element(3, i as f64);
            history.push(v.clone(), v.clone(), v);
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.velocity(0)[0], 4.0);
        assert_eq!(history.velocity(1)[0], 3.0);
        assert_eq!(history.convective_terms().count(), 2);
    }
}
