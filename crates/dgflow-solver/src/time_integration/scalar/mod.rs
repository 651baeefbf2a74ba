//! Integrators of the scalar convection-diffusion equation
//!
//! ```text
//! dc/dt + div(w c) - kappa lap c = f
//! ```
//!
//! The transport velocity `w` is either the fluid velocity handed over by
//! the time loop after every fluid step, or a prescribed field.

mod bdf;
mod explicit_rk;

pub use bdf::BdfScalarSolver;
pub use explicit_rk::ExplicitRungeKuttaSolver;

use std::collections::{BTreeMap, VecDeque};

use dgflow_io::SolveStatistics;
use dgflow_model::{ScalarParameters, ScalarScheme, TimeStepCalculation, VelocityCoupling};
use nalgebra::DVector;
use tracing::{debug, warn};

use super::TIME_EPSILON;
use super::bdf::TimeStepState;
use crate::error::{Result, SolverError};
use crate::functions::{FieldFunction, ScalarFunctions};
use crate::operators::{AffineOperator, DgScalarOperators, LinearOperator};
use crate::solvers::SolveInfo;
use crate::time_step_calculation::{
    calculate_const_time_step_cfl, calculate_const_time_step_diffusion, cfl_number,
};

pub trait ScalarIntegrator {
    fn setup(&mut self, restart: bool) -> Result<()>;

    fn set_time(&mut self, time: f64);
    fn time(&self) -> f64;
    fn start_time(&self) -> f64;
    fn end_time(&self) -> f64;

    fn calculate_time_step_size(&self) -> Result<f64>;
    fn set_time_step_size(&mut self, dt: f64);
    fn get_time_step_size(&self) -> f64;

    /// Hands over the fluid velocity at `time`. Ignored for a prescribed
    /// transport velocity.
    fn set_velocity(&mut self, time: f64, velocity: &DVector<f64>);

    /// Same contract as [`super::FluidIntegrator::advance_one_timestep`].
    fn advance_one_timestep(&mut self, accepting: bool) -> Result<bool>;
    fn is_finished(&self) -> bool;

    fn step_number(&self) -> usize;
    fn solution(&self) -> &DVector<f64>;
    fn statistics(&self) -> &BTreeMap<String, SolveStatistics>;
}

/// Fluid velocities at the most recent hand-over times.
#[derive(Debug, Clone, Default)]
pub struct VelocityHistory {
    /// Oldest first
    levels: VecDeque<(f64, DVector<f64>)>,
}

impl VelocityHistory {
    const CAPACITY: usize = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: f64, velocity: DVector<f64>) {
        if let Some((last, _)) = self.levels.back()
            && (time - last).abs() < TIME_EPSILON
        {
            self.levels.pop_back();
        }
        self.levels.push_back((time, velocity));
        while self.levels.len() > Self::CAPACITY {
            self.levels.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Linear interpolation between the stored levels, constant outside.
    pub fn interpolate(&self, time: f64) -> Option<DVector<f64>> {
        let (t_old, v_old) = self.levels.front()?;
        let (t_new, v_new) = self.levels.back()?;
        if time >= *t_new {
            return Some(v_new.clone());
        }
        if time <= *t_old {
            return Some(v_old.clone());
        }
        let theta = (time - t_old) / (t_new - t_old);
        Some(v_old * (1.0 - theta) + v_new * theta)
    }
}

/// Source of the transport velocity `w(t)`.
pub enum TransportVelocity {
    FluidVelocity(VelocityHistory),
    Prescribed(FieldFunction),
}

impl TransportVelocity {
    pub fn new(coupling: VelocityCoupling, functions: &ScalarFunctions) -> Self {
        match coupling {
            VelocityCoupling::FluidVelocity => Self::FluidVelocity(VelocityHistory::new()),
            VelocityCoupling::Prescribed => Self::Prescribed(functions.transport_velocity.clone()),
        }
    }
}

/// State shared by the scalar integrators.
pub(crate) struct ScalarCore<'a> {
    pub params: ScalarParameters,
    pub refine_time: u32,
    pub operators: &'a DgScalarOperators,
    pub functions: &'a ScalarFunctions,
    pub state: TimeStepState,
    pub velocity: TransportVelocity,
    pub solution: DVector<f64>,
    pub statistics: BTreeMap<String, SolveStatistics>,
    is_setup: bool,
}

impl<'a> ScalarCore<'a> {
    pub fn new(
        params: &ScalarParameters,
        bdf_order: usize,
        refine_time: u32,
        coupling: VelocityCoupling,
        operators: &'a DgScalarOperators,
        functions: &'a ScalarFunctions,
    ) -> Result<Self> {
        params.check()?;
        Ok(Self {
            params: params.clone(),
            refine_time,
            operators,
            functions,
            state: TimeStepState::new(bdf_order, params.start_with_low_order, params.start_time)?,
            velocity: TransportVelocity::new(coupling, functions),
            solution: operators.space().zeros(),
            statistics: BTreeMap::new(),
            is_setup: false,
        })
    }

    pub fn setup(&mut self, restart: bool) -> Result<()> {
        if restart {
            return Err(SolverError::Unimplemented("restart".to_string()));
        }
        let t0 = self.params.start_time;
        self.solution = self
            .operators
            .space()
            .interpolate(|x| (self.functions.initial_solution)(x, t0));
        self.is_setup = true;
        Ok(())
    }

    pub fn ensure_setup(&self) -> Result<()> {
        if self.is_setup {
            Ok(())
        } else {
            Err(SolverError::Configuration(
                "scalar integrator used before setup".to_string(),
            ))
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.time() > self.params.end_time - TIME_EPSILON
    }

    pub fn has_started(&self) -> bool {
        self.state.time() > self.params.start_time - TIME_EPSILON
    }

    pub fn set_velocity(&mut self, time: f64, velocity: &DVector<f64>) {
        if let TransportVelocity::FluidVelocity(history) = &mut self.velocity {
            history.push(time, velocity.clone());
        }
    }

    pub fn transport_velocity(&self, time: f64) -> Result<DVector<f64>> {
        match &self.velocity {
            TransportVelocity::FluidVelocity(history) => history.interpolate(time).ok_or_else(|| {
                SolverError::Configuration("no fluid velocity handed to the scalar".to_string())
            }),
            TransportVelocity::Prescribed(w) => {
                Ok(self.operators.space().interpolate(|x| w(x, time)))
            }
        }
    }

    pub fn calculate_time_step_size(&self, explicit_diffusion: bool) -> Result<f64> {
        let refine = 2f64.powi(self.refine_time as i32);
        let space = self.operators.space();
        let h_min = space.mesh().min_cell_size();
        let p = &self.params;
        let dt = match p.time_step_calculation {
            TimeStepCalculation::UserSpecified => p.time_step_size,
            TimeStepCalculation::ConstTimeStepCfl => {
                let mut dt = f64::INFINITY;
                if p.max_velocity > 0.0 {
                    dt = calculate_const_time_step_cfl(
                        p.cfl,
                        p.max_velocity,
                        h_min,
                        space.degree(),
                        p.cfl_exponent_fe_degree,
                    );
                }
                if explicit_diffusion && p.diffusivity > 0.0 {
                    dt = dt.min(calculate_const_time_step_diffusion(
                        p.diffusion_number,
                        p.diffusivity,
                        h_min,
                        space.degree(),
                        p.cfl_exponent_fe_degree,
                    ));
                }
                if !dt.is_finite() {
                    return Err(SolverError::Configuration(
                        "CFL time step needs a positive max_velocity or diffusivity".to_string(),
                    ));
                }
                dt
            }
            TimeStepCalculation::AdaptiveTimeStepCfl => {
                return Err(SolverError::Unimplemented(
                    "adaptive time stepping".to_string(),
                ));
            }
        } / refine;

        let cfl = cfl_number(dt, p.max_velocity, h_min, space.degree(), p.cfl_exponent_fe_degree);
        if cfl > 1.0 {
            warn!(cfl, dt, "scalar time step exceeds the CFL limit of the explicit transport term");
        }
        Ok(dt)
    }

    /// `C(c, w(t))` with inflow data at `time`.
    pub fn transport_term(&self, c: &DVector<f64>, time: f64) -> Result<DVector<f64>> {
        let w = self.transport_velocity(time)?;
        let mut dst = DVector::zeros(c.len());
        self.operators.transport().evaluate(&mut dst, c, &w, time);
        Ok(dst)
    }

    /// `M^-1 (f - C(c, w) - kappa L c + kappa b_L)` at `time`.
    pub fn explicit_rhs(&self, c: &DVector<f64>, time: f64) -> Result<DVector<f64>> {
        let mut rhs = DVector::zeros(c.len());
        self.operators.source_add(&mut rhs, time);
        rhs -= self.transport_term(c, time)?;
        let mut diffusion = DVector::zeros(c.len());
        self.operators.diffusion().evaluate(&mut diffusion, c, time);
        rhs -= diffusion;

        let mut dst = DVector::zeros(c.len());
        self.operators.inverse_mass().apply(&mut dst, &rhs);
        Ok(dst)
    }

    pub fn record(&mut self, name: &str, info: &SolveInfo) {
        debug!(
            solve = name,
            solver = info.solver_name,
            iterations = info.iterations,
            "linear solve"
        );
        self.statistics
            .entry(name.to_string())
            .or_default()
            .record(info.iterations);
    }

    /// Shared part of `advance_one_timestep`; `step` runs only when the
    /// integrator has started and is not finished.
    pub fn advance<F>(&mut self, accepting: bool, step: F) -> Result<bool>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if !accepting {
            return Ok(self.is_finished());
        }
        if !self.has_started() {
            let t = self.state.time() + self.state.time_step_size();
            self.state.set_time(t);
        } else if !self.is_finished() {
            self.ensure_setup()?;
            step(self)?;
        }
        Ok(self.is_finished())
    }
}

/// Scalar integrator chosen at runtime from [`ScalarParameters::scheme`].
pub enum ScalarSolver<'a> {
    ExplicitRungeKutta(ExplicitRungeKuttaSolver<'a>),
    Bdf(BdfScalarSolver<'a>),
}

impl<'a> ScalarSolver<'a> {
    pub fn new(
        params: &ScalarParameters,
        refine_time: u32,
        coupling: VelocityCoupling,
        operators: &'a DgScalarOperators,
        functions: &'a ScalarFunctions,
    ) -> Result<Self> {
        Ok(match params.scheme {
            ScalarScheme::ExplicitRungeKutta => Self::ExplicitRungeKutta(
                ExplicitRungeKuttaSolver::new(params, refine_time, coupling, operators, functions)?,
            ),
            ScalarScheme::Bdf => Self::Bdf(BdfScalarSolver::new(
                params,
                refine_time,
                coupling,
                operators,
                functions,
            )?),
        })
    }

    pub fn scheme(&self) -> ScalarScheme {
        match self {
            Self::ExplicitRungeKutta(_) => ScalarScheme::ExplicitRungeKutta,
            Self::Bdf(_) => ScalarScheme::Bdf,
        }
    }

    fn inner(&self) -> &dyn ScalarIntegrator {
        match self {
            Self::ExplicitRungeKutta(s) => s,
            Self::Bdf(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ScalarIntegrator {
        match self {
            Self::ExplicitRungeKutta(s) => s,
            Self::Bdf(s) => s,
        }
    }
}

impl ScalarIntegrator for ScalarSolver<'_> {
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

    fn set_velocity(&mut self, time: f64, velocity: &DVector<f64>) {
        self.inner_mut().set_velocity(time, velocity);
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

    fn solution(&self) -> &DVector<f64> {
        self.inner().solution()
    }

    fn statistics(&self) -> &BTreeMap<String, SolveStatistics> {
        self.inner().statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_history_interpolates_linearly() {
        let mut history = VelocityHistory::new();
        assert!(history.interpolate(0.0).is_none());
        history.push(0.0, DVector::from_element(2, 1.0));
        assert_eq!(history.interpolate(5.0).unwrap()[0], 1.0);

        history.push(0.5, DVector::from_element(2, 3.0));
        assert!((history.interpolate(0.25).unwrap()[1] - 2.0).abs() < 1e-14);
        assert_eq!(history.interpolate(1.0).unwrap()[0], 3.0);
        assert_eq!(history.interpolate(-1.0).unwrap()[0], 1.0);

        history.push(1.0, DVector::from_element(2, 5.0));
        assert_eq!(history.len(), 2);
        assert_eq!(history.interpolate(0.0).unwrap()[0], 3.0);
    }

    #[test]
    fn repeated_hand_over_replaces_level() {
        let mut history = VelocityHistory::new();
        history.push(0.0, DVector::from_element(1, 1.0));
        history.push(0.0, DVector::from_element(1, 2.0));
        assert_eq!(history.len(), 1);
        assert_eq!(history.interpolate(0.0).unwrap()[0], 2.0);
    }
}
