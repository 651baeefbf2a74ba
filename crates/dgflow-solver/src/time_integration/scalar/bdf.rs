//! BDF for the scalar: extrapolated explicit transport, implicit diffusion.

use std::collections::{BTreeMap, VecDeque};

use dgflow_io::SolveStatistics;
use dgflow_model::{ScalarParameters, VelocityCoupling};
use nalgebra::DVector;

use super::{ScalarCore, ScalarIntegrator};
use crate::error::{Result, SolverError};
use crate::functions::ScalarFunctions;
use crate::operators::{DgScalarOperators, HelmholtzOperator, LinearOperator};
use crate::solvers::{ConjugateGradient, LinearSolver, Preconditioner, build_preconditioner};
use crate::time_integration::bdf::linear_combination;

pub struct BdfScalarSolver<'a> {
    core: ScalarCore<'a>,
    helmholtz: HelmholtzOperator<'a>,
    preconditioner: Option<Box<dyn Preconditioner + 'a>>,
    preconditioner_factor: f64,
    /// Most recent first
    solutions: VecDeque<DVector<f64>>,
    transport_terms: VecDeque<DVector<f64>>,
    history_initialized: bool,
}

impl<'a> BdfScalarSolver<'a> {
    pub fn new(
        params: &ScalarParameters,
        refine_time: u32,
        coupling: VelocityCoupling,
        operators: &'a DgScalarOperators,
        functions: &'a ScalarFunctions,
    ) -> Result<Self> {
        Ok(Self {
            core: ScalarCore::new(
                params,
                params.order_time_integrator,
                refine_time,
                coupling,
                operators,
                functions,
            )?,
            helmholtz: HelmholtzOperator::new(operators.mass(), operators.diffusion()),
            preconditioner: None,
            preconditioner_factor: f64::NAN,
            solutions: VecDeque::new(),
            transport_terms: VecDeque::new(),
            history_initialized: false,
        })
    }

    fn push_level(&mut self, solution: DVector<f64>, transport: DVector<f64>) {
        let order = self.core.state.order();
        self.solutions.push_front(solution);
        self.transport_terms.push_front(transport);
        self.solutions.truncate(order);
        self.transport_terms.truncate(order);
    }

    /// Starts from the initial solution, or seeds all levels from the
    /// analytical solution when not ramping up the order.
    fn initialize_history(&mut self) -> Result<()> {
        self.solutions.clear();
        self.transport_terms.clear();
        let t0 = self.core.state.time();
        if self.core.params.start_with_low_order {
            let c0 = self.core.solution.clone();
            let transport = self.core.transport_term(&c0, t0)?;
            self.push_level(c0, transport);
        } else {
            let dt = self.core.state.time_step_size();
            for i in (0..self.core.state.order()).rev() {
                let t = t0 - i as f64 * dt;
                let analytical = &self.core.functions.analytical_solution;
                let c = self.core.operators.space().interpolate(|x| analytical(x, t));
                let transport = self.core.transport_term(&c, t)?;
                self.push_level(c, transport);
            }
            self.core.solution = self.solutions[0].clone();
        }
        self.history_initialized = true;
        Ok(())
    }

    fn update_implicit_operator(&mut self) -> Result<()> {
        self.core.state.update_time_integration_constants();
        let factor = self.core.state.scaling_factor_time_derivative_term();
        self.helmholtz.set_scaling_factor_mass(factor);
        if factor != self.preconditioner_factor || self.preconditioner.is_none() {
            self.preconditioner = Some(build_preconditioner(
                self.core.params.preconditioner,
                &self.helmholtz,
                self.core.operators.inverse_mass(),
            )?);
            self.preconditioner_factor = factor;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        if !self.history_initialized {
            self.initialize_history()?;
        }
        self.update_implicit_operator()?;

        let core = &self.core;
        let n = core.solution.len();
        let dt = core.state.time_step_size();
        let t = core.state.time() + dt;

        let sum_alpha = linear_combination(core.state.alpha(), &self.solutions)
            .unwrap_or_else(|| DVector::zeros(n));
        let mut rhs = DVector::zeros(n);
        core.operators.mass().apply(&mut rhs, &sum_alpha);
        rhs /= dt;
        if let Some(extrapolated) = linear_combination(core.state.beta(), &self.transport_terms) {
            rhs -= extrapolated;
        }
        core.operators.source_add(&mut rhs, t);
        self.helmholtz.rhs_add(&mut rhs, t);

        let mut solution = linear_combination(core.state.beta(), &self.solutions)
            .unwrap_or_else(|| core.solution.clone());
        let Some(preconditioner) = self.preconditioner.as_deref() else {
            return Err(SolverError::Configuration(
                "scalar preconditioner missing".to_string(),
            ));
        };
        let info = ConjugateGradient::new(core.params.solver).solve(
            &self.helmholtz,
            preconditioner,
            &mut solution,
            &rhs,
        )?;
        self.core.record("scalar", &info);

        let transport = self.core.transport_term(&solution, t)?;
        self.core.solution = solution.clone();
        self.push_level(solution, transport);
        self.core.state.push_time_step();
        Ok(())
    }
}

impl ScalarIntegrator for BdfScalarSolver<'_> {
    fn setup(&mut self, restart: bool) -> Result<()> {
        self.history_initialized = false;
        self.core.setup(restart)
    }

    fn set_time(&mut self, time: f64) {
        self.core.state.set_time(time);
    }

    fn time(&self) -> f64 {
        self.core.state.time()
    }

    fn start_time(&self) -> f64 {
        self.core.params.start_time
    }

    fn end_time(&self) -> f64 {
        self.core.params.end_time
    }

    fn calculate_time_step_size(&self) -> Result<f64> {
        self.core.calculate_time_step_size(false)
    }

    fn set_time_step_size(&mut self, dt: f64) {
        self.core.state.set_time_step_size(dt);
    }

    fn get_time_step_size(&self) -> f64 {
        self.core.state.time_step_size()
    }

    fn set_velocity(&mut self, time: f64, velocity: &DVector<f64>) {
        self.core.set_velocity(time, velocity);
    }

    fn advance_one_timestep(&mut self, accepting: bool) -> Result<bool> {
        if accepting && self.core.has_started() && !self.core.is_finished() {
            self.core.ensure_setup()?;
            self.step()?;
            return Ok(self.core.is_finished());
        }
        self.core.advance(accepting, |_| Ok(()))
    }

    fn is_finished(&self) -> bool {
        self.core.is_finished()
    }

    fn step_number(&self) -> usize {
        self.core.state.step_number()
    }

    fn solution(&self) -> &DVector<f64> {
        &self.core.solution
    }

    fn statistics(&self) -> &BTreeMap<String, SolveStatistics> {
        &self.core.statistics
    }
}
