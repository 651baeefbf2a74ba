//! Explicit Runge-Kutta methods of order 1 to 4.

use std::collections::BTreeMap;

use dgflow_io::SolveStatistics;
use dgflow_model::{ScalarParameters, VelocityCoupling};
use nalgebra::DVector;

use super::{ScalarCore, ScalarIntegrator};
use crate::error::{Result, SolverError};
use crate::functions::ScalarFunctions;
use crate::operators::DgScalarOperators;

/// Butcher tableau of an explicit method, `a` strictly lower triangular.
struct Tableau {
    a: &'static [&'static [f64]],
    b: &'static [f64],
    c: &'static [f64],
}

const EULER: Tableau = Tableau {
    a: &[&[]],
    b: &[1.0],
    c: &[0.0],
};

const HEUN: Tableau = Tableau {
    a: &[&[], &[1.0]],
    b: &[0.5, 0.5],
    c: &[0.0, 1.0],
};

const KUTTA3: Tableau = Tableau {
    a: &[&[], &[0.5], &[-1.0, 2.0]],
    b: &[1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0],
    c: &[0.0, 0.5, 1.0],
};

const RK4: Tableau = Tableau {
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    c: &[0.0, 0.5, 0.5, 1.0],
};

fn tableau(order: usize) -> Result<&'static Tableau> {
    match order {
        1 => Ok(&EULER),
        2 => Ok(&HEUN),
        3 => Ok(&KUTTA3),
        4 => Ok(&RK4),
        _ => Err(SolverError::Configuration(format!(
            "no explicit Runge-Kutta method of order {order}"
        ))),
    }
}

pub struct ExplicitRungeKuttaSolver<'a> {
    core: ScalarCore<'a>,
    tableau: &'static Tableau,
}

impl<'a> ExplicitRungeKuttaSolver<'a> {
    pub fn new(
        params: &ScalarParameters,
        refine_time: u32,
        coupling: VelocityCoupling,
        operators: &'a DgScalarOperators,
        functions: &'a ScalarFunctions,
    ) -> Result<Self> {
        Ok(Self {
            tableau: tableau(params.order_time_integrator)?,
            core: ScalarCore::new(params, 1, refine_time, coupling, operators, functions)?,
        })
    }

    pub fn order(&self) -> usize {
        self.tableau.b.len()
    }

    fn step(core: &mut ScalarCore<'_>, tableau: &Tableau) -> Result<()> {
        let t = core.state.time();
        let dt = core.state.time_step_size();
        let c0 = &core.solution;

        let mut stages: Vec<DVector<f64>> = Vec::with_capacity(tableau.b.len());
        for (row, c) in tableau.a.iter().zip(tableau.c) {
            let mut stage = c0.clone();
            for (a, k) in row.iter().zip(&stages) {
                if *a != 0.0 {
                    stage.axpy(dt * a, k, 1.0);
                }
            }
            stages.push(core.explicit_rhs(&stage, t + c * dt)?);
        }

        let mut solution = c0.clone();
        for (b, k) in tableau.b.iter().zip(&stages) {
            solution.axpy(dt * b, k, 1.0);
        }
        core.solution = solution;
        core.state.push_time_step();
        Ok(())
    }
}

impl ScalarIntegrator for ExplicitRungeKuttaSolver<'_> {
    fn setup(&mut self, restart: bool) -> Result<()> {
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
        self.core.calculate_time_step_size(true)
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
        let tableau = self.tableau;
        self.core
            .advance(accepting, |core| Self::step(core, tableau))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tableaus_are_consistent() {
        for order in 1..=4 {
            let t = tableau(order).unwrap();
            assert_eq!(t.b.len(), order);
            assert!((t.b.iter().sum::<f64>() - 1.0).abs() < 1e-14);
            for (row, c) in t.a.iter().zip(t.c) {
                assert!((row.iter().sum::<f64>() - c).abs() < 1e-14);
            }
        }
        assert!(tableau(5).is_err());
    }
}
