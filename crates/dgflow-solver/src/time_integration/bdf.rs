//! Variable step BDF coefficients.
//!
//! With the step sizes `dt_0` (current) and `dt_1, dt_2, ...` (previous),
//! the nodes `tau_0 = 0, tau_i = -(dt_0 + ... + dt_{i-1})` are the new and
//! the old time levels relative to `t_{n+1}`. The time derivative of the
//! Lagrange interpolant through them gives
//!
//! ```text
//! (gamma0 u^{n+1} - sum_i alpha_i u^{n-i}) / dt_0
//! ```
//!
//! and the extrapolation coefficients are the Lagrange basis over the old
//! levels evaluated at `tau_0`. For constant steps this reduces to the
//! textbook values, e.g. `gamma0 = 3/2, alpha = [2, -1/2], beta = [2, -1]`.

use crate::error::{Result, SolverError};

/// Largest BDF order with a stable scheme that the integrators use.
pub const MAX_ORDER: usize = 3;

/// Time, step-size history and BDF constants of one integrator.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStepState {
    order: usize,
    start_with_low_order: bool,
    time: f64,
    step_number: usize,
    /// Most recent first, length `order`
    time_steps: Vec<f64>,
    gamma0: f64,
    alpha: Vec<f64>,
    beta: Vec<f64>,
}

impl TimeStepState {
    pub fn new(order: usize, start_with_low_order: bool, time: f64) -> Result<Self> {
        if !(1..=MAX_ORDER).contains(&order) {
            return Err(SolverError::Configuration(format!(
                "BDF order {order} not in 1..={MAX_ORDER}"
            )));
        }
        Ok(Self {
            order,
            start_with_low_order,
            time,
            step_number: 1,
            time_steps: vec![0.0; order],
            gamma0: 1.0,
            alpha: vec![1.0],
            beta: vec![1.0],
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Number of the step about to be taken, starting at 1.
    pub fn step_number(&self) -> usize {
        self.step_number
    }

    pub fn time_step_size(&self) -> f64 {
        self.time_steps[0]
    }

    pub fn time_steps(&self) -> &[f64] {
        &self.time_steps
    }

    /// Sets the current step size. Before the first step the whole history
    /// is filled so that a seeded start sees constant steps.
    pub fn set_time_step_size(&mut self, dt: f64) {
        if self.step_number == 1 {
            self.time_steps.fill(dt);
        } else {
            self.time_steps[0] = dt;
        }
    }

    /// Order used in the current step.
    pub fn effective_order(&self) -> usize {
        if self.start_with_low_order {
            self.order.min(self.step_number)
        } else {
            self.order
        }
    }

    pub fn gamma0(&self) -> f64 {
        self.gamma0
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    /// `gamma0 / dt`, the factor of the mass matrix in every implicit step.
    pub fn scaling_factor_time_derivative_term(&self) -> f64 {
        self.gamma0 / self.time_step_size()
    }

    /// Recomputes `gamma0`, `alpha` and `beta` from the current history.
    pub fn update_time_integration_constants(&mut self) {
        let order = self.effective_order();
        let tau = self.nodes(order);
        let dt = self.time_steps[0];

        // derivative of the basis function of tau_0 at tau_0
        self.gamma0 = dt * (1..=order).map(|k| 1.0 / (tau[0] - tau[k])).sum::<f64>();
        self.alpha = (1..=order)
            .map(|j| {
                let numerator: f64 = (1..=order).filter(|&k| k != j).map(|k| tau[0] - tau[k]).product();
                let denominator: f64 = (0..=order).filter(|&k| k != j).map(|k| tau[j] - tau[k]).product();
                -dt * numerator / denominator
            })
            .collect();
        self.beta = self.extrapolation_coefficients(order);
    }

    /// Coefficients extrapolating the last `order` levels to `t_{n+1}`.
    pub fn extrapolation_coefficients(&self, order: usize) -> Vec<f64> {
        let tau = self.nodes(order);
        (1..=order)
            .map(|j| {
                (1..=order)
                    .filter(|&k| k != j)
                    .map(|k| (tau[0] - tau[k]) / (tau[j] - tau[k]))
                    .product()
            })
            .collect()
    }

    /// Advances the clock after an accepted step and shifts the step sizes.
    pub fn push_time_step(&mut self) {
        self.time += self.time_steps[0];
        self.step_number += 1;
        self.time_steps.rotate_right(1);
        self.time_steps[0] = self.time_steps[1.min(self.order - 1)];
    }

    fn nodes(&self, order: usize) -> Vec<f64> {
        let mut tau = Vec::with_capacity(order + 1);
        let mut t = 0.0;
        tau.push(t);
        for i in 0..order {
            t -= self.time_steps[i.min(self.order - 1)];
            tau.push(t);
        }
        tau
    }
}

/// `sum_i c_i v_i` over the leading entries of a history.
pub fn linear_combination<'a, I>(coefficients: &[f64], history: I) -> Option<nalgebra::DVector<f64>>
where
    I: IntoIterator<Item = &'a nalgebra::DVector<f64>>,
{
    let mut iter = coefficients.iter().zip(history);
    let (c0, v0) = iter.next()?;
    let mut sum = v0 * *c0;
    for (c, v) in iter {
        sum.axpy(*c, v, 1.0);
    }
    Some(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-12, "{a:?} != {b:?}");
        }
    }

    fn constant_step_state(order: usize) -> TimeStepState {
        let mut state = TimeStepState::new(order, false, 0.0).unwrap();
        state.set_time_step_size(0.1);
        state.update_time_integration_constants();
        state
    }

    #[test]
    fn constant_step_coefficients() {
        let s1 = constant_step_state(1);
        assert!((s1.gamma0() - 1.0).abs() < 1e-12);
        assert_close(s1.alpha(), &[1.0]);
        assert_close(s1.beta(), &[1.0]);

        let s2 = constant_step_state(2);
        assert!((s2.gamma0() - 1.5).abs() < 1e-12);
        assert_close(s2.alpha(), &[2.0, -0.5]);
        assert_close(s2.beta(), &[2.0, -1.0]);

        let s3 = constant_step_state(3);
        assert!((s3.gamma0() - 11.0 / 6.0).abs() < 1e-12);
        assert_close(s3.alpha(), &[3.0, -1.5, 1.0 / 3.0]);
        assert_close(s3.beta(), &[3.0, -3.0, 1.0]);
    }

    #[test]
    fn alpha_sums_to_gamma0() {
        let mut state = TimeStepState::new(3, false, 0.0).unwrap();
        state.set_time_step_size(0.1);
        state.push_time_step();
        state.set_time_step_size(0.05);
        state.push_time_step();
        state.set_time_step_size(0.2);
        state.update_time_integration_constants();
        // consistency: constants are differentiated to zero
        let sum: f64 = state.alpha().iter().sum();
        assert!((sum - state.gamma0()).abs() < 1e-12);
        let beta_sum: f64 = state.beta().iter().sum();
        assert!((beta_sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn variable_step_bdf2_is_exact_for_quadratics() {
        let mut state = TimeStepState::new(2, false, 0.0).unwrap();
        state.set_time_step_size(0.1);
        state.push_time_step();
        state.set_time_step_size(0.3);
        state.update_time_integration_constants();
        assert_close(state.time_steps(), &[0.3, 0.1]);

        let f = |t: f64| 1.0 + 2.0 * t - t * t;
        let df = |t: f64| 2.0 - 2.0 * t;
        let (t1, t0, tm1) = (0.4, 0.1, 0.0);
        let derivative = (state.gamma0() * f(t1) - state.alpha()[0] * f(t0) - state.alpha()[1] * f(tm1)) / 0.3;
        assert!((derivative - df(t1)).abs() < 1e-12);

        // extrapolation is exact for linear functions
        let g = |t: f64| 3.0 - 4.0 * t;
        let extrapolated = state.beta()[0] * g(t0) + state.beta()[1] * g(tm1);
        assert!((extrapolated - g(t1)).abs() < 1e-12);
    }

    #[test]
    fn low_order_start_ramps_up() {
        let mut state = TimeStepState::new(3, true, 0.0).unwrap();
        state.set_time_step_size(0.1);
        let mut orders = Vec::new();
        for _ in 0..4 {
            state.update_time_integration_constants();
            orders.push(state.alpha().len());
            state.push_time_step();
        }
        assert_eq!(orders, vec![1, 2, 3, 3]);
        assert!((state.time() - 0.4).abs() < 1e-12);
        assert_eq!(state.step_number(), 5);
    }

    #[test]
    fn pushing_keeps_current_step_size() {
        let mut state = TimeStepState::new(2, true, 1.0).unwrap();
        state.set_time_step_size(0.5);
        state.push_time_step();
        assert_eq!(state.time_step_size(), 0.5);
        assert!(TimeStepState::new(4, true, 0.0).is_err());
    }

    #[test]
    fn linear_combination_uses_leading_entries() {
        use nalgebra::DVector;
        let history = vec![
            DVector::from_vec(vec![1.0, 2.0]),
            DVector::from_vec(vec![3.0, 4.0]),
            DVector::from_vec(vec![100.0, 100.0]),
        ];
        let sum = linear_combination(&[2.0, -1.0], &history).unwrap();
        assert_eq!(sum, DVector::from_vec(vec![-1.0, 0.0]));
        assert!(linear_combination(&[], &history).is_none());
    }
}
