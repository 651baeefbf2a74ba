//! Step size selection.

/// Guards `ceil` against round-off when `L / dt` is an integer.
pub const EPSILON_STEPS: f64 = 1.0e-10;

/// Convective CFL restriction `cfl / k^exp * h_min / |u|_max`.
pub fn calculate_const_time_step_cfl(
    cfl: f64,
    max_velocity: f64,
    h_min: f64,
    degree: usize,
    exponent_fe_degree: f64,
) -> f64 {
    cfl / (degree as f64).powf(exponent_fe_degree) * h_min / max_velocity
}

/// Diffusive restriction `d / k^exp * h_min^2 / kappa`.
pub fn calculate_const_time_step_diffusion(
    diffusion_number: f64,
    diffusivity: f64,
    h_min: f64,
    degree: usize,
    exponent_fe_degree: f64,
) -> f64 {
    diffusion_number / (degree as f64).powf(exponent_fe_degree) * h_min * h_min / diffusivity
}

/// Number of equal steps of size at most `dt` covering `[start, end]`.
pub fn number_of_steps(start: f64, end: f64, dt: f64) -> usize {
    ((end - start) / dt - EPSILON_STEPS).ceil().max(1.0) as usize
}

/// Shrinks `dt` so that an integer number of steps lands on `end`.
pub fn adjust_time_step_to_hit_end_time(start: f64, end: f64, dt: f64) -> f64 {
    (end - start) / number_of_steps(start, end, dt) as f64
}

/// Effective CFL number of `dt`, used for diagnostics.
pub fn cfl_number(dt: f64, max_velocity: f64, h_min: f64, degree: usize, exponent_fe_degree: f64) -> f64 {
    dt * max_velocity * (degree as f64).powf(exponent_fe_degree) / h_min
}
