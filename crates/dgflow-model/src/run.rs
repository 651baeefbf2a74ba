use serde::{Deserialize, Serialize};

use crate::error::{ParameterError, Result};

/// Inclusive refinement range of a convergence study.
///
/// Only a single level is supported, `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementLevels {
    pub min: u32,
    pub max: u32,
}

impl RefinementLevels {
    pub fn fixed(level: u32) -> Self {
        Self {
            min: level,
            max: level,
        }
    }

    fn check(&self, what: &'static str) -> Result<()> {
        if self.min != self.max {
            return Err(ParameterError::RefinementRange {
                what,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Source of the transport velocity seen by the scalar integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VelocityCoupling {
    /// Current fluid velocity, interpolated linearly in time for stages
    FluidVelocity,
    /// Analytical transport velocity of the scalar problem
    Prescribed,
}

/// Mesh, discretization and driver settings shared by both sub-problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    pub dimension: usize,
    /// Polynomial degree of the velocity space
    pub degree_velocity: usize,
    /// Polynomial degree of the pressure space
    pub degree_pressure: usize,
    pub degree_scalar: usize,
    pub refine_space: RefinementLevels,
    pub refine_time: RefinementLevels,
    /// Cells of the coarsest mesh, refined `refine_space.min` times by bisection
    pub n_base_cells: usize,
    pub left: f64,
    pub right: f64,
    pub periodic: bool,
    pub restart: bool,
    pub velocity_coupling: VelocityCoupling,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            dimension: 1,
            degree_velocity: 1,
            degree_pressure: 1,
            degree_scalar: 1,
            refine_space: RefinementLevels::fixed(3),
            refine_time: RefinementLevels::fixed(0),
            n_base_cells: 2,
            left: 0.0,
            right: 1.0,
            periodic: true,
            restart: false,
            velocity_coupling: VelocityCoupling::FluidVelocity,
        }
    }
}

impl RunParameters {
    pub fn n_cells(&self) -> usize {
        self.n_base_cells << self.refine_space.min
    }

    pub fn check(&self) -> Result<()> {
        if self.dimension != 1 {
            return Err(ParameterError::Unimplemented(format!(
                "dimension {} (only 1 is available)",
                self.dimension
            )));
        }
        for (name, degree) in [
            ("velocity", self.degree_velocity),
            ("pressure", self.degree_pressure),
            ("scalar", self.degree_scalar),
        ] {
            if degree != 1 {
                return Err(ParameterError::Unimplemented(format!(
                    "{name} degree {degree} (only linear elements are available)"
                )));
            }
        }
        self.refine_space.check("space")?;
        self.refine_time.check("time")?;
        if self.n_base_cells == 0 {
            return Err(ParameterError::invalid(
                "run.n_base_cells",
                "mesh needs at least one cell",
            ));
        }
        if self.refine_space.min > 16 {
            return Err(ParameterError::invalid(
                "run.refine_space",
                format!("refinement level {} is too large", self.refine_space.min),
            ));
        }
        if !(self.right > self.left) {
            return Err(ParameterError::invalid(
                "run.right",
                format!("empty interval [{}, {}]", self.left, self.right),
            ));
        }
        if self.restart {
            return Err(ParameterError::Unimplemented("restart".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refinement_range_is_rejected() {
        let params = RunParameters {
            refine_space: RefinementLevels { min: 2, max: 4 },
            ..Default::default()
        };
        assert_eq!(
            params.check(),
            Err(ParameterError::RefinementRange {
                what: "space",
                min: 2,
                max: 4
            })
        );
    }

    #[test]
    fn restart_is_unimplemented() {
        let params = RunParameters {
            restart: true,
            ..Default::default()
        };
        assert!(matches!(
            params.check(),
            Err(ParameterError::Unimplemented(_))
        ));
    }

    #[test]
    fn n_cells_follows_refinement() {
        let params = RunParameters {
            n_base_cells: 3,
            refine_space: RefinementLevels::fixed(2),
            ..Default::default()
        };
        assert_eq!(params.n_cells(), 12);
    }

    #[test]
    fn higher_dimensions_are_rejected() {
        let params = RunParameters {
            dimension: 2,
            ..Default::default()
        };
        assert!(params.check().is_err());
    }
}
