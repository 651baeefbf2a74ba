//! Operator bundles handed to the time integrators.

use std::sync::Arc;

use dgflow_model::{EquationType, FluidParameters, ScalarParameters};
use nalgebra::DVector;

use super::{
    AffineOperator, BodyForceOperator, ConvectiveOperator, DivergenceOperator, EvaluationOperator,
    GradientOperator, InverseMassOperator, LaplaceOperator, LinearOperator, MassOperator,
    TransportOperator,
};
use crate::functions::{FieldFunction, FluidFunctions, ScalarFunctions};
use crate::space::DgSpace;

/// Spatial discretization of the incompressible Navier-Stokes equations.
///
/// Integrators only borrow the set; all operators are read-only during a
/// run.
pub trait SpatialOperatorSet: Sync {
    fn space(&self) -> &DgSpace;
    /// Shared handle for operators the integrators build themselves
    fn space_handle(&self) -> Arc<DgSpace>;
    fn viscosity(&self) -> f64;
    fn mass(&self) -> &dyn LinearOperator;
    fn inverse_mass(&self) -> &dyn LinearOperator;
    /// `None` for Stokes flow
    fn convective(&self) -> Option<&dyn EvaluationOperator>;
    fn viscous(&self) -> &dyn AffineOperator;
    fn gradient(&self) -> &dyn LinearOperator;
    fn divergence(&self) -> &dyn AffineOperator;
    /// Homogeneous Neumann Laplacian used for pressure and pressure increment
    fn pressure_laplace(&self) -> &dyn AffineOperator;
    fn body_force_add(&self, dst: &mut DVector<f64>, time: f64);
    /// Neumann data `n . (f - dg/dt)` of the pressure Poisson equation
    fn pressure_neumann_add(&self, dst: &mut DVector<f64>, time: f64);
}

pub struct DgNavierStokesOperators {
    space: Arc<DgSpace>,
    viscosity: f64,
    mass: MassOperator,
    inverse_mass: InverseMassOperator,
    convective: Option<ConvectiveOperator>,
    viscous: LaplaceOperator,
    gradient: GradientOperator,
    divergence: DivergenceOperator,
    pressure_laplace: LaplaceOperator,
    body_force: BodyForceOperator,
    body_force_function: FieldFunction,
    dirichlet_velocity_dt: FieldFunction,
}

impl DgNavierStokesOperators {
    pub fn new(space: Arc<DgSpace>, params: &FluidParameters, functions: &FluidFunctions) -> Self {
        let bounded = !space.mesh().is_periodic();
        let dirichlet = bounded.then(|| functions.dirichlet_velocity.clone());

        let mut viscous = LaplaceOperator::new(space.clone(), params.viscosity, params.ip_factor);
        if let Some(g) = &dirichlet {
            viscous = viscous.with_dirichlet(g.clone());
        }
        let convective = (params.equation_type == EquationType::NavierStokes).then(|| {
            ConvectiveOperator::new(
                space.clone(),
                params.upwind_factor,
                functions.dirichlet_velocity.clone(),
            )
        });

        Self {
            viscosity: params.viscosity,
            mass: MassOperator::new(space.clone()),
            inverse_mass: InverseMassOperator::new(space.clone()),
            convective,
            viscous,
            gradient: GradientOperator::new(space.clone()),
            divergence: DivergenceOperator::new(space.clone(), dirichlet),
            pressure_laplace: LaplaceOperator::new(space.clone(), 1.0, params.ip_factor),
            body_force: BodyForceOperator::new(space.clone(), functions.body_force.clone()),
            body_force_function: functions.body_force.clone(),
            dirichlet_velocity_dt: functions.dirichlet_velocity_dt.clone(),
            space,
        }
    }
}

impl SpatialOperatorSet for DgNavierStokesOperators {
    fn space(&self) -> &DgSpace {
        &self.space
    }

    fn space_handle(&self) -> Arc<DgSpace> {
        self.space.clone()
    }

    fn viscosity(&self) -> f64 {
        self.viscosity
    }

    fn mass(&self) -> &dyn LinearOperator {
        &self.mass
    }

    fn inverse_mass(&self) -> &dyn LinearOperator {
        &self.inverse_mass
    }

    fn convective(&self) -> Option<&dyn EvaluationOperator> {
        self.convective
            .as_ref()
            .map(|c| c as &dyn EvaluationOperator)
    }

    fn viscous(&self) -> &dyn AffineOperator {
        &self.viscous
    }

    fn gradient(&self) -> &dyn LinearOperator {
        &self.gradient
    }

    fn divergence(&self) -> &dyn AffineOperator {
        &self.divergence
    }

    fn pressure_laplace(&self) -> &dyn AffineOperator {
        &self.pressure_laplace
    }

    fn body_force_add(&self, dst: &mut DVector<f64>, time: f64) {
        self.body_force.evaluate_add(dst, time);
    }

    fn pressure_neumann_add(&self, dst: &mut DVector<f64>, time: f64) {
        for face in self.space.mesh().boundary_faces() {
            let h = face.normal
                * ((self.body_force_function)(face.x, time)
                    - (self.dirichlet_velocity_dt)(face.x, time));
            dst[DgSpace::dof(face.owner, face.owner_node)] += h;
        }
    }
}

/// Spatial discretization of the scalar convection-diffusion equation.
pub struct DgScalarOperators {
    space: Arc<DgSpace>,
    mass: MassOperator,
    inverse_mass: InverseMassOperator,
    transport: TransportOperator,
    diffusion: LaplaceOperator,
    source: BodyForceOperator,
}

impl DgScalarOperators {
    pub fn new(space: Arc<DgSpace>, params: &ScalarParameters, functions: &ScalarFunctions) -> Self {
        let mut diffusion = LaplaceOperator::new(space.clone(), params.diffusivity, params.ip_factor);
        if !space.mesh().is_periodic() {
            diffusion = diffusion.with_dirichlet(functions.dirichlet.clone());
        }
        Self {
            mass: MassOperator::new(space.clone()),
            inverse_mass: InverseMassOperator::new(space.clone()),
            transport: TransportOperator::new(
                space.clone(),
                params.upwind_factor,
                functions.dirichlet.clone(),
            ),
            diffusion,
            source: BodyForceOperator::new(space.clone(), functions.source.clone()),
            space,
        }
    }

    pub fn space(&self) -> &DgSpace {
        &self.space
    }

    pub fn mass(&self) -> &MassOperator {
        &self.mass
    }

    pub fn inverse_mass(&self) -> &InverseMassOperator {
        &self.inverse_mass
    }

    pub fn transport(&self) -> &TransportOperator {
        &self.transport
    }

    pub fn diffusion(&self) -> &LaplaceOperator {
        &self.diffusion
    }

    pub fn source_add(&self, dst: &mut DVector<f64>, time: f64) {
        self.source.evaluate_add(dst, time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    #[test]
    fn stokes_flow_has_no_convective_operator() {
        let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, 2, true).unwrap()));
        let params = FluidParameters {
            equation_type: EquationType::Stokes,
            ..Default::default()
        };
        let operators = DgNavierStokesOperators::new(space, &params, &FluidFunctions::default());
        assert!(operators.convective().is_none());
    }

    #[test]
    fn pressure_neumann_data_follows_normal() {
        let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, 2, false).unwrap()));
        let functions = FluidFunctions {
            dirichlet_velocity_dt: Arc::new(|_, t| 2.0 * t),
            ..Default::default()
        };
        let operators =
            DgNavierStokesOperators::new(space.clone(), &FluidParameters::default(), &functions);
        let mut h = space.zeros();
        operators.pressure_neumann_add(&mut h, 1.5);
        assert_eq!(h[0], 3.0);
        assert_eq!(h[3], -3.0);
        assert_eq!(h[1] + h[2], 0.0);
    }
}
