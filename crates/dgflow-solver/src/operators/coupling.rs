//! Velocity-pressure coupling with central fluxes.
//!
//! The gradient takes the interior pressure trace on boundary faces; the
//! homogeneous divergence sets the velocity trace to zero there and moves
//! the Dirichlet data to the right-hand side. With these conventions the
//! assembled matrices satisfy `G = -D^T`.

use std::sync::Arc;

use nalgebra::DVector;

use super::{AffineOperator, LinearOperator, for_each_cell};
use crate::functions::FieldFunction;
use crate::space::DgSpace;

/// `-(p, dv/dx)` over cells, cell-wise `-int phi_j dphi_i/dx` is `[[1, 1], [-1, -1]] / 2`.
fn weak_derivative_cells(dst: &mut DVector<f64>, src: &DVector<f64>) {
    for_each_cell(dst, src, |_, d, s| {
        let half_sum = 0.5 * (s[0] + s[1]);
        d[0] += half_sum;
        d[1] -= half_sum;
    });
}

pub struct GradientOperator {
    space: Arc<DgSpace>,
}

impl GradientOperator {
    pub fn new(space: Arc<DgSpace>) -> Self {
        Self { space }
    }
}

impl LinearOperator for GradientOperator {
    fn n_dofs(&self) -> usize {
        self.space.n_dofs()
    }

    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        weak_derivative_cells(dst, src);
        for face in self.space.mesh().faces() {
            let o = DgSpace::dof(face.owner, face.owner_node);
            match face.neighbor {
                Some((nb, nb_node)) => {
                    let p = DgSpace::dof(nb, nb_node);
                    let flux = 0.5 * (src[o] + src[p]) * face.normal;
                    dst[o] += flux;
                    dst[p] -= flux;
                }
                None => dst[o] += src[o] * face.normal,
            }
        }
    }
}

pub struct DivergenceOperator {
    space: Arc<DgSpace>,
    dirichlet_velocity: Option<FieldFunction>,
}

impl DivergenceOperator {
    pub fn new(space: Arc<DgSpace>, dirichlet_velocity: Option<FieldFunction>) -> Self {
        Self {
            space,
            dirichlet_velocity,
        }
    }
}

impl LinearOperator for DivergenceOperator {
    fn n_dofs(&self) -> usize {
        self.space.n_dofs()
    }

    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        weak_derivative_cells(dst, src);
        for face in self.space.mesh().faces() {
            if let Some((nb, nb_node)) = face.neighbor {
                let o = DgSpace::dof(face.owner, face.owner_node);
                let p = DgSpace::dof(nb, nb_node);
                let flux = 0.5 * (src[o] + src[p]) * face.normal;
                dst[o] += flux;
                dst[p] -= flux;
            }
        }
    }
}

impl AffineOperator for DivergenceOperator {
    fn rhs_add(&self, dst: &mut DVector<f64>, time: f64) {
        let Some(g) = &self.dirichlet_velocity else {
            return;
        };
        for face in self.space.mesh().boundary_faces() {
            dst[DgSpace::dof(face.owner, face.owner_node)] -= g(face.x, time) * face.normal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    #[test]
    fn gradient_of_constant_vanishes() {
        for periodic in [true, false] {
            let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, 5, periodic).unwrap()));
            let gradient = GradientOperator::new(space.clone());
            let mut dst = space.zeros();
            gradient.apply(&mut dst, &space.constant(2.5));
            assert!(dst.amax() < 1e-14);
        }
    }

    #[test]
    fn gradient_of_linear_pressure_is_mass_times_slope() {
        let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 2.0, 4, false).unwrap()));
        let gradient = GradientOperator::new(space.clone());
        let mass = super::super::MassOperator::new(space.clone());
        let mut gp = space.zeros();
        let mut expected = space.zeros();
        gradient.apply(&mut gp, &space.interpolate(|x| -4.0 * x + 1.0));
        mass.apply(&mut expected, &space.constant(-4.0));
        assert!((gp - expected).amax() < 1e-13);
    }

    #[test]
    fn divergence_of_matching_constant_velocity_vanishes() {
        let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, 3, false).unwrap()));
        let divergence = DivergenceOperator::new(space.clone(), Some(crate::functions::constant(1.7)));
        let mut dst = space.zeros();
        divergence.evaluate(&mut dst, &space.constant(1.7), 0.0);
        assert!(dst.amax() < 1e-14);
    }
}
