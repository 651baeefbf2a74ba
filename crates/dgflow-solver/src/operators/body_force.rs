use std::sync::Arc;

use nalgebra::DVector;

use crate::functions::FieldFunction;
use crate::space::DgSpace;

/// Right-hand side `(f(t), v)` by Gauss quadrature.
pub struct BodyForceOperator {
    space: Arc<DgSpace>,
    force: FieldFunction,
}

impl BodyForceOperator {
    pub fn new(space: Arc<DgSpace>, force: FieldFunction) -> Self {
        Self { space, force }
    }

    pub fn evaluate_add(&self, dst: &mut DVector<f64>, time: f64) {
        let mesh = self.space.mesh();
        for cell in 0..mesh.n_cells() {
            let (xl, _) = mesh.cell_bounds(cell);
            let h = mesh.cell_size(cell);
            let (mut r0, mut r1) = (0.0, 0.0);
            for (xi, w) in DgSpace::quadrature() {
                let f = (self.force)(xl + xi * h, time) * w * h;
                r0 += f * (1.0 - xi);
                r1 += f * xi;
            }
            dst[DgSpace::dof(cell, 0)] += r0;
            dst[DgSpace::dof(cell, 1)] += r1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::operators::{LinearOperator, MassOperator};

    #[test]
    fn linear_force_matches_mass_matrix() {
        let space = Arc::new(DgSpace::new(Mesh::uniform(-1.0, 1.0, 3, false).unwrap()));
        let body_force = BodyForceOperator::new(space.clone(), Arc::new(|x, t| t * (2.0 * x + 1.0)));
        let mass = MassOperator::new(space.clone());

        let mut rhs = space.zeros();
        body_force.evaluate_add(&mut rhs, 2.0);
        let mut expected = space.zeros();
        mass.apply(&mut expected, &space.interpolate(|x| 2.0 * (2.0 * x + 1.0)));
        assert!((rhs - expected).amax() < 1e-13);
    }
}
