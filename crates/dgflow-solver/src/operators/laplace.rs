//! Symmetric interior penalty discretization of `-div(k grad u)`.
//!
//! The penalty on a face is `sigma = IP * (p + 1)^2 / h`, taking the larger
//! value of the two adjacent cells on interior faces. Boundary faces are
//! either Dirichlet (Nitsche) or Neumann; a Neumann function, when given,
//! prescribes the flux `k du/dn`.

use std::sync::Arc;

use nalgebra::DVector;

use super::{AffineOperator, LinearOperator, for_each_cell};
use crate::functions::FieldFunction;
use crate::mesh::Face;
use crate::space::DgSpace;

pub struct LaplaceOperator {
    space: Arc<DgSpace>,
    coefficient: f64,
    ip_factor: f64,
    dirichlet: Option<FieldFunction>,
    neumann: Option<FieldFunction>,
}

impl LaplaceOperator {
    /// Homogeneous Neumann on every boundary face until configured otherwise.
    pub fn new(space: Arc<DgSpace>, coefficient: f64, ip_factor: f64) -> Self {
        Self {
            space,
            coefficient,
            ip_factor,
            dirichlet: None,
            neumann: None,
        }
    }

    pub fn with_dirichlet(mut self, data: FieldFunction) -> Self {
        self.dirichlet = Some(data);
        self.neumann = None;
        self
    }

    pub fn with_neumann(mut self, flux: FieldFunction) -> Self {
        self.neumann = Some(flux);
        self.dirichlet = None;
        self
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    fn penalty(&self, cell: usize) -> f64 {
        let p = self.space.degree() as f64;
        self.ip_factor * (p + 1.0) * (p + 1.0) / self.space.mesh().cell_size(cell)
    }

    fn face_penalty(&self, face: &Face) -> f64 {
        match face.neighbor {
            Some((nb, _)) => self.penalty(face.owner).max(self.penalty(nb)),
            None => self.penalty(face.owner),
        }
    }

    fn slope(&self, src: &DVector<f64>, cell: usize) -> f64 {
        (src[DgSpace::dof(cell, 1)] - src[DgSpace::dof(cell, 0)])
            / self.space.mesh().cell_size(cell)
    }

    /// Adds `coef * dv/dx` to both dofs of `cell`.
    fn add_gradient_test(&self, dst: &mut DVector<f64>, cell: usize, coef: f64) {
        let h = self.space.mesh().cell_size(cell);
        dst[DgSpace::dof(cell, 0)] -= coef / h;
        dst[DgSpace::dof(cell, 1)] += coef / h;
    }
}

impl LinearOperator for LaplaceOperator {
    fn n_dofs(&self) -> usize {
        self.space.n_dofs()
    }

    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        let k = self.coefficient;
        if k == 0.0 {
            return;
        }
        let mesh = self.space.mesh();
        for_each_cell(dst, src, |cell, d, s| {
            let w = k / mesh.cell_size(cell);
            let diff = s[0] - s[1];
            d[0] += w * diff;
            d[1] -= w * diff;
        });

        for face in mesh.faces() {
            let sigma = self.face_penalty(face);
            let n = face.normal;
            let o = DgSpace::dof(face.owner, face.owner_node);
            let u_m = src[o];
            let du_m = self.slope(src, face.owner);
            match face.neighbor {
                Some((nb, nb_node)) => {
                    let p = DgSpace::dof(nb, nb_node);
                    let u_p = src[p];
                    let du_p = self.slope(src, nb);
                    let jump = u_m - u_p;
                    let avg_dn = 0.5 * (du_m + du_p) * n;
                    let value_flux = -k * avg_dn + sigma * k * jump;
                    let gradient_flux = -0.5 * k * jump * n;
                    dst[o] += value_flux;
                    dst[p] -= value_flux;
                    self.add_gradient_test(dst, face.owner, gradient_flux);
                    self.add_gradient_test(dst, nb, gradient_flux);
                }
                None if self.dirichlet.is_some() => {
                    dst[o] += -k * du_m * n + sigma * k * u_m;
                    self.add_gradient_test(dst, face.owner, -k * u_m * n);
                }
                None => {}
            }
        }
    }
}

impl AffineOperator for LaplaceOperator {
    fn rhs_add(&self, dst: &mut DVector<f64>, time: f64) {
        let k = self.coefficient;
        for face in self.space.mesh().boundary_faces() {
            let o = DgSpace::dof(face.owner, face.owner_node);
            if let Some(g) = &self.dirichlet {
                if k == 0.0 {
                    continue;
                }
                let value = g(face.x, time);
                dst[o] += self.face_penalty(face) * k * value;
                self.add_gradient_test(dst, face.owner, -k * value * face.normal);
            } else if let Some(h) = &self.neumann {
                dst[o] += h(face.x, time);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions;
    use crate::mesh::Mesh;

    fn space(n: usize, periodic: bool) -> Arc<DgSpace> {
        Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, n, periodic).unwrap()))
    }

    #[test]
    fn constants_are_in_the_kernel_without_dirichlet_data() {
        for periodic in [true, false] {
            let space = space(6, periodic);
            let laplace = LaplaceOperator::new(space.clone(), 2.0, 1.0);
            let mut dst = space.zeros();
            laplace.apply(&mut dst, &space.constant(3.0));
            assert!(dst.amax() < 1e-12);
        }
    }

    #[test]
    fn operator_is_symmetric() {
        let space = space(4, false);
        let laplace = LaplaceOperator::new(space.clone(), 0.3, 1.0).with_dirichlet(functions::zero());
        let u = space.interpolate(|x| (3.0 * x).sin() + 0.2);
        let v = space.interpolate(|x| x * x - 0.7);
        let (mut au, mut av) = (space.zeros(), space.zeros());
        laplace.apply(&mut au, &u);
        laplace.apply(&mut av, &v);
        assert!((au.dot(&v) - av.dot(&u)).abs() < 1e-12);
        assert!(au.dot(&u) > 0.0);
    }

    #[test]
    fn linear_dirichlet_solution_is_consistent() {
        // u = 1 + 2x solves -u'' = 0 with its own boundary values
        let space = space(5, false);
        let laplace =
            LaplaceOperator::new(space.clone(), 1.5, 1.0).with_dirichlet(Arc::new(|x, _| 1.0 + 2.0 * x));
        let u = space.interpolate(|x| 1.0 + 2.0 * x);
        let mut residual = space.zeros();
        laplace.evaluate(&mut residual, &u, 0.0);
        assert!(residual.amax() < 1e-12);
    }

    #[test]
    fn linear_neumann_solution_is_consistent() {
        // u = 3x, flux k du/dn = 3k n on both ends
        let k = 0.5;
        let space = space(3, false);
        let laplace = LaplaceOperator::new(space.clone(), k, 1.0)
            .with_neumann(Arc::new(move |x, _| if x < 0.5 { -3.0 * k } else { 3.0 * k }));
        let u = space.interpolate(|x| 3.0 * x);
        let mut residual = space.zeros();
        laplace.evaluate(&mut residual, &u, 0.0);
        assert!(residual.amax() < 1e-12);
    }
}
