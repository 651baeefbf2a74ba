//! Discontinuous linear Lagrange space on an interval mesh.
//!
//! Each cell carries two nodal degrees of freedom, one at each end, stored
//! contiguously: dof `2 * cell` sits at the left vertex and `2 * cell + 1` at
//! the right vertex. Traces on a face are therefore plain nodal values.

use nalgebra::DVector;

use crate::mesh::Mesh;

pub const DOFS_PER_CELL: usize = 2;

/// Gauss-Legendre points on `[0, 1]`.
const GAUSS_POINTS: [f64; 4] = [
    0.069_431_844_202_973_71,
    0.330_009_478_207_571_9,
    0.669_990_521_792_428_1,
    0.930_568_155_797_026_3,
];
const GAUSS_WEIGHTS: [f64; 4] = [
    0.173_927_422_568_726_93,
    0.326_072_577_431_273_07,
    0.326_072_577_431_273_07,
    0.173_927_422_568_726_93,
];

#[derive(Debug, Clone, PartialEq)]
pub struct DgSpace {
    mesh: Mesh,
    degree: usize,
}

impl DgSpace {
    pub fn new(mesh: Mesh) -> Self {
        Self { mesh, degree: 1 }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn n_dofs(&self) -> usize {
        DOFS_PER_CELL * self.mesh.n_cells()
    }

    pub fn dof(cell: usize, node: usize) -> usize {
        DOFS_PER_CELL * cell + node
    }

    pub fn zeros(&self) -> DVector<f64> {
        DVector::zeros(self.n_dofs())
    }

    /// Vector representing a constant function.
    pub fn constant(&self, value: f64) -> DVector<f64> {
        DVector::from_element(self.n_dofs(), value)
    }

    /// Nodal interpolation of `f`.
    pub fn interpolate(&self, f: impl Fn(f64) -> f64) -> DVector<f64> {
        let mut u = self.zeros();
        for cell in 0..self.mesh.n_cells() {
            let (xl, xr) = self.mesh.cell_bounds(cell);
            u[Self::dof(cell, 0)] = f(xl);
            u[Self::dof(cell, 1)] = f(xr);
        }
        u
    }

    pub fn value_at(&self, u: &DVector<f64>, cell: usize, xi: f64) -> f64 {
        (1.0 - xi) * u[Self::dof(cell, 0)] + xi * u[Self::dof(cell, 1)]
    }

    pub fn cell_mean(&self, u: &DVector<f64>, cell: usize) -> f64 {
        0.5 * (u[Self::dof(cell, 0)] + u[Self::dof(cell, 1)])
    }

    pub fn integrate(&self, u: &DVector<f64>) -> f64 {
        (0..self.mesh.n_cells())
            .map(|c| self.mesh.cell_volume(c) * self.cell_mean(u, c))
            .sum()
    }

    /// Mean value over the domain.
    pub fn mean_value(&self, u: &DVector<f64>) -> f64 {
        self.integrate(u) / self.mesh.length()
    }

    /// Adds `shift` to the represented function.
    pub fn shift(&self, u: &mut DVector<f64>, shift: f64) {
        u.add_scalar_mut(shift);
    }

    pub fn l2_norm(&self, u: &DVector<f64>) -> f64 {
        (0..self.mesh.n_cells())
            .map(|c| {
                let a = u[Self::dof(c, 0)];
                let b = u[Self::dof(c, 1)];
                self.mesh.cell_size(c) / 3.0 * (a * a + a * b + b * b)
            })
            .sum::<f64>()
            .sqrt()
    }

    /// L2 distance between `u` and `exact` by four-point Gauss quadrature.
    pub fn l2_error(&self, u: &DVector<f64>, exact: impl Fn(f64) -> f64) -> f64 {
        self.integrate_with(|cell, x, xi| {
            let e = self.value_at(u, cell, xi) - exact(x);
            e * e
        })
        .sqrt()
    }

    /// Integral of the mean-free part of `u - exact`, useful for pressures.
    pub fn l2_error_mean_free(&self, u: &DVector<f64>, exact: impl Fn(f64) -> f64) -> f64 {
        let shift = self.integrate_with(|cell, x, xi| self.value_at(u, cell, xi) - exact(x))
            / self.mesh.length();
        self.integrate_with(|cell, x, xi| {
            let e = self.value_at(u, cell, xi) - exact(x) - shift;
            e * e
        })
        .sqrt()
    }

    /// Quadrature of `f(cell, x, xi)` over the whole mesh.
    pub fn integrate_with(&self, f: impl Fn(usize, f64, f64) -> f64) -> f64 {
        let mut sum = 0.0;
        for cell in 0..self.mesh.n_cells() {
            let (xl, _) = self.mesh.cell_bounds(cell);
            let h = self.mesh.cell_size(cell);
            for (xi, w) in GAUSS_POINTS.iter().zip(GAUSS_WEIGHTS) {
                sum += w * h * f(cell, xl + xi * h, *xi);
            }
        }
        sum
    }

    /// Quadrature points and weights on `[0, 1]`.
    pub fn quadrature() -> impl Iterator<Item = (f64, f64)> {
        GAUSS_POINTS.into_iter().zip(GAUSS_WEIGHTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(n: usize) -> DgSpace {
        DgSpace::new(Mesh::uniform(0.0, 2.0, n, false).unwrap())
    }

    #[test]
    fn interpolation_of_linear_function_is_exact() {
        let space = space(5);
        let u = space.interpolate(|x| 3.0 * x - 1.0);
        assert!(space.l2_error(&u, |x| 3.0 * x - 1.0) < 1e-13);
        assert!((space.mean_value(&u) - 2.0).abs() < 1e-13);
    }

    #[test]
    fn l2_norm_matches_quadrature() {
        let space = space(3);
        let u = space.interpolate(|x| x * x);
        let by_quadrature = space.l2_error(&u, |_| 0.0);
        assert!((space.l2_norm(&u) - by_quadrature).abs() < 1e-12);
    }

    #[test]
    fn mean_free_error_ignores_constant_offset() {
        let space = space(4);
        let u = space.interpolate(|x| x + 10.0);
        assert!(space.l2_error_mean_free(&u, |x| x) < 1e-12);
        assert!(space.l2_error(&u, |x| x) > 1.0);
    }
}
