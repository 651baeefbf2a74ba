//! Divergence and continuity penalty terms of the projection step.
//!
//! The projected velocity solves `(M + dt (A_div + A_conti)) u = rhs`, which
//! weakly enforces a small divergence inside cells and small normal jumps
//! across interior faces. The penalty coefficients live per cell and are
//! recomputed only through [`ProjectionOperator::update`]; applying the
//! operator never touches them.

use std::sync::Arc;

use dgflow_model::{
    ContinuityPenaltyComponents, PreconditionerKind, ProjectionParameters, SolverProjection,
    SolverSettings, TypePenaltyParameter,
};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::Result;
use crate::operators::{LinearOperator, MassOperator, for_each_cell};
use crate::solvers::{
    ConjugateGradient, LinearSolver, Preconditioner, SolveInfo, build_preconditioner,
    solve_block_diagonal,
};
use crate::space::{DOFS_PER_CELL, DgSpace};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionOperatorData {
    pub type_penalty_parameter: TypePenaltyParameter,
    pub viscosity: f64,
    pub use_divergence_penalty: bool,
    pub use_continuity_penalty: bool,
    pub divergence_penalty_factor: f64,
    pub continuity_penalty_factor: f64,
    pub continuity_penalty_components: ContinuityPenaltyComponents,
}

impl ProjectionOperatorData {
    pub fn new(params: &ProjectionParameters, viscosity: f64) -> Self {
        Self {
            type_penalty_parameter: params.type_penalty_parameter,
            viscosity,
            use_divergence_penalty: params.use_divergence_penalty,
            use_continuity_penalty: params.use_continuity_penalty,
            divergence_penalty_factor: params.divergence_penalty_factor,
            continuity_penalty_factor: params.continuity_penalty_factor,
            continuity_penalty_components: params.continuity_penalty_components,
        }
    }
}

pub struct ProjectionOperator {
    space: Arc<DgSpace>,
    mass: MassOperator,
    data: ProjectionOperatorData,
    tau_div: Vec<f64>,
    tau_conti: Vec<f64>,
    time_step_size: f64,
}

impl ProjectionOperator {
    pub fn new(space: Arc<DgSpace>, data: ProjectionOperatorData) -> Self {
        let n_cells = space.mesh().n_cells();
        Self {
            mass: MassOperator::new(space.clone()),
            space,
            data,
            tau_div: vec![0.0; n_cells],
            tau_conti: vec![0.0; n_cells],
            time_step_size: 1.0,
        }
    }

    pub fn data(&self) -> &ProjectionOperatorData {
        &self.data
    }

    pub fn set_time_step_size(&mut self, dt: f64) {
        self.time_step_size = dt;
    }

    pub fn time_step_size(&self) -> f64 {
        self.time_step_size
    }

    pub fn divergence_penalty_parameter(&self, cell: usize) -> f64 {
        self.tau_div[cell]
    }

    pub fn continuity_penalty_parameter(&self, cell: usize) -> f64 {
        self.tau_conti[cell]
    }

    /// Recomputes both penalty coefficients and stores the step size.
    pub fn update(&mut self, velocity: &DVector<f64>, dt: f64) {
        self.calculate_penalty_parameters(velocity);
        self.set_time_step_size(dt);
    }

    pub fn calculate_penalty_parameters(&mut self, velocity: &DVector<f64>) {
        let mesh = self.space.mesh();
        let d = &self.data;
        for cell in 0..mesh.n_cells() {
            let norm_u = self.space.cell_mean(velocity, cell).abs();
            // h = volume^(1/dim) with dim = 1
            let h = mesh.cell_volume(cell);
            let (tau_div, tau_conti) = match d.type_penalty_parameter {
                TypePenaltyParameter::ConstantCoefficient => (h, 1.0),
                TypePenaltyParameter::ConvectiveTerm => (norm_u * h, norm_u),
                TypePenaltyParameter::ViscousAndConvectiveTerms => {
                    (d.viscosity + norm_u * h, d.viscosity / h + norm_u)
                }
            };
            self.tau_div[cell] = d.divergence_penalty_factor * tau_div;
            self.tau_conti[cell] = d.continuity_penalty_factor * tau_conti;
        }
    }

    fn face_tau(&self, owner: usize, neighbor: usize) -> f64 {
        0.5 * (self.tau_conti[owner] + self.tau_conti[neighbor])
    }

    fn penalised_jump(&self, jump: f64, normal: f64) -> f64 {
        match self.data.continuity_penalty_components {
            ContinuityPenaltyComponents::All => jump,
            ContinuityPenaltyComponents::Normal => jump * normal * normal,
        }
    }

    /// `dst += (div v, tau_div div u)` over all cells.
    pub fn apply_divergence_penalty(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        let mesh = self.space.mesh();
        let tau = &self.tau_div;
        for_each_cell(dst, src, |cell, d, s| {
            let w = tau[cell] / mesh.cell_size(cell);
            let diff = s[1] - s[0];
            d[0] -= w * diff;
            d[1] += w * diff;
        });
    }

    /// `dst += (v, tau_conti [u])` over interior faces.
    pub fn apply_continuity_penalty(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        for face in self.space.mesh().faces() {
            let Some((nb, nb_node)) = face.neighbor else {
                continue;
            };
            let o = DgSpace::dof(face.owner, face.owner_node);
            let p = DgSpace::dof(nb, nb_node);
            let flux = self.face_tau(face.owner, nb) * self.penalised_jump(src[o] - src[p], face.normal);
            dst[o] += flux;
            dst[p] -= flux;
        }
    }

    /// Sum of the enabled penalty terms, without mass and step size.
    pub fn apply_combined(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        if self.data.use_divergence_penalty {
            self.apply_divergence_penalty(dst, src);
        }
        if self.data.use_continuity_penalty {
            self.apply_continuity_penalty(dst, src);
        }
    }

    fn add_penalty_diagonal(&self, diagonal: &mut DVector<f64>) {
        let mesh = self.space.mesh();
        if self.data.use_divergence_penalty {
            for cell in 0..mesh.n_cells() {
                let w = self.tau_div[cell] / mesh.cell_size(cell);
                diagonal[DgSpace::dof(cell, 0)] += w;
                diagonal[DgSpace::dof(cell, 1)] += w;
            }
        }
        if self.data.use_continuity_penalty {
            for face in mesh.faces() {
                let Some((nb, nb_node)) = face.neighbor else {
                    continue;
                };
                let tau = self.face_tau(face.owner, nb) * self.penalised_jump(1.0, face.normal);
                // opposing trace is zero when probing one cell
                diagonal[DgSpace::dof(face.owner, face.owner_node)] += tau;
                diagonal[DgSpace::dof(nb, nb_node)] += tau;
            }
        }
    }

    /// `u . (A_div u)`
    pub fn divergence_penalty_dissipation(&self, velocity: &DVector<f64>) -> f64 {
        let mut dst = DVector::zeros(velocity.len());
        self.apply_divergence_penalty(&mut dst, velocity);
        dst.dot(velocity)
    }

    /// `u . (A_conti u)`
    pub fn continuity_penalty_dissipation(&self, velocity: &DVector<f64>) -> f64 {
        let mut dst = DVector::zeros(velocity.len());
        self.apply_continuity_penalty(&mut dst, velocity);
        dst.dot(velocity)
    }
}

impl LinearOperator for ProjectionOperator {
    fn n_dofs(&self) -> usize {
        self.space.n_dofs()
    }

    fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
        self.mass.apply_add(dst, src);
        let mut penalty = DVector::zeros(src.len());
        self.apply_combined(&mut penalty, src);
        dst.axpy(self.time_step_size, &penalty, 1.0);
    }

    fn add_diagonal(&self, diagonal: &mut DVector<f64>) {
        self.mass.add_diagonal(diagonal);
        let mut penalty = DVector::zeros(diagonal.len());
        self.add_penalty_diagonal(&mut penalty);
        diagonal.axpy(self.time_step_size, &penalty, 1.0);
    }

    fn calculate_block_diagonal(&self) -> Vec<DMatrix<f64>> {
        let mesh = self.space.mesh();
        let dt = self.time_step_size;
        let mut blocks = self.mass.calculate_block_diagonal();
        if self.data.use_divergence_penalty {
            for (cell, block) in blocks.iter_mut().enumerate() {
                let w = dt * self.tau_div[cell] / mesh.cell_size(cell);
                *block += DMatrix::from_row_slice(DOFS_PER_CELL, DOFS_PER_CELL, &[w, -w, -w, w]);
            }
        }
        if self.data.use_continuity_penalty {
            for face in mesh.faces() {
                let Some((nb, nb_node)) = face.neighbor else {
                    continue;
                };
                let tau = dt * self.face_tau(face.owner, nb) * self.penalised_jump(1.0, face.normal);
                blocks[face.owner][(face.owner_node, face.owner_node)] += tau;
                blocks[nb][(nb_node, nb_node)] += tau;
            }
        }
        blocks
    }
}

/// Solver of the penalised projection system.
///
/// Elementwise LU is exact when only the divergence penalty is active since
/// the system is then block diagonal; otherwise preconditioned CG is used.
pub struct ProjectionSolver<'a> {
    solver: SolverProjection,
    preconditioner_kind: PreconditionerKind,
    update_preconditioner: bool,
    settings: SolverSettings,
    inverse_mass: &'a dyn LinearOperator,
    preconditioner: Option<Box<dyn Preconditioner + 'a>>,
}

impl<'a> ProjectionSolver<'a> {
    pub fn new(params: &ProjectionParameters, inverse_mass: &'a dyn LinearOperator) -> Self {
        Self {
            solver: params.solver_projection,
            preconditioner_kind: params.preconditioner_projection,
            update_preconditioner: params.update_preconditioner_projection,
            settings: params.solver_data,
            inverse_mass,
            preconditioner: None,
        }
    }

    pub fn solve(
        &mut self,
        operator: &ProjectionOperator,
        x: &mut DVector<f64>,
        rhs: &DVector<f64>,
    ) -> Result<SolveInfo> {
        match self.solver {
            SolverProjection::Lu => solve_block_diagonal(&operator.calculate_block_diagonal(), x, rhs),
            SolverProjection::Pcg => {
                let preconditioner = match self.preconditioner.take() {
                    Some(p) if !self.update_preconditioner => p,
                    _ => build_preconditioner(self.preconditioner_kind, operator, self.inverse_mass)?,
                };
                let result =
                    ConjugateGradient::new(self.settings).solve(operator, preconditioner.as_ref(), x, rhs);
                self.preconditioner = Some(preconditioner);
                let info = result?;
                debug!(iterations = info.iterations, "projection solve");
                Ok(info)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::operators::InverseMassOperator;

    fn data(kind: TypePenaltyParameter) -> ProjectionOperatorData {
        ProjectionOperatorData {
            type_penalty_parameter: kind,
            viscosity: 0.1,
            use_divergence_penalty: true,
            use_continuity_penalty: true,
            divergence_penalty_factor: 2.0,
            continuity_penalty_factor: 3.0,
            continuity_penalty_components: ContinuityPenaltyComponents::Normal,
        }
    }

    fn space(n: usize, periodic: bool) -> Arc<DgSpace> {
        Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, n, periodic).unwrap()))
    }

    #[test]
    fn penalty_parameters_follow_type() {
        let space = space(4, false);
        let velocity = space.constant(-2.0);
        let h = 0.25;

        let mut op = ProjectionOperator::new(space.clone(), data(TypePenaltyParameter::ConstantCoefficient));
        op.calculate_penalty_parameters(&velocity);
        assert!((op.divergence_penalty_parameter(0) - 2.0 * h).abs() < 1e-14);
        assert!((op.continuity_penalty_parameter(0) - 3.0).abs() < 1e-14);

        let mut op = ProjectionOperator::new(space.clone(), data(TypePenaltyParameter::ConvectiveTerm));
        op.calculate_penalty_parameters(&velocity);
        assert!((op.divergence_penalty_parameter(1) - 2.0 * 2.0 * h).abs() < 1e-14);
        assert!((op.continuity_penalty_parameter(1) - 3.0 * 2.0).abs() < 1e-14);

        let mut op =
            ProjectionOperator::new(space, data(TypePenaltyParameter::ViscousAndConvectiveTerms));
        op.calculate_penalty_parameters(&velocity);
        assert!((op.divergence_penalty_parameter(2) - 2.0 * (0.1 + 2.0 * h)).abs() < 1e-14);
        assert!((op.continuity_penalty_parameter(2) - 3.0 * (0.1 / h + 2.0)).abs() < 1e-14);
    }

    #[test]
    fn apply_does_not_touch_coefficients() {
        let space = space(3, true);
        let mut op = ProjectionOperator::new(space.clone(), data(TypePenaltyParameter::ConvectiveTerm));
        op.update(&space.constant(1.0), 0.1);
        let before = (op.tau_div.clone(), op.tau_conti.clone());
        let mut dst = space.zeros();
        op.apply(&mut dst, &space.interpolate(|x| 5.0 * x));
        assert_eq!((op.tau_div.clone(), op.tau_conti.clone()), before);
    }

    #[test]
    fn explicit_diagonal_and_blocks_match_probing() {
        struct Probe<'a>(&'a ProjectionOperator);
        impl LinearOperator for Probe<'_> {
            fn n_dofs(&self) -> usize {
                self.0.n_dofs()
            }
            fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
                self.0.apply_add(dst, src);
            }
        }

        let space = Arc::new(DgSpace::new(
            Mesh::from_vertices(vec![0.0, 0.2, 0.5, 0.6, 1.0], false).unwrap(),
        ));
        let mut op = ProjectionOperator::new(space.clone(), data(TypePenaltyParameter::ViscousAndConvectiveTerms));
        op.update(&space.interpolate(|x| 1.0 + x * x), 0.05);

        let (mut fast, mut probed) = (space.zeros(), space.zeros());
        op.calculate_diagonal(&mut fast);
        Probe(&op).calculate_diagonal(&mut probed);
        assert!((fast - probed).amax() < 1e-13);

        for (a, b) in op
            .calculate_block_diagonal()
            .iter()
            .zip(Probe(&op).calculate_block_diagonal())
        {
            assert!((a - b).amax() < 1e-13);
        }
    }

    #[test]
    fn dissipation_is_non_negative() {
        let space = space(5, true);
        let mut op = ProjectionOperator::new(space.clone(), data(TypePenaltyParameter::ConstantCoefficient));
        op.update(&space.zeros(), 1.0);
        let u = space.interpolate(|x| (7.0 * x).sin());
        assert!(op.divergence_penalty_dissipation(&u) > 0.0);
        assert!(op.continuity_penalty_dissipation(&u) >= 0.0);
    }

    #[test]
    fn elementwise_lu_and_cg_agree_for_divergence_penalty() {
        let space = space(6, false);
        let inverse_mass = InverseMassOperator::new(space.clone());
        let mut d = data(TypePenaltyParameter::ConstantCoefficient);
        d.use_continuity_penalty = false;
        let mut op = ProjectionOperator::new(space.clone(), d);
        op.update(&space.zeros(), 0.3);

        let rhs = space.interpolate(|x| x.cos());
        let mut params = ProjectionParameters {
            use_continuity_penalty: false,
            solver_projection: SolverProjection::Lu,
            ..Default::default()
        };
        let mut x_lu = space.zeros();
        ProjectionSolver::new(&params, &inverse_mass)
            .solve(&op, &mut x_lu, &rhs)
            .unwrap();

        params.solver_projection = SolverProjection::Pcg;
        let mut x_cg = space.zeros();
        ProjectionSolver::new(&params, &inverse_mass)
            .solve(&op, &mut x_cg, &rhs)
            .unwrap();
        assert!((x_lu - x_cg).amax() < 1e-8);
    }
}
