//! Krylov subspace solvers.

use dgflow_model::SolverSettings;
use nalgebra::{DMatrix, DVector};

use super::{LinearSolver, Preconditioner, SolveInfo};
use crate::error::{Result, SolverError, check_dimension};
use crate::operators::LinearOperator;

/// Preconditioned conjugate gradient for symmetric positive (semi)definite
/// operators.
#[derive(Debug, Clone, Copy)]
pub struct ConjugateGradient {
    settings: SolverSettings,
}

impl ConjugateGradient {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }
}

impl LinearSolver for ConjugateGradient {
    fn solve(
        &self,
        operator: &dyn LinearOperator,
        preconditioner: &dyn Preconditioner,
        x: &mut DVector<f64>,
        b: &DVector<f64>,
    ) -> Result<SolveInfo> {
        let n = operator.n_dofs();
        check_dimension("conjugate gradient rhs", n, b.len())?;
        check_dimension("conjugate gradient solution", n, x.len())?;

        let mut r = DVector::zeros(n);
        operator.apply(&mut r, x);
        r = b - r;
        let r0 = r.norm();
        let tolerance = self.settings.abs_tol.max(self.settings.rel_tol * r0);
        if r0 <= tolerance {
            return Ok(SolveInfo {
                iterations: 0,
                residual_norm: Some(r0),
                solver_name: "CG",
            });
        }

        let mut z = DVector::zeros(n);
        preconditioner.vmult(&mut z, &r);
        let mut p = z.clone();
        let mut rz = r.dot(&z);
        let mut ap = DVector::zeros(n);
        let mut residual = r0;

        for iteration in 1..=self.settings.max_iter {
            operator.apply(&mut ap, &p);
            let pap = p.dot(&ap);
            if !(pap > 0.0) {
                return Err(SolverError::NotConverged {
                    solver: "CG",
                    iterations: iteration,
                    residual,
                });
            }
            let alpha = rz / pap;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);
            residual = r.norm();
            if residual <= tolerance {
                return Ok(SolveInfo {
                    iterations: iteration,
                    residual_norm: Some(residual),
                    solver_name: "CG",
                });
            }
            preconditioner.vmult(&mut z, &r);
            let rz_new = r.dot(&z);
            let beta = rz_new / rz;
            rz = rz_new;
            p.axpy(1.0, &z, beta);
        }

        Err(SolverError::NotConverged {
            solver: "CG",
            iterations: self.settings.max_iter,
            residual,
        })
    }
}

/// Restarted GMRES with right preconditioning and Givens rotations.
#[derive(Debug, Clone, Copy)]
pub struct Gmres {
    settings: SolverSettings,
}

impl Gmres {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }
}

impl LinearSolver for Gmres {
    fn solve(
        &self,
        operator: &dyn LinearOperator,
        preconditioner: &dyn Preconditioner,
        x: &mut DVector<f64>,
        b: &DVector<f64>,
    ) -> Result<SolveInfo> {
        let n = operator.n_dofs();
        check_dimension("GMRES rhs", n, b.len())?;
        check_dimension("GMRES solution", n, x.len())?;

        let restart = self.settings.max_krylov_size.min(n).max(1);
        let mut r = DVector::zeros(n);
        operator.apply(&mut r, x);
        r = b - r;
        let r0 = r.norm();
        let tolerance = self.settings.abs_tol.max(self.settings.rel_tol * r0);
        let mut residual = r0;
        let mut iterations = 0;

        let mut w = DVector::zeros(n);
        let mut z = DVector::zeros(n);
        while residual > tolerance {
            if iterations >= self.settings.max_iter {
                return Err(SolverError::NotConverged {
                    solver: "GMRES",
                    iterations,
                    residual,
                });
            }

            let mut basis: Vec<DVector<f64>> = Vec::with_capacity(restart + 1);
            basis.push(&r / residual);
            let mut h = DMatrix::<f64>::zeros(restart + 1, restart);
            let mut cs = vec![0.0; restart];
            let mut sn = vec![0.0; restart];
            let mut g = DVector::<f64>::zeros(restart + 1);
            g[0] = residual;

            let mut k = 0;
            while k < restart && iterations < self.settings.max_iter {
                preconditioner.vmult(&mut z, &basis[k]);
                operator.apply(&mut w, &z);
                for (i, v) in basis.iter().enumerate() {
                    let hik = w.dot(v);
                    h[(i, k)] = hik;
                    w.axpy(-hik, v, 1.0);
                }
                let h_next = w.norm();
                h[(k + 1, k)] = h_next;

                for i in 0..k {
                    let upper = cs[i] * h[(i, k)] + sn[i] * h[(i + 1, k)];
                    h[(i + 1, k)] = -sn[i] * h[(i, k)] + cs[i] * h[(i + 1, k)];
                    h[(i, k)] = upper;
                }
                let denom = h[(k, k)].hypot(h[(k + 1, k)]);
                (cs[k], sn[k]) = if denom == 0.0 {
                    (1.0, 0.0)
                } else {
                    (h[(k, k)] / denom, h[(k + 1, k)] / denom)
                };
                h[(k, k)] = cs[k] * h[(k, k)] + sn[k] * h[(k + 1, k)];
                h[(k + 1, k)] = 0.0;
                g[k + 1] = -sn[k] * g[k];
                g[k] *= cs[k];

                iterations += 1;
                k += 1;
                residual = g[k].abs();
                if residual <= tolerance || h_next == 0.0 {
                    break;
                }
                basis.push(&w / h_next);
            }

            // back substitution on the rotated Hessenberg matrix
            let mut y = DVector::<f64>::zeros(k);
            for i in (0..k).rev() {
                let mut sum = g[i];
                for j in i + 1..k {
                    sum -= h[(i, j)] * y[j];
                }
                if h[(i, i)] == 0.0 {
                    return Err(SolverError::Singular("GMRES Hessenberg matrix"));
                }
                y[i] = sum / h[(i, i)];
            }
            let mut update = DVector::zeros(n);
            for (i, v) in basis.iter().take(k).enumerate() {
                update.axpy(y[i], v, 1.0);
            }
            preconditioner.vmult(&mut z, &update);
            *x += &z;

            operator.apply(&mut r, x);
            r = b - &r;
            residual = r.norm();
        }

        Ok(SolveInfo {
            iterations,
            residual_norm: Some(residual),
            solver_name: "GMRES",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::{IdentityPreconditioner, JacobiPreconditioner};

    /// Dense matrix wrapped as an operator.
    struct Dense(DMatrix<f64>);

    impl LinearOperator for Dense {
        fn n_dofs(&self) -> usize {
            self.0.nrows()
        }

        fn apply_add(&self, dst: &mut DVector<f64>, src: &DVector<f64>) {
            *dst += &self.0 * src;
        }
    }

    fn spd(n: usize) -> Dense {
        let mut a = DMatrix::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = 2.0 + i as f64 * 0.1;
            if i + 1 < n {
                a[(i, i + 1)] = -1.0;
                a[(i + 1, i)] = -1.0;
            }
        }
        Dense(a)
    }

    #[test]
    fn cg_solves_tridiagonal_system() {
        let a = spd(20);
        let expected = DVector::from_fn(20, |i, _| (i as f64 * 0.3).cos());
        let b = &a.0 * &expected;
        let mut x = DVector::zeros(20);
        let precond = JacobiPreconditioner::new(&a);
        let info = ConjugateGradient::new(SolverSettings::new(100, 1e-14, 1e-12))
            .solve(&a, &precond, &mut x, &b)
            .unwrap();
        assert!(info.iterations > 0);
        assert_eq!(info.solver_name, "CG");
        assert!((x - expected).amax() < 1e-9);
    }

    #[test]
    fn cg_reports_non_convergence() {
        let a = spd(30);
        let b = DVector::from_element(30, 1.0);
        let mut x = DVector::zeros(30);
        let err = ConjugateGradient::new(SolverSettings::new(2, 1e-14, 1e-14))
            .solve(&a, &IdentityPreconditioner, &mut x, &b)
            .unwrap_err();
        assert!(matches!(
            err,
            SolverError::NotConverged {
                solver: "CG",
                iterations: 2,
                ..
            }
        ));
    }

    #[test]
    fn gmres_solves_nonsymmetric_system_with_restarts() {
        let n = 25;
        let mut a = DMatrix::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = 4.0;
            if i + 1 < n {
                a[(i, i + 1)] = -1.5;
                a[(i + 1, i)] = -0.5;
            }
        }
        let a = Dense(a);
        let expected = DVector::from_fn(n, |i, _| 1.0 + i as f64);
        let b = &a.0 * &expected;
        let mut x = DVector::zeros(n);
        let settings = SolverSettings {
            max_krylov_size: 5,
            ..SolverSettings::new(500, 1e-13, 1e-13)
        };
        let info = Gmres::new(settings)
            .solve(&a, &IdentityPreconditioner, &mut x, &b)
            .unwrap();
        assert!(info.iterations > 5);
        assert!((x - expected).amax() < 1e-9);
    }

    #[test]
    fn zero_rhs_returns_immediately() {
        let a = spd(4);
        let mut x = DVector::zeros(4);
        let info = Gmres::new(SolverSettings::default())
            .solve(&a, &IdentityPreconditioner, &mut x, &DVector::zeros(4))
            .unwrap();
        assert_eq!(info.iterations, 0);
    }
}
