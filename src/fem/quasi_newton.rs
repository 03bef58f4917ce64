use super::LinearSystem;
use crate::base::QnMethod;
use crate::StrError;
use russell_lab::{vec_copy, vec_inner, Vector};
use serde::{Deserialize, Serialize};

/// Holds the low-rank updates of the inverse stiffness between reformations
///
/// With R = F_ext − F_int, K ≈ −∂R/∂U, a step D = s·u, and G = R0 − R1 ≈ K·D:
///
/// * BFGS (Matthies-Strang): `K⁻¹ ← (I + w vᵀ) K⁻¹ (I + v wᵀ)` with
///   `v = −c·s·R0 − G`, `w = D / (D·G)`, and `c = √(D·G / D·(s R0))`
/// * Broyden: `H ← H + (D − H G) Dᵀ H / (Dᵀ H G)`, stored as the pairs (D, D − H G)
///
/// Rows flagged in `mask` (prescribed equations) never enter the update vectors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuasiNewton {
    /// Update strategy
    pub method: QnMethod,

    /// Maximum number of updates between reformations
    pub max_updates: usize,

    /// Maximum condition number estimate (BFGS)
    pub cmax: f64,

    /// Number of updates since the last reformation
    pub n_updates: usize,

    /// First update vectors (BFGS: v; Broyden: D − H G)
    aa: Vec<Vector>,

    /// Second update vectors (BFGS: w; Broyden: D)
    bb: Vec<Vector>,

    /// Broyden denominators Dᵀ H G
    rho: Vec<f64>,
}

impl QuasiNewton {
    /// Allocates a new instance
    pub fn new(method: QnMethod, max_updates: usize, cmax: f64) -> Self {
        QuasiNewton {
            method,
            max_updates,
            cmax,
            n_updates: 0,
            aa: Vec::new(),
            bb: Vec::new(),
            rho: Vec::new(),
        }
    }

    /// Discards all updates (called after a reformation)
    pub fn reset(&mut self) {
        self.n_updates = 0;
        self.aa.clear();
        self.bb.clear();
        self.rho.clear();
    }

    /// Performs an update
    ///
    /// # Input
    ///
    /// * `s` -- the line search step
    /// * `u` -- the full (unscaled) direction
    /// * `rr0` -- residual before the step
    /// * `rr1` -- residual after the step
    /// * `mask` -- rows to be ignored (prescribed equations)
    /// * `ls` -- linear system holding the last factorization
    ///
    /// Returns false if the update is rejected; then a reformation is required.
    pub fn update(
        &mut self,
        s: f64,
        u: &Vector,
        rr0: &Vector,
        rr1: &Vector,
        mask: &[bool],
        ls: &mut LinearSystem,
    ) -> Result<bool, StrError> {
        if self.method == QnMethod::FullNewton || self.n_updates >= self.max_updates {
            return Ok(false);
        }
        let neq = u.dim();
        let mut dd = Vector::new(neq);
        let mut gg = Vector::new(neq);
        for i in 0..neq {
            if !mask[i] {
                dd[i] = s * u[i];
                gg[i] = rr0[i] - rr1[i];
            }
        }
        match self.method {
            QnMethod::Bfgs => {
                let mut hh = Vector::new(neq);
                for i in 0..neq {
                    if !mask[i] {
                        hh[i] = s * rr0[i];
                    }
                }
                let dg = vec_inner(&dd, &gg);
                let dh = vec_inner(&dd, &hh);
                if dg <= 0.0 || dh <= 0.0 {
                    return Ok(false);
                }
                let c = f64::sqrt(dg / dh);
                if !c.is_finite() || c > self.cmax {
                    return Ok(false);
                }
                let mut v = Vector::new(neq);
                let mut w = Vector::new(neq);
                for i in 0..neq {
                    v[i] = -c * hh[i] - gg[i];
                    w[i] = dd[i] / dg;
                }
                self.aa.push(v);
                self.bb.push(w);
            }
            QnMethod::Broyden => {
                let mut hg = Vector::new(neq);
                self.solve(&mut hg, &gg, ls)?;
                for i in 0..neq {
                    if mask[i] {
                        hg[i] = 0.0;
                    }
                }
                let rho = vec_inner(&dd, &hg);
                let scale = f64::sqrt(vec_inner(&dd, &dd) * vec_inner(&hg, &hg));
                if !rho.is_finite() || f64::abs(rho) <= f64::EPSILON * scale {
                    return Ok(false);
                }
                let mut z = Vector::new(neq);
                for i in 0..neq {
                    z[i] = dd[i] - hg[i];
                }
                self.aa.push(z);
                self.bb.push(dd);
                self.rho.push(rho);
            }
            QnMethod::FullNewton => return Ok(false),
        }
        self.n_updates += 1;
        Ok(true)
    }

    /// Solves K·x = rhs using the factorized stiffness and the stored updates
    pub fn solve(&self, x: &mut Vector, rhs: &Vector, ls: &mut LinearSystem) -> Result<(), StrError> {
        let n = self.n_updates;
        match self.method {
            QnMethod::Bfgs if n > 0 => {
                let mut tmp = Vector::new(rhs.dim());
                vec_copy(&mut tmp, rhs)?;
                for i in (0..n).rev() {
                    let wr = vec_inner(&self.bb[i], &tmp);
                    for k in 0..tmp.dim() {
                        tmp[k] += self.aa[i][k] * wr;
                    }
                }
                ls.solve(x, &tmp)?;
                for i in 0..n {
                    let vr = vec_inner(&self.aa[i], x);
                    for k in 0..x.dim() {
                        x[k] += self.bb[i][k] * vr;
                    }
                }
            }
            QnMethod::Broyden if n > 0 => {
                ls.solve(x, rhs)?;
                for i in 0..n {
                    let dx = vec_inner(&self.bb[i], x) / self.rho[i];
                    for k in 0..x.dim() {
                        x[k] += self.aa[i][k] * dx;
                    }
                }
            }
            _ => ls.solve(x, rhs)?,
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::QuasiNewton;
    use crate::base::QnMethod;
    use crate::fem::{EqNumber, LinearSystem, LocalMatrix};
    use russell_lab::{approx_eq, Vector};
    use russell_sparse::{Genie, LinSolParams};

    // K0 = [[4, 1, 0], [1, 3, 1], [0, 1, 2]]
    fn factorized_system() -> LinearSystem<'static> {
        let mut ls = LinearSystem::new(3, 9, false, Genie::Umfpack, LinSolParams::new()).unwrap();
        let mut block = LocalMatrix::new(vec![EqNumber::Free(0), EqNumber::Free(1), EqNumber::Free(2)]);
        let kk = [[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        for i in 0..3 {
            for j in 0..3 {
                block.kk.set(i, j, kk[i][j]);
            }
        }
        ls.reset(9).unwrap();
        ls.assemble(&block, &Vector::new(3)).unwrap();
        ls.factorize().unwrap();
        ls
    }

    fn check_secant_condition(method: QnMethod) {
        let mut ls = factorized_system();
        let mut qn = QuasiNewton::new(method, 10, 1e5);
        let mask = [false; 3];

        // first direction u = K0⁻¹·R0
        let rr0 = Vector::from(&[1.0, 2.0, 3.0]);
        let mut u = Vector::new(3);
        qn.solve(&mut u, &rr0, &mut ls).unwrap();

        // residual after a step s·u of a stiffer system K1 = 2·K0
        let s = 0.8;
        let rr1 = Vector::from(&[1.0 - 2.0 * s * 1.0, 2.0 - 2.0 * s * 2.0, 3.0 - 2.0 * s * 3.0]);
        assert!(qn.update(s, &u, &rr0, &rr1, &mask, &mut ls).unwrap());
        assert_eq!(qn.n_updates, 1);

        // the updated inverse maps G = R0 − R1 onto D = s·u
        let gg = Vector::from(&[rr0[0] - rr1[0], rr0[1] - rr1[1], rr0[2] - rr1[2]]);
        let mut x = Vector::new(3);
        qn.solve(&mut x, &gg, &mut ls).unwrap();
        for i in 0..3 {
            approx_eq(x[i], s * u[i], 1e-12);
        }

        qn.reset();
        assert_eq!(qn.n_updates, 0);
        qn.solve(&mut x, &rr0, &mut ls).unwrap();
        for i in 0..3 {
            approx_eq(x[i], u[i], 1e-15);
        }
    }

    #[test]
    fn bfgs_satisfies_the_secant_condition() {
        check_secant_condition(QnMethod::Bfgs);
    }

    #[test]
    fn broyden_satisfies_the_secant_condition() {
        check_secant_condition(QnMethod::Broyden);
    }

    #[test]
    fn update_rejects_bad_steps() {
        let mut ls = factorized_system();
        let mask = [false; 3];
        let rr0 = Vector::from(&[1.0, 2.0, 3.0]);
        let mut u = Vector::new(3);

        // full Newton never updates
        let mut qn = QuasiNewton::new(QnMethod::FullNewton, 10, 1e5);
        qn.solve(&mut u, &rr0, &mut ls).unwrap();
        assert!(!qn.update(1.0, &u, &rr0, &rr0, &mask, &mut ls).unwrap());

        // BFGS rejects a step that increases the residual along D (D·G ≤ 0)
        let mut qn = QuasiNewton::new(QnMethod::Bfgs, 10, 1e5);
        let rr1 = Vector::from(&[2.0, 4.0, 6.0]);
        assert!(!qn.update(1.0, &u, &rr0, &rr1, &mask, &mut ls).unwrap());

        // BFGS rejects ill-conditioned updates
        let mut qn = QuasiNewton::new(QnMethod::Bfgs, 10, 1.0);
        let rr1 = Vector::from(&[-7.0, -14.0, -21.0]); // c = √8 > cmax
        assert!(!qn.update(1.0, &u, &rr0, &rr1, &mask, &mut ls).unwrap());

        // the buffer is limited
        let mut qn = QuasiNewton::new(QnMethod::Bfgs, 1, 1e5);
        let rr1 = Vector::from(&[0.5, 1.0, 1.5]);
        assert!(qn.update(1.0, &u, &rr0, &rr1, &mask, &mut ls).unwrap());
        assert!(!qn.update(1.0, &u, &rr0, &rr1, &mask, &mut ls).unwrap());
    }
}
