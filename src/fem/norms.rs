use super::Equations;
use crate::base::{Config, DofFamily};
use russell_lab::Vector;
use serde::{Deserialize, Serialize};

/// Holds the increment norms of one DOF family
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FamilyNorms {
    /// The DOF family
    pub family: DofFamily,

    /// Tolerance (zero disables the criterion)
    pub tol: f64,

    /// Squared norm of the last increment s·u restricted to the family
    pub norm_inc: f64,

    /// Squared norm of the accumulated increment U_i restricted to the family
    pub norm_total: f64,
}

/// Holds the (squared) norms used by the convergence criteria
///
/// Converged if all enabled criteria pass:
///
/// ```text
/// residual:  R1·R1      ≤ tol_r² · Ri·Ri
/// energy:    |s u·R1|   ≤ tol_e  · Ei
/// family f:  s² u_f·u_f ≤ tol_f² · U_i,f·U_i,f
/// ```
///
/// Prescribed rows never enter the norms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvergenceNorms {
    /// Initial (reference) residual norm Ri·Ri
    pub rr_ini: f64,

    /// Current residual norm R1·R1
    pub rr_cur: f64,

    /// Initial (reference) energy |u·R0|
    pub ee_ini: f64,

    /// Current energy |s u·R1|
    pub ee_cur: f64,

    /// Running maximum of the energy
    pub ee_max: f64,

    /// Norms of each DOF family present in the model
    pub families: Vec<FamilyNorms>,
}

impl ConvergenceNorms {
    /// Allocates a new instance
    pub fn new(equations: &Equations, config: &Config) -> Self {
        let families = equations
            .present_families()
            .into_iter()
            .map(|family| FamilyNorms {
                family,
                tol: config.tol_family(family),
                norm_inc: 0.0,
                norm_total: 0.0,
            })
            .collect();
        ConvergenceNorms {
            rr_ini: 0.0,
            rr_cur: 0.0,
            ee_ini: 0.0,
            ee_cur: 0.0,
            ee_max: 0.0,
            families,
        }
    }

    /// Records the reference residual norm
    pub fn set_reference_residual(&mut self, rr: &Vector, equations: &Equations) {
        self.rr_ini = squared_norm(rr, equations);
        self.rr_cur = self.rr_ini;
    }

    /// Records the reference energy |u·R0|
    pub fn set_reference_energy(&mut self, u: &Vector, rr0: &Vector, equations: &Equations) {
        self.ee_ini = f64::abs(inner(u, rr0, equations));
        self.ee_max = self.ee_ini;
        self.ee_cur = self.ee_ini;
    }

    /// Measures the norms after an update U_i += s·u
    pub fn measure(&mut self, s: f64, u: &Vector, rr1: &Vector, duu: &Vector, equations: &Equations) {
        self.rr_cur = squared_norm(rr1, equations);
        self.ee_cur = f64::abs(s * inner(u, rr1, equations));
        for norms in &mut self.families {
            norms.norm_inc = 0.0;
            norms.norm_total = 0.0;
        }
        for k in 0..equations.n_equation {
            if equations.prescribed[k] {
                continue;
            }
            if let Some(norms) = self.families.iter_mut().find(|n| n.family == equations.families[k]) {
                norms.norm_inc += s * s * u[k] * u[k];
                norms.norm_total += duu[k] * duu[k];
            }
        }
    }

    /// Checks all enabled criteria
    pub fn converged(&self, tol_residual: f64, tol_energy: f64) -> bool {
        if tol_residual > 0.0 && self.rr_cur > tol_residual * tol_residual * self.rr_ini {
            return false;
        }
        if tol_energy > 0.0 && self.ee_cur > tol_energy * self.ee_ini {
            return false;
        }
        self.families
            .iter()
            .all(|n| n.tol <= 0.0 || n.norm_inc <= n.tol * n.tol * n.norm_total)
    }

    /// Indicates that the energy exceeds its running maximum
    pub fn diverging(&self) -> bool {
        self.ee_cur > self.ee_max
    }

    /// Takes the current norms as the new references (after a divergence reformation)
    pub fn reset_references(&mut self) {
        self.rr_ini = self.rr_cur;
        self.ee_ini = self.ee_cur;
        self.ee_max = self.ee_cur;
    }

    /// Tracks the running maximum of the energy
    pub fn track_max_energy(&mut self) {
        self.ee_max = f64::max(self.ee_max, self.ee_cur);
    }
}

fn squared_norm(v: &Vector, equations: &Equations) -> f64 {
    inner(v, v, equations)
}

fn inner(a: &Vector, b: &Vector, equations: &Equations) -> f64 {
    let mut sum = 0.0;
    for k in 0..equations.n_equation {
        if !equations.prescribed[k] {
            sum += a[k] * b[k];
        }
    }
    sum
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::ConvergenceNorms;
    use crate::base::{Config, Dof, DofFamily, Essential};
    use crate::fem::Equations;
    use russell_lab::Vector;

    // point 0: Ux prescribed (eq 0), T free (eq 1); point 1: Ux free (eq 2), T free (eq 3)
    fn sample_equations() -> Equations {
        let mut essential = Essential::new();
        essential.prescribed(&[0], Dof::Ux, 1.0, None);
        let declared = [(0, Dof::Ux), (0, Dof::T), (1, Dof::Ux), (1, Dof::T)];
        Equations::new(2, &declared, &essential, 0).unwrap()
    }

    #[test]
    fn new_works() {
        let equations = sample_equations();
        let mut config = Config::new();
        config.set_tol_family(DofFamily::Temperature, 0.1);
        let norms = ConvergenceNorms::new(&equations, &config);
        assert_eq!(norms.families.len(), 2);
        assert_eq!(norms.families[0].family, DofFamily::Displacement);
        assert_eq!(norms.families[0].tol, 0.001);
        assert_eq!(norms.families[1].family, DofFamily::Temperature);
        assert_eq!(norms.families[1].tol, 0.1);
    }

    #[test]
    fn measure_skips_prescribed_rows() {
        let equations = sample_equations();
        let mut norms = ConvergenceNorms::new(&equations, &Config::new());
        let rr0 = Vector::from(&[100.0, 3.0, 4.0, 0.0]);
        norms.set_reference_residual(&rr0, &equations);
        assert_eq!(norms.rr_ini, 25.0);

        let u = Vector::from(&[50.0, 1.0, 2.0, 3.0]);
        norms.set_reference_energy(&u, &rr0, &equations);
        assert_eq!(norms.ee_ini, 11.0);
        assert_eq!(norms.ee_max, 11.0);

        let rr1 = Vector::from(&[100.0, 0.0, 0.1, 0.0]);
        let duu = Vector::from(&[1.0, 0.5, 1.0, 1.5]);
        norms.measure(0.5, &u, &rr1, &duu, &equations);
        assert_eq!(norms.rr_cur, 0.010000000000000002);
        assert_eq!(norms.ee_cur, 0.1);
        assert_eq!(norms.families[0].norm_inc, 1.0); // only eq 2
        assert_eq!(norms.families[0].norm_total, 1.0);
        assert_eq!(norms.families[1].norm_inc, 0.25 * 10.0);
        assert_eq!(norms.families[1].norm_total, 2.5);
        assert!(!norms.diverging());
    }

    #[test]
    fn converged_works() {
        let equations = sample_equations();
        let mut norms = ConvergenceNorms::new(&equations, &Config::new());
        norms.rr_ini = 1.0;
        norms.ee_ini = 1.0;
        norms.ee_max = 1.0;
        norms.rr_cur = 1e-7;
        norms.ee_cur = 1e-3;
        for n in &mut norms.families {
            n.norm_inc = 1e-8;
            n.norm_total = 1.0;
        }
        assert!(norms.converged(0.001, 0.01));

        // residual fails
        norms.rr_cur = 1e-5;
        assert!(!norms.converged(0.001, 0.01));
        assert!(norms.converged(0.0, 0.01));

        // energy fails
        norms.rr_cur = 1e-7;
        norms.ee_cur = 0.1;
        assert!(!norms.converged(0.001, 0.01));
        assert!(norms.converged(0.001, 0.0));

        // family fails
        norms.ee_cur = 1e-3;
        norms.families[1].norm_inc = 1e-5;
        assert!(!norms.converged(0.001, 0.01));
        norms.families[1].tol = 0.0;
        assert!(norms.converged(0.001, 0.01));

        // divergence
        norms.ee_cur = 2.0;
        assert!(norms.diverging());
        norms.reset_references();
        assert_eq!(norms.ee_max, 2.0);
        assert_eq!(norms.ee_ini, 2.0);
        assert!(!norms.diverging());
    }
}
