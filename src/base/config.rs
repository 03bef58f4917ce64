use super::{Control, DofFamily};
use russell_sparse::{Genie, LinSolParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Defines the default tolerance for the increment of each DOF family
pub const DEFAULT_TOL_FAMILY: f64 = 0.001;

/// Specifies the stiffness update strategy
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum QnMethod {
    /// Matthies-Strang BFGS update of the inverse stiffness
    Bfgs,

    /// Broyden (Sherman-Morrison) rank-one update of the inverse stiffness
    Broyden,

    /// Reformation at every iteration
    FullNewton,
}

/// Specifies how rate-type DOFs are predicted at the beginning of a time step
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Predictor {
    /// The rate is ramped from its previous value: v = v_old (γ-1)/γ; U is unchanged
    RampRate,

    /// The rate at the new time is zero: U = U_old + v_old Δt (1-γ) αf
    ZeroRate,

    /// The rate is held: v = v_old; U = U_old + v_old Δt
    HoldRate,
}

/// Holds configuration parameters for the quasi-Newton solver
#[derive(Clone, Debug)]
pub struct Config {
    /// Holds the (time-loop) control options
    pub control: Control,

    /// Tolerance on the residual norm (zero disables the criterion)
    ///
    /// Converged if `|R|² ≤ tol² |R₀|²`
    pub tol_residual: f64,

    /// Tolerance on the energy norm (zero disables the criterion)
    ///
    /// Converged if `|u·R| ≤ tol |u·R|₀`
    pub tol_energy: f64,

    /// Tolerances on the increment of each DOF family (zero disables the criterion)
    ///
    /// Families not found here use [DEFAULT_TOL_FAMILY].
    pub tol_families: BTreeMap<DofFamily, f64>,

    /// Residual norm below which the system is considered unloaded
    pub r_min: f64,

    /// Residual norm above which the step fails (zero disables the check)
    pub r_max: f64,

    /// Stiffness update strategy
    pub qn_method: QnMethod,

    /// Maximum number of quasi-Newton updates before a reformation
    pub qn_max_updates: usize,

    /// Maximum allowed BFGS condition number estimate
    pub qn_cmax: f64,

    /// Maximum number of stiffness reformations per time step
    pub n_max_reformations: usize,

    /// Reform the stiffness matrix at the beginning of every time step
    pub reform_each_time_step: bool,

    /// Reform the stiffness matrix when the iterations diverge
    pub diverge_reform: bool,

    /// Maximum number of (quasi-)Newton iterations per time step
    pub n_max_iterations: usize,

    /// Line search tolerance (zero disables the line search)
    pub ls_tol: f64,

    /// Minimum line search step
    pub ls_min: f64,

    /// Maximum number of line search iterations
    pub ls_n_max_iterations: usize,

    /// Run the augmentation loop of contact interfaces and constraints
    pub augmentation: bool,

    /// Maximum number of augmentations per time step (global cap)
    pub n_max_augmentations: usize,

    /// Transient analysis (rates are computed and predicted)
    pub transient: bool,

    /// Spectral radius for the generalized-α method; −1 or 0 ≤ ρ∞ ≤ 1
    pub rho_inf: f64,

    /// Order of the time integration equations (1 or 2)
    pub order: usize,

    /// Predictor of rate-type DOFs
    pub predictor: Predictor,

    /// Linear solver type
    pub lin_sol_genie: Genie,

    /// Configurations for the sparse linear solver
    pub lin_sol_params: LinSolParams,

    /// Ignore the symmetry hints of domains and store the full matrix
    pub ignore_symmetry: bool,
}

impl Config {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        Config {
            control: Control::new(),
            tol_residual: 0.001,
            tol_energy: 0.01,
            tol_families: BTreeMap::new(),
            r_min: 1e-20,
            r_max: 0.0,
            qn_method: QnMethod::Bfgs,
            qn_max_updates: 10,
            qn_cmax: 1e5,
            n_max_reformations: 15,
            reform_each_time_step: true,
            diverge_reform: true,
            n_max_iterations: 50,
            ls_tol: 0.9,
            ls_min: 0.01,
            ls_n_max_iterations: 5,
            augmentation: true,
            n_max_augmentations: 50,
            transient: false,
            rho_inf: -1.0,
            order: 2,
            predictor: Predictor::RampRate,
            lin_sol_genie: Genie::Umfpack,
            lin_sol_params: LinSolParams::new(),
            ignore_symmetry: false,
        }
    }

    /// Returns the tolerance on the increment of a DOF family
    pub fn tol_family(&self, family: DofFamily) -> f64 {
        match self.tol_families.get(&family) {
            Some(tol) => *tol,
            None => DEFAULT_TOL_FAMILY,
        }
    }

    /// Sets the tolerance on the increment of a DOF family
    pub fn set_tol_family(&mut self, family: DofFamily, tol: f64) -> &mut Self {
        self.tol_families.insert(family, tol);
        self
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if let Some(msg) = self.control.validate() {
            return Some(msg);
        }
        for (name, value) in [
            ("tol_residual", self.tol_residual),
            ("tol_energy", self.tol_energy),
            ("r_min", self.r_min),
            ("r_max", self.r_max),
            ("ls_tol", self.ls_tol),
        ] {
            if value < 0.0 {
                return Some(format!("{} = {:?} is incorrect; it must be ≥ 0.0", name, value));
            }
        }
        for (family, tol) in &self.tol_families {
            if *tol < 0.0 {
                return Some(format!(
                    "tolerance of the {} family = {:?} is incorrect; it must be ≥ 0.0",
                    family, tol
                ));
            }
        }
        if self.qn_cmax <= 0.0 {
            return Some(format!("qn_cmax = {:?} is incorrect; it must be > 0.0", self.qn_cmax));
        }
        if self.n_max_iterations < 1 {
            return Some(format!(
                "n_max_iterations = {} is incorrect; it must be ≥ 1",
                self.n_max_iterations
            ));
        }
        if self.ls_min <= 0.0 || self.ls_min > 1.0 {
            return Some(format!(
                "ls_min = {:?} is incorrect; it must be 0.0 < ls_min ≤ 1.0",
                self.ls_min
            ));
        }
        if self.ls_n_max_iterations < 1 {
            return Some(format!(
                "ls_n_max_iterations = {} is incorrect; it must be ≥ 1",
                self.ls_n_max_iterations
            ));
        }
        if self.rho_inf != -1.0 && (self.rho_inf < 0.0 || self.rho_inf > 1.0) {
            return Some(format!(
                "rho_inf = {:?} is incorrect; it must be -1.0 or 0.0 ≤ ρ∞ ≤ 1.0",
                self.rho_inf
            ));
        }
        if self.order != 1 && self.order != 2 {
            return Some(format!("order = {} is incorrect; it must be 1 or 2", self.order));
        }
        None // all good
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
