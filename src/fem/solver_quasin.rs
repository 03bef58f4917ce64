use super::{Checkpoint, ConvergenceNorms, EqNumber, Equations, FemModel, FemState};
use super::{IntegrationParams, LineSearch, LinearSystem, QuasiNewton};
use crate::base::{Config, Dof, Ebc, QnMethod};
use crate::StrError;
use gemlab::mesh::PointId;
use russell_lab::{vec_copy, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holds the counters of the solver
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    /// Number of converged time steps
    pub n_time_steps: usize,

    /// Total number of (quasi-)Newton iterations
    pub n_iterations: usize,

    /// Total number of stiffness reformations
    pub n_reformations: usize,

    /// Total number of accepted quasi-Newton updates
    pub n_updates: usize,

    /// Total number of retried time steps
    pub n_retries: usize,

    /// Total number of augmentations
    pub n_augmentations: usize,

    /// Number of iterations of the last time step
    pub n_step_iterations: usize,

    /// Number of reformations of the last time step
    pub n_step_reformations: usize,
}

/// Defines the reasons for a time step to fail
///
/// All variants except `Provider` lead to a retry with a smaller time increment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepFailure {
    /// The residual norm is NaN or Inf
    NanDetected,

    /// The residual norm exceeds r_max
    MaxResidual,

    /// The iterations did not converge
    MaxIterations,

    /// The number of stiffness reformations exceeds the maximum
    MaxReformations,

    /// The augmentations did not converge
    AugmentationFailed,

    /// The linear solver failed (e.g., singular matrix)
    LinearSolver(StrError),

    /// A domain, constraint, or contact interface failed
    Provider(StrError),
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFailure::NanDetected => write!(f, "found NaN or Inf in the residual"),
            StepFailure::MaxResidual => write!(f, "the residual exceeds the maximum allowed value"),
            StepFailure::MaxIterations => write!(f, "the iterations did not converge"),
            StepFailure::MaxReformations => write!(f, "reached the maximum number of reformations"),
            StepFailure::AugmentationFailed => write!(f, "the augmentations did not converge"),
            StepFailure::LinearSolver(msg) => write!(f, "the linear solver failed: {}", msg),
            StepFailure::Provider(msg) => write!(f, "{}", msg),
        }
    }
}

/// Implements the quasi-Newton nonlinear solver
///
/// Each time step runs:
///
/// ```text
/// PREP_STEP → ITERATE → {CONVERGED | FAILED}
/// ```
///
/// The residual is R = F_ext − F_int and the stiffness is K = −∂R/∂U; thus the direction
/// u solves K·u = R and the update reads U ← U + s·u, with s from the line search.
/// Prescribed equations are kept in the system with a unit diagonal; their remaining
/// increment is applied in the first iteration and then enforced exactly.
pub struct SolverQuasin<'a> {
    /// Holds the model (the solver owns it for the duration of the simulation)
    pub model: FemModel<'a>,

    /// Holds configuration parameters
    pub config: &'a Config,

    /// Holds the equation numbers
    pub equations: Equations,

    /// Holds the global linear system
    pub linear_system: LinearSystem<'a>,

    /// Holds the quasi-Newton updates
    pub quasi_newton: QuasiNewton,

    /// Holds the line search parameters
    pub line_search: LineSearch,

    /// Holds the time integration parameters
    pub params: IntegrationParams,

    /// Holds the convergence norms
    pub norms: ConvergenceNorms,

    /// Holds the counters
    pub counters: Counters,

    /// Holds the reactions at the prescribed equations (zero elsewhere)
    pub reactions: Vector,

    /// Residual at the beginning of the iteration (R0)
    rr0: Vector,

    /// Residual at the trial state (R1)
    rr1: Vector,

    /// Accumulated increment of the time step U_i = U − U_t
    duu: Vector,

    /// Direction of the current iteration (u)
    mdu: Vector,

    /// Target values of the prescribed equations at the current time
    targets: Vector,

    /// Remaining increments of the prescribed equations (zero after the first update)
    up: Vector,

    /// Prescribed equations and their conditions (sorted by equation)
    prescribed: Vec<(usize, Ebc)>,

    /// Flags the equations that may be predicted (non-prescribed)
    free: Vec<bool>,

    /// Forces a reformation at the beginning of the next iteration sequence
    force_reform: bool,

    /// Indicates that a factorization is available
    factorized: bool,
}

impl<'a> SolverQuasin<'a> {
    /// Allocates a new instance
    ///
    /// Numbers the equations (see [FemModel::init_equations]) and allocates the linear system.
    pub fn new(model: FemModel<'a>, config: &'a Config) -> Result<Self, StrError> {
        if let Some(msg) = config.validate() {
            log::error!("{}", msg);
            return Err("cannot allocate solver because config.validate() failed");
        }
        let mut model = model;
        let equations = model.init_equations()?;
        let neq = equations.n_equation;
        let symmetric = model.symmetric() && !config.ignore_symmetry;
        let linear_system = LinearSystem::new(neq, 0, symmetric, config.lin_sol_genie, config.lin_sol_params)?;
        let mut prescribed = Vec::with_capacity(equations.n_prescribed);
        for ((point_id, dof), ebc) in &model.essential.all {
            if let EqNumber::Prescribed(k) = equations.eq_number(*point_id, *dof)? {
                prescribed.push((k, *ebc));
            }
        }
        prescribed.sort_by_key(|(k, _)| *k);
        let free = equations.prescribed.iter().map(|p| !p).collect();
        let norms = ConvergenceNorms::new(&equations, config);
        Ok(SolverQuasin {
            model,
            config,
            equations,
            linear_system,
            quasi_newton: QuasiNewton::new(config.qn_method, config.qn_max_updates, config.qn_cmax),
            line_search: LineSearch::new(config),
            params: IntegrationParams::new(config.rho_inf, config.order),
            norms,
            counters: Counters::default(),
            reactions: Vector::new(neq),
            rr0: Vector::new(neq),
            rr1: Vector::new(neq),
            duu: Vector::new(neq),
            mdu: Vector::new(neq),
            targets: Vector::new(neq),
            up: Vector::new(neq),
            prescribed,
            free,
            force_reform: true,
            factorized: false,
        })
    }

    /// Returns the reaction at a prescribed DOF (as of the last converged step)
    pub fn reaction(&self, point_id: PointId, dof: Dof) -> Result<f64, StrError> {
        match self.equations.eq_number(point_id, dof)? {
            EqNumber::Prescribed(k) => Ok(self.reactions[k]),
            _ => Err("reactions are only available at prescribed DOFs"),
        }
    }

    /// Returns the residual at the last trial state
    pub fn residual(&self) -> &Vector {
        &self.rr1
    }

    /// Prepares a new time step
    ///
    /// Advances the time by `state.dt`, predicts the rate-type unknowns, computes the
    /// targets of the prescribed equations, and calls the pre-step hooks of the model.
    pub fn prep_step(&mut self, state: &mut FemState) -> Result<(), StrError> {
        state.t += state.dt;
        if self.config.transient {
            self.params.predict(self.config.predictor, state, &self.free);
        } else {
            state.rate_factor = 0.0;
        }
        for k in 0..self.equations.n_equation {
            self.duu[k] = state.uu[k] - state.uu_old[k];
        }
        self.targets.fill(0.0);
        self.up.fill(0.0);
        for (k, ebc) in &self.prescribed {
            self.targets[*k] = ebc.value(state.t);
            self.up[*k] = self.targets[*k] - state.uu[*k];
            if self.up[*k] != 0.0 {
                self.force_reform = true;
            }
        }
        self.model.prep_step(state)
    }

    /// Solves one time step (after [SolverQuasin::prep_step])
    ///
    /// Returns true if the step has converged; then the state is committed. Returns false
    /// if the step has failed in a recoverable way; then the state is unusable and must
    /// be restored from a checkpoint. Returns an error if a provider failed.
    pub fn solve_step(&mut self, state: &mut FemState) -> Result<bool, StrError> {
        self.counters.n_step_iterations = 0;
        self.counters.n_step_reformations = 0;
        match self.iterate(state) {
            Ok(()) => {
                self.commit(state);
                Ok(true)
            }
            Err(StepFailure::Provider(msg)) => Err(msg),
            Err(failure) => {
                log::warn!("time step at t = {:e} failed: {}", state.t, failure);
                self.force_reform = true;
                Ok(false)
            }
        }
    }

    /// Runs the time loop from state.t to t_fin
    ///
    /// Failed steps are retried from the last converged state with a reduced time increment.
    pub fn solve(&mut self, state: &mut FemState) -> Result<(), StrError> {
        let config = self.config;
        let control = &config.control;
        control.print_header();
        let mut last = self.checkpoint(state)?;
        let mut dt = (control.dt)(state.t);
        let mut n_retries = 0;
        for timestep in 0..control.n_max_time_steps {
            if control.t_fin - state.t < control.dt_min {
                return Ok(());
            }
            if dt < control.dt_min {
                return Err("Δt is smaller than the allowed minimum");
            }
            state.dt = f64::min(dt, control.t_fin - state.t);
            self.prep_step(state)?;
            control.print_timestep(timestep, state.t, state.dt);
            if self.solve_step(state)? {
                last = self.checkpoint(state)?;
                dt = (control.dt)(state.t);
                n_retries = 0;
            } else {
                n_retries += 1;
                if n_retries > control.n_max_retries {
                    return Err("the time step did not converge after the maximum number of retries");
                }
                let counters = self.counters;
                self.restore(state, &last)?;
                self.counters = counters;
                self.counters.n_retries += 1;
                dt *= control.dt_cutback;
                log::warn!(
                    "retrying the time step with Δt = {:e} ({} of {})",
                    dt,
                    n_retries,
                    control.n_max_retries
                );
            }
        }
        if control.t_fin - state.t >= control.dt_min {
            return Err("reached the maximum number of time steps");
        }
        Ok(())
    }

    /// Returns a snapshot of all mutable data
    pub fn checkpoint(&self, state: &FemState) -> Result<Checkpoint, StrError> {
        Ok(Checkpoint {
            state: state.clone(),
            duu: self.duu.clone(),
            mdu: self.mdu.clone(),
            rr0: self.rr0.clone(),
            rr1: self.rr1.clone(),
            reactions: self.reactions.clone(),
            norms: self.norms.clone(),
            counters: self.counters,
            params: self.params,
            quasi_newton: self.quasi_newton.clone(),
            history: self.model.history()?,
        })
    }

    /// Restores all mutable data from a snapshot
    ///
    /// The next step starts with a stiffness reformation.
    pub fn restore(&mut self, state: &mut FemState, checkpoint: &Checkpoint) -> Result<(), StrError> {
        let neq = self.equations.n_equation;
        if checkpoint.state.uu.dim() != neq || checkpoint.duu.dim() != neq || checkpoint.reactions.dim() != neq {
            return Err("checkpoint is incompatible with the solver");
        }
        self.model.set_history(&checkpoint.history)?;
        *state = checkpoint.state.clone();
        vec_copy(&mut self.duu, &checkpoint.duu)?;
        vec_copy(&mut self.mdu, &checkpoint.mdu)?;
        vec_copy(&mut self.rr0, &checkpoint.rr0)?;
        vec_copy(&mut self.rr1, &checkpoint.rr1)?;
        vec_copy(&mut self.reactions, &checkpoint.reactions)?;
        self.norms = checkpoint.norms.clone();
        self.counters = checkpoint.counters;
        self.params = checkpoint.params;
        self.quasi_newton = checkpoint.quasi_newton.clone();
        self.force_reform = true;
        Ok(())
    }

    /// Runs the iterations of one time step
    fn iterate(&mut self, state: &mut FemState) -> Result<(), StepFailure> {
        let config = self.config;
        let neq = self.equations.n_equation;

        // initial residual and reformation
        self.model
            .residual(state, &mut self.rr0)
            .map_err(StepFailure::Provider)?;
        let mut reformed = false;
        if self.force_reform
            || !self.factorized
            || config.reform_each_time_step
            || config.qn_method == QnMethod::FullNewton
        {
            self.reform(state)?;
            for k in 0..neq {
                if !self.equations.prescribed[k] {
                    self.rr0[k] += self.linear_system.ff_presc[k];
                }
            }
            reformed = true;
        }
        self.norms.set_reference_residual(&self.rr0, &self.equations);

        let mut capture_energy = true;
        let mut n_counted_reforms = 0;
        let mut naug = 0;
        let mut rhs = Vector::new(neq);
        for it in 0..config.n_max_iterations {
            self.counters.n_iterations += 1;
            self.counters.n_step_iterations += 1;

            // direction: prescribed rows carry the remaining increments
            for k in 0..neq {
                rhs[k] = if self.equations.prescribed[k] { self.up[k] } else { self.rr0[k] };
            }
            self.quasi_newton
                .solve(&mut self.mdu, &rhs, &mut self.linear_system)
                .map_err(StepFailure::LinearSolver)?;
            if capture_energy {
                self.norms.set_reference_energy(&self.mdu, &self.rr0, &self.equations);
                capture_energy = false;
            }

            // line search (the trial state corresponds to the returned step)
            let uu_start = state.uu.clone();
            let r0 = masked_inner(&self.mdu, &self.rr0, &self.equations.prescribed);
            let line_search = self.line_search;
            let s = line_search
                .search(r0, |s| self.trial(state, &uu_start, s))
                .map_err(StepFailure::Provider)?;
            self.up.fill(0.0);

            // norms
            self.norms.measure(s, &self.mdu, &self.rr1, &self.duu, &self.equations);
            let rr_cur = self.norms.rr_cur;
            if !rr_cur.is_finite() {
                config.control.print_iteration(it, rr_cur, 0.0, 0.0, 0.0, false, reformed);
                return Err(StepFailure::NanDetected);
            }
            if config.r_max > 0.0 && rr_cur > config.r_max {
                return Err(StepFailure::MaxResidual);
            }
            let diverging = self.norms.diverging();
            let mut converged = if rr_cur <= config.r_min {
                if self.norms.rr_ini <= config.r_min {
                    log::warn!("no force acting on the system");
                }
                true
            } else {
                // a zero step leaves the state unchanged and proves nothing
                s > 0.0 && !diverging && self.norms.converged(config.tol_residual, config.tol_energy)
            };
            config.control.print_iteration(
                it,
                rr_cur,
                config.tol_residual * config.tol_residual * self.norms.rr_ini,
                self.norms.ee_cur,
                config.tol_energy * self.norms.ee_ini,
                diverging,
                reformed,
            );
            reformed = false;

            // augmentation
            if converged && config.augmentation {
                let done = self.model.augment(naug).map_err(StepFailure::Provider)?;
                self.counters.n_augmentations += 1;
                if !done {
                    naug += 1;
                    if naug > config.n_max_augmentations {
                        return Err(StepFailure::AugmentationFailed);
                    }
                    self.model.update(state).map_err(StepFailure::Provider)?;
                    self.model
                        .residual(state, &mut self.rr0)
                        .map_err(StepFailure::Provider)?;
                    self.norms.set_reference_residual(&self.rr0, &self.equations);
                    capture_energy = true;
                    self.reform(state)?;
                    reformed = true;
                    converged = false;
                    continue;
                }
            }
            if converged {
                return Ok(());
            }

            // next stiffness
            let mut reform = false;
            if s == 0.0 {
                log::warn!("zero line search step; reforming the stiffness matrix");
                reform = true;
            } else if diverging && config.diverge_reform {
                log::warn!("diverging iterations; reforming the stiffness matrix");
                self.norms.reset_references();
                reform = true;
            } else {
                let accepted = self
                    .quasi_newton
                    .update(
                        s,
                        &self.mdu,
                        &self.rr0,
                        &self.rr1,
                        &self.equations.prescribed,
                        &mut self.linear_system,
                    )
                    .map_err(StepFailure::LinearSolver)?;
                if accepted {
                    self.counters.n_updates += 1;
                } else {
                    reform = true;
                }
            }
            self.norms.track_max_energy();
            for k in 0..neq {
                self.rr0[k] = self.rr1[k];
            }
            if reform {
                if config.qn_method != QnMethod::FullNewton {
                    n_counted_reforms += 1;
                    if n_counted_reforms > config.n_max_reformations {
                        return Err(StepFailure::MaxReformations);
                    }
                }
                self.reform(state)?;
                reformed = true;
            }
        }
        Err(StepFailure::MaxIterations)
    }

    /// Moves the state to U_start + s·u (prescribed equations at their targets)
    ///
    /// Returns the merit function u·R(U).
    fn trial(&mut self, state: &mut FemState, uu_start: &Vector, s: f64) -> Result<f64, StrError> {
        for k in 0..self.equations.n_equation {
            state.uu[k] = if self.equations.prescribed[k] {
                self.targets[k]
            } else {
                uu_start[k] + s * self.mdu[k]
            };
            self.duu[k] = state.uu[k] - state.uu_old[k];
        }
        if self.config.transient {
            self.params.update_rates(state);
        }
        self.model.update(state)?;
        self.model.residual(state, &mut self.rr1)?;
        Ok(masked_inner(&self.mdu, &self.rr1, &self.equations.prescribed))
    }

    /// Assembles and factorizes the stiffness matrix
    fn reform(&mut self, state: &FemState) -> Result<(), StepFailure> {
        let blocks = self.model.stiffness(state).map_err(StepFailure::Provider)?;
        let ls = &mut self.linear_system;
        let nnz = blocks.iter().map(|b| ls.nnz_local(b)).sum::<usize>() + self.equations.n_prescribed;
        ls.reset(nnz).map_err(StepFailure::LinearSolver)?;
        for block in &blocks {
            ls.assemble(block, &self.up).map_err(StepFailure::LinearSolver)?;
        }
        ls.finalize(&self.equations.prescribed)
            .map_err(StepFailure::LinearSolver)?;
        self.factorized = false;
        ls.factorize().map_err(StepFailure::LinearSolver)?;
        self.factorized = true;
        self.force_reform = false;
        self.quasi_newton.reset();
        self.counters.n_reformations += 1;
        self.counters.n_step_reformations += 1;
        Ok(())
    }

    /// Accepts the converged state
    fn commit(&mut self, state: &mut FemState) {
        self.reactions.fill(0.0);
        for (k, _) in &self.prescribed {
            self.reactions[*k] = -self.rr1[*k];
        }
        for k in 0..self.equations.n_equation {
            state.uu_old[k] = state.uu[k];
            state.vv_old[k] = state.vv[k];
        }
        self.counters.n_time_steps += 1;
    }
}

/// Computes a·b skipping the masked rows
fn masked_inner(a: &Vector, b: &Vector, mask: &[bool]) -> f64 {
    let mut sum = 0.0;
    for k in 0..a.dim() {
        if !mask[k] {
            sum += a[k] * b[k];
        }
    }
    sum
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
