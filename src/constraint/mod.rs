//! Implements nonlinear constraints enforced by penalty, augmented Lagrangian, or Lagrange multipliers

use crate::fem::{Equations, FemState, LocalMatrix, LocalVector};
use crate::StrError;
use serde_json::Value;

mod linear_constraint;
mod rigid_joint;
pub use crate::constraint::linear_constraint::*;
pub use crate::constraint::rigid_joint::*;

/// Defines the contract of a constraint
///
/// Multipliers of the augmented Lagrangian method are data: they change only in
/// [Constraint::augment], after the inner iterations have converged. Multipliers of
/// the Lagrange method are unknowns with their own equations (appended after the nodal DOFs).
pub trait Constraint {
    /// Returns the number of Lagrange multiplier equations required by this constraint
    fn n_lagrange(&self) -> usize;

    /// Caches the equation numbers
    ///
    /// `lagrange` is the index of the first Lagrange multiplier of this constraint
    /// (see [Equations::lagrange_eq]).
    fn init(&mut self, equations: &Equations, lagrange: usize) -> Result<(), StrError>;

    /// Prepares the constraint for a new time step
    fn prep_step(&mut self, _state: &FemState) -> Result<(), StrError> {
        Ok(())
    }

    /// Calculates the contributions to the residual R = F_ext − F_int
    fn residual(&self, state: &FemState) -> Result<Vec<LocalVector>, StrError>;

    /// Calculates the contributions to the stiffness K = −∂R/∂U
    fn stiffness(&self, state: &FemState) -> Result<Vec<LocalMatrix>, StrError>;

    /// Updates the constraint violations for the given state
    fn update(&mut self, state: &FemState) -> Result<(), StrError>;

    /// Performs an augmentation; returns true if converged
    fn augment(&mut self, naug: usize) -> Result<bool, StrError>;

    /// Returns the internal history for checkpoints
    fn history(&self) -> Result<Value, StrError>;

    /// Restores the internal history from a checkpoint
    fn set_history(&mut self, history: &Value) -> Result<(), StrError>;
}
