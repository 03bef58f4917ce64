use super::{Equations, FemState, LocalMatrix, LocalVector};
use crate::base::Physics;
use crate::StrError;
use gemlab::mesh::PointId;
use serde_json::Value;

/// Defines the contract of a physics domain (a set of elements plus their materials)
///
/// The solver never reaches into a domain: it only asks for residual and stiffness
/// contributions at a frozen state and asks the domain to update its internal history.
pub trait Domain {
    /// Returns the physics of this domain
    fn physics(&self) -> Physics;

    /// Returns the points used by this domain; each gets the DOFs of the physics
    fn points(&self) -> Vec<PointId>;

    /// Initializes the domain after the equations are numbered (e.g., caches local equations)
    fn init(&mut self, equations: &Equations) -> Result<(), StrError>;

    /// Prepares the domain for a new time step
    fn prep_step(&mut self, _state: &FemState) -> Result<(), StrError> {
        Ok(())
    }

    /// Calculates the local contributions to the residual R = F_ext − F_int
    fn residual(&self, state: &FemState) -> Result<Vec<LocalVector>, StrError>;

    /// Calculates the local contributions to the stiffness K = −∂R/∂U
    fn stiffness(&self, state: &FemState) -> Result<Vec<LocalMatrix>, StrError>;

    /// Updates the internal history (e.g., stresses) for the given state
    fn update(&mut self, state: &FemState) -> Result<(), StrError>;

    /// Returns the internal history for checkpoints
    fn history(&self) -> Result<Value, StrError>;

    /// Restores the internal history from a checkpoint
    fn set_history(&mut self, history: &Value) -> Result<(), StrError>;
}
