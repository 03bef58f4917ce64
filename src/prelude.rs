//! Makes available common structures needed to run a simulation
//!
//! You may write `use qnsim::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::base::{Arena, Config, Control, Dof, DofFamily, Essential, Handle, Natural, Physics, Predictor, QnMethod};
pub use crate::base::SampleMeshes;
pub use crate::constraint::{rigid_joint, Enforcement, LinearConstraint, LinearConstraintSet};
pub use crate::contact::{ContactInterface, ContactKind, ContactParams, ContactSurface};
pub use crate::fem::{Checkpoint, Counters, Domain, ElasticSolid, Equations, FemModel, FemState, SolverQuasin};
pub use crate::fem::{ConductionLinks, NonlinearSprings, RigidBody};
