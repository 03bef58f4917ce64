//! Implements the base structures for the solver: DOFs, physics, boundary conditions, and configuration

mod arena;
mod config;
mod control;
mod dof;
mod essential;
mod natural;
mod physics;
mod samples;
pub use crate::base::arena::*;
pub use crate::base::config::*;
pub use crate::base::control::*;
pub use crate::base::dof::*;
pub use crate::base::essential::*;
pub use crate::base::natural::*;
pub use crate::base::physics::*;
pub use crate::base::samples::*;
