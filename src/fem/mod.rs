//! Implements the quasi-Newton finite element solver and its reference domains

mod checkpoint;
mod discrete;
mod domain;
mod elastic_solid;
mod equations;
mod fem_model;
mod fem_state;
mod integration;
mod line_search;
mod linear_system;
mod local_blocks;
mod norms;
mod quasi_newton;
mod rigid_body;
mod solver_quasin;
pub use crate::fem::checkpoint::*;
pub use crate::fem::discrete::*;
pub use crate::fem::domain::*;
pub use crate::fem::elastic_solid::*;
pub use crate::fem::equations::*;
pub use crate::fem::fem_model::*;
pub use crate::fem::fem_state::*;
pub use crate::fem::integration::*;
pub use crate::fem::line_search::*;
pub use crate::fem::linear_system::*;
pub use crate::fem::local_blocks::*;
pub use crate::fem::norms::*;
pub use crate::fem::quasi_newton::*;
pub use crate::fem::rigid_body::*;
pub use crate::fem::solver_quasin::*;
