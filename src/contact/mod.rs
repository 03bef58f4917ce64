//! Implements contact surfaces, projections, and contact interfaces (tied and sliding)

mod interface;
mod projection;
mod surface;
pub use crate::contact::interface::*;
pub use crate::contact::projection::*;
pub use crate::contact::surface::*;
