//! Quasi-Newton nonlinear finite element solver with contact and augmented Lagrangian constraints
//!
//! The core drives the time loop, the inner (quasi-)Newton iterations with line search,
//! the convergence checks per DOF family, and the augmentation loop of contact interfaces
//! and nonlinear constraints. Domains (elements plus materials) are external collaborators
//! reached via the [fem::Domain] trait.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

/// Defines a function of time
pub type FnTime = fn(t: f64) -> f64;

pub mod base;
pub mod constraint;
pub mod contact;
pub mod fem;
pub mod prelude;
