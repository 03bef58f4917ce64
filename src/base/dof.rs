use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines degrees-of-freedom (DOF) types
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dof {
    /// Displacement along the first dimension
    Ux = 0,

    /// Displacement along the second dimension
    Uy = 1,

    /// Displacement along the third dimension
    Uz = 2,

    /// Fluid pressure (biphasic)
    P = 3,

    /// Solute concentration
    C = 4,

    /// Temperature
    T = 5,

    /// Fluid velocity along the first dimension
    Vx = 6,

    /// Fluid velocity along the second dimension
    Vy = 7,

    /// Fluid velocity along the third dimension
    Vz = 8,

    /// Fluid dilatation
    Ef = 9,

    /// Angular velocity around the first axis (polar fluids)
    Wx = 10,

    /// Angular velocity around the second axis (polar fluids)
    Wy = 11,

    /// Angular velocity around the third axis (polar fluids)
    Wz = 12,

    /// Rotation of a rigid body around the first axis
    Rx = 13,

    /// Rotation of a rigid body around the second axis
    Ry = 14,

    /// Rotation of a rigid body around the third axis
    Rz = 15,
}

/// Groups DOFs that share one convergence criterion
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DofFamily {
    Displacement,
    Pressure,
    Concentration,
    Temperature,
    Velocity,
    Dilatation,
    AngularVelocity,
    Rotation,

    /// Lagrange multipliers appended by constraints (never checked on the increment)
    Lagrange,
}

impl Dof {
    /// Returns the family of this DOF
    pub fn family(&self) -> DofFamily {
        match self {
            Dof::Ux | Dof::Uy | Dof::Uz => DofFamily::Displacement,
            Dof::P => DofFamily::Pressure,
            Dof::C => DofFamily::Concentration,
            Dof::T => DofFamily::Temperature,
            Dof::Vx | Dof::Vy | Dof::Vz => DofFamily::Velocity,
            Dof::Ef => DofFamily::Dilatation,
            Dof::Wx | Dof::Wy | Dof::Wz => DofFamily::AngularVelocity,
            Dof::Rx | Dof::Ry | Dof::Rz => DofFamily::Rotation,
        }
    }

    /// Returns the displacement DOFs for a given space dimension
    pub fn displacements(ndim: usize) -> &'static [Dof] {
        if ndim == 2 {
            &[Dof::Ux, Dof::Uy]
        } else {
            &[Dof::Ux, Dof::Uy, Dof::Uz]
        }
    }

    /// Returns the rotation DOFs for a given space dimension (only Rz in 2D)
    pub fn rotations(ndim: usize) -> &'static [Dof] {
        if ndim == 2 {
            &[Dof::Rz]
        } else {
            &[Dof::Rx, Dof::Ry, Dof::Rz]
        }
    }
}

impl fmt::Display for DofFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DofFamily::Displacement => "displacement",
            DofFamily::Pressure => "pressure",
            DofFamily::Concentration => "concentration",
            DofFamily::Temperature => "temperature",
            DofFamily::Velocity => "velocity",
            DofFamily::Dilatation => "dilatation",
            DofFamily::AngularVelocity => "angular velocity",
            DofFamily::Rotation => "rotation",
            DofFamily::Lagrange => "lagrange",
        };
        write!(f, "{}", name)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
