use super::Dof;
use serde::{Deserialize, Serialize};

/// Holds the closed set of physics handled by the solver
///
/// Each domain is tagged with one of these variants; the solver only uses the tag to
/// find out which DOFs must be declared and whether the tangent is symmetric.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Physics {
    /// Solid mechanics: displacements only
    Structural,

    /// Porous media: displacements and fluid pressure
    Biphasic,

    /// Fluid mechanics: velocities and dilatation, plus angular velocities if polar
    Fluid { polar: bool },

    /// Heat transfer: temperature only
    Thermal,

    /// Multiphasic media: displacements, fluid pressure, and solute concentration
    Coupled,
}

impl Physics {
    /// Returns the DOFs required at each node
    pub fn dofs(&self, ndim: usize) -> Vec<Dof> {
        let mut dofs = Vec::new();
        match self {
            Physics::Structural => dofs.extend_from_slice(Dof::displacements(ndim)),
            Physics::Biphasic => {
                dofs.extend_from_slice(Dof::displacements(ndim));
                dofs.push(Dof::P);
            }
            Physics::Fluid { polar } => {
                dofs.extend_from_slice(&[Dof::Vx, Dof::Vy, Dof::Vz][..ndim]);
                dofs.push(Dof::Ef);
                if *polar {
                    dofs.extend_from_slice(&[Dof::Wx, Dof::Wy, Dof::Wz]);
                }
            }
            Physics::Thermal => dofs.push(Dof::T),
            Physics::Coupled => {
                dofs.extend_from_slice(Dof::displacements(ndim));
                dofs.push(Dof::P);
                dofs.push(Dof::C);
            }
        }
        dofs
    }

    /// Tells whether the tangent (Jacobian) matrix is symmetric
    pub fn symmetric(&self) -> bool {
        match self {
            Physics::Structural | Physics::Thermal => true,
            Physics::Biphasic | Physics::Fluid { .. } | Physics::Coupled => false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Physics;
    use crate::base::Dof;

    #[test]
    fn dofs_work() {
        assert_eq!(Physics::Structural.dofs(2), &[Dof::Ux, Dof::Uy]);
        assert_eq!(Physics::Biphasic.dofs(3), &[Dof::Ux, Dof::Uy, Dof::Uz, Dof::P]);
        assert_eq!(Physics::Fluid { polar: false }.dofs(2), &[Dof::Vx, Dof::Vy, Dof::Ef]);
        assert_eq!(
            Physics::Fluid { polar: true }.dofs(3),
            &[Dof::Vx, Dof::Vy, Dof::Vz, Dof::Ef, Dof::Wx, Dof::Wy, Dof::Wz]
        );
        assert_eq!(Physics::Thermal.dofs(3), &[Dof::T]);
        assert_eq!(Physics::Coupled.dofs(2), &[Dof::Ux, Dof::Uy, Dof::P, Dof::C]);
    }

    #[test]
    fn symmetric_works() {
        assert!(Physics::Structural.symmetric());
        assert!(Physics::Thermal.symmetric());
        assert!(!Physics::Biphasic.symmetric());
        assert!(!Physics::Fluid { polar: false }.symmetric());
        assert!(!Physics::Coupled.symmetric());
    }
}
