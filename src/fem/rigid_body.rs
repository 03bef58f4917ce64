use crate::base::Dof;
use gemlab::mesh::PointId;

/// Holds a rigid body with translations and rotations of a reference point
///
/// The body takes a virtual point id after the mesh points, thus its equations come
/// after the nodal equations and before the Lagrange multipliers. Essential conditions
/// and point loads refer to the body by this id (use [Dof::Rz] etc. for the rotations
/// and moments).
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBody {
    /// Virtual point id
    pub id: PointId,

    /// Coordinates of the reference point (len = ndim)
    pub center: Vec<f64>,
}

impl RigidBody {
    /// Returns the DOFs of the body: translations then rotations (Ux, Uy, Rz in 2D)
    pub fn dofs(&self) -> Vec<Dof> {
        let ndim = self.center.len();
        let mut dofs = Dof::displacements(ndim).to_vec();
        dofs.extend_from_slice(Dof::rotations(ndim));
        dofs
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
