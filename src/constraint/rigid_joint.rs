use super::{Enforcement, LinearConstraint};
use crate::base::Dof;
use crate::fem::RigidBody;
use crate::StrError;
use gemlab::mesh::{Mesh, PointId};

/// Returns the linear constraints joining mesh points to a rigid body
///
/// Each point follows the body with small rotations: `u_p − U − θ × r = 0`, where
/// `r = x_p − x_c` is taken from the undeformed coordinates. In 2D, only θz exists.
/// The constraints may be collected in a [super::LinearConstraintSet].
///
/// # Examples
///
/// ```text
/// x:  u_px − Ux − θy rz + θz ry = 0
/// y:  u_py − Uy − θz rx + θx rz = 0
/// z:  u_pz − Uz − θx ry + θy rx = 0
/// ```
pub fn rigid_joint(
    body: &RigidBody,
    mesh: &Mesh,
    points: &[PointId],
    enforcement: Enforcement,
    penalty: f64,
) -> Result<Vec<LinearConstraint>, StrError> {
    let ndim = mesh.ndim;
    if body.center.len() != ndim {
        return Err("the rigid body and the mesh must have the same dimension");
    }
    if points.is_empty() {
        return Err("rigid joint must have at least one point");
    }
    let mut constraints = Vec::with_capacity(points.len() * ndim);
    for p in points {
        let point = mesh.points.get(*p).ok_or("rigid joint refers to a point outside the mesh")?;
        let mut r = [0.0; 3];
        for i in 0..ndim {
            r[i] = point.coords[i] - body.center[i];
        }
        let b = body.id;
        let rows: Vec<Vec<(PointId, Dof, f64)>> = if ndim == 2 {
            vec![
                vec![(*p, Dof::Ux, 1.0), (b, Dof::Ux, -1.0), (b, Dof::Rz, r[1])],
                vec![(*p, Dof::Uy, 1.0), (b, Dof::Uy, -1.0), (b, Dof::Rz, -r[0])],
            ]
        } else {
            vec![
                vec![(*p, Dof::Ux, 1.0), (b, Dof::Ux, -1.0), (b, Dof::Ry, -r[2]), (b, Dof::Rz, r[1])],
                vec![(*p, Dof::Uy, 1.0), (b, Dof::Uy, -1.0), (b, Dof::Rz, -r[0]), (b, Dof::Rx, r[2])],
                vec![(*p, Dof::Uz, 1.0), (b, Dof::Uz, -1.0), (b, Dof::Rx, -r[1]), (b, Dof::Ry, r[0])],
            ]
        };
        for terms in rows {
            // zero lever arms
            let terms: Vec<_> = terms.into_iter().filter(|(_, _, c)| *c != 0.0).collect();
            constraints.push(LinearConstraint::new(&terms, enforcement, penalty)?);
        }
    }
    Ok(constraints)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
