use super::surface::{calc_facet_point, cross, dot, facet_centre, facet_contains};
use super::ContactSurface;
use crate::StrError;
use gemlab::shapes::Scratchpad;

const N_MAX_NEWTON: usize = 25;
const TOL_NEWTON: f64 = 1e-13;

/// Holds the projection of a point onto a facet
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Index of the facet
    pub facet: usize,

    /// Reference coordinates on the facet
    pub rs: [f64; 2],

    /// Signed distance along the ray (x + t·d lies on the facet) or the distance to the closest point
    pub t: f64,
}

/// Solves [a b c]·z = f with Cramer's rule; returns None if the matrix is singular
fn solve3(a: [f64; 3], b: [f64; 3], c: [f64; 3], f: [f64; 3]) -> Option<[f64; 3]> {
    let det = dot(a, cross(b, c));
    let scale = f64::max(dot(a, a), f64::max(dot(b, b), dot(c, c)));
    if f64::abs(det) <= 1e-14 * scale * f64::sqrt(scale) {
        return None;
    }
    Some([
        dot(f, cross(b, c)) / det,
        dot(a, cross(f, c)) / det,
        dot(a, cross(b, f)) / det,
    ])
}

/// Intersects the ray x + t·d with a facet
///
/// Runs a Newton iteration on (r, s, t) starting at the facet centre; flat facets converge
/// in one iteration. Returns None if the ray is parallel to the facet.
pub fn intersect_facet(pad: &mut Scratchpad, x: [f64; 3], d: [f64; 3]) -> Result<Option<([f64; 2], f64)>, StrError> {
    let minus_d = [-d[0], -d[1], -d[2]];
    let [mut r, mut s] = facet_centre(pad.kind);
    let mut t = 0.0;
    for _ in 0..N_MAX_NEWTON {
        let p = calc_facet_point(pad, [r, s])?;
        let y = p.x;
        // residual: x + t·d − y(r,s) = 0
        let f = [x[0] + t * d[0] - y[0], x[1] + t * d[1] - y[1], x[2] + t * d[2] - y[2]];
        let dz = match solve3(p.tangents[0], p.tangents[1], minus_d, f) {
            Some(dz) => dz,
            None => return Ok(None),
        };
        r += dz[0];
        s += dz[1];
        t += dz[2];
        if !(r.is_finite() && s.is_finite() && t.is_finite()) {
            return Ok(None);
        }
        if f64::abs(dz[0]) + f64::abs(dz[1]) < TOL_NEWTON {
            return Ok(Some(([r, s], t)));
        }
    }
    Ok(None)
}

/// Finds the point of a facet closest to x
///
/// Runs a Gauss-Newton iteration on (y(r,s) − x)·∂y/∂r = (y(r,s) − x)·∂y/∂s = 0 and returns
/// the reference coordinates and the distance |y − x|.
pub fn closest_point(pad: &mut Scratchpad, x: [f64; 3]) -> Result<Option<([f64; 2], f64)>, StrError> {
    let [mut r, mut s] = facet_centre(pad.kind);
    for _ in 0..N_MAX_NEWTON {
        let p = calc_facet_point(pad, [r, s])?;
        let [a, b] = p.tangents;
        let e = [p.x[0] - x[0], p.x[1] - x[1], p.x[2] - x[2]];
        let (aa, ab, bb) = (dot(a, a), dot(a, b), dot(b, b));
        let det = aa * bb - ab * ab;
        if det <= 0.0 {
            return Ok(None);
        }
        let (fa, fb) = (dot(e, a), dot(e, b));
        let dr = -(bb * fa - ab * fb) / det;
        let ds = -(aa * fb - ab * fa) / det;
        r += dr;
        s += ds;
        if !(r.is_finite() && s.is_finite()) {
            return Ok(None);
        }
        if f64::abs(dr) + f64::abs(ds) < TOL_NEWTON {
            let y = calc_facet_point(pad, [r, s])?.x;
            let dist = f64::sqrt((y[0] - x[0]).powi(2) + (y[1] - x[1]).powi(2) + (y[2] - x[2]).powi(2));
            return Ok(Some(([r, s], dist)));
        }
    }
    Ok(None)
}

/// Projects a point onto a surface along a ray
///
/// Accepts facets where the projection lies within the `stol` parametric tolerance and
/// `|t| ≤ srad`. The projection with minimum |t| wins; ties go to the facet with the lowest
/// index, thus the result does not depend on the traversal order.
pub fn project(
    surface: &ContactSurface,
    positions: &[[f64; 3]],
    x: [f64; 3],
    d: [f64; 3],
    stol: f64,
    srad: f64,
) -> Result<Option<Projection>, StrError> {
    let mut best: Option<Projection> = None;
    for (index, facet) in surface.facets.iter().enumerate() {
        let mut pad = surface.facet_pad(index, positions);
        if let Some((rs, t)) = intersect_facet(&mut pad, x, d)? {
            if !facet_contains(facet.kind, rs, stol) || f64::abs(t) > srad {
                continue;
            }
            let better = match &best {
                Some(b) => f64::abs(t) < f64::abs(b.t),
                None => true,
            };
            if better {
                best = Some(Projection { facet: index, rs, t });
            }
        }
    }
    Ok(best)
}

/// Projects a point onto the closest point of a surface
///
/// Accepts facets where the closest point lies within the `stol` parametric tolerance and
/// at a distance ≤ srad. Ties go to the facet with the lowest index.
pub fn project_closest(
    surface: &ContactSurface,
    positions: &[[f64; 3]],
    x: [f64; 3],
    stol: f64,
    srad: f64,
) -> Result<Option<Projection>, StrError> {
    let mut best: Option<Projection> = None;
    for (index, facet) in surface.facets.iter().enumerate() {
        let mut pad = surface.facet_pad(index, positions);
        if let Some((rs, dist)) = closest_point(&mut pad, x)? {
            if !facet_contains(facet.kind, rs, stol) || dist > srad {
                continue;
            }
            let better = match &best {
                Some(b) => dist < b.t,
                None => true,
            };
            if better {
                best = Some(Projection { facet: index, rs, t: dist });
            }
        }
    }
    Ok(best)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{closest_point, intersect_facet, project, project_closest};
    use crate::base::{Config, Dof, Essential, SampleMeshes};
    use crate::contact::ContactSurface;
    use crate::fem::{Equations, FemState};
    use gemlab::shapes::{GeoKind, Scratchpad};
    use russell_lab::approx_eq;

    fn pad(kind: GeoKind, xx: &[[f64; 3]]) -> Scratchpad {
        let mut pad = Scratchpad::new(3, kind).unwrap();
        for (m, x) in xx.iter().enumerate() {
            for j in 0..3 {
                pad.set_xx(m, j, x[j]);
            }
        }
        pad
    }

    #[test]
    fn intersect_facet_works() {
        let mut tri = pad(GeoKind::Tri3, &[[0.0, 0.0, 1.0], [2.0, 0.0, 1.0], [0.0, 2.0, 1.0]]);
        let (rs, t) = intersect_facet(&mut tri, [0.5, 0.5, 0.0], [0.0, 0.0, 1.0]).unwrap().unwrap();
        approx_eq(rs[0], 0.25, 1e-15);
        approx_eq(rs[1], 0.25, 1e-15);
        approx_eq(t, 1.0, 1e-15);

        // parallel ray
        assert_eq!(intersect_facet(&mut tri, [0.5, 0.5, 0.0], [1.0, 0.0, 0.0]).unwrap(), None);

        // warped quadrilateral
        let mut qua = pad(
            GeoKind::Qua4,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.2], [0.0, 1.0, 0.0]],
        );
        let (rs, t) = intersect_facet(&mut qua, [0.75, 0.75, 1.0], [0.0, 0.0, -1.0]).unwrap().unwrap();
        approx_eq(rs[0], 0.5, 1e-12);
        approx_eq(rs[1], 0.5, 1e-12);
        approx_eq(t, 1.0 - 0.2 * 0.75 * 0.75, 1e-12);
    }

    #[test]
    fn closest_point_works() {
        let mut qua = pad(
            GeoKind::Qua4,
            &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        );
        let (rs, dist) = closest_point(&mut qua, [1.5, 0.25, 0.3]).unwrap().unwrap();
        approx_eq(rs[0], 0.5, 1e-14);
        approx_eq(rs[1], -0.5, 1e-14);
        approx_eq(dist, 0.3, 1e-14);

        // a point on the edge
        let (rs, dist) = closest_point(&mut qua, [1.0, 0.0, 0.0]).unwrap().unwrap();
        approx_eq(rs[0], 0.0, 1e-14);
        approx_eq(rs[1], -1.0, 1e-14);
        approx_eq(dist, 0.0, 1e-14);
    }

    fn lower_cube_surfaces() -> (ContactSurface, Vec<[f64; 3]>) {
        let (mesh, top, _) = SampleMeshes::two_cubes(0.0);
        // the same facet twice plus a facet on the bottom of the lower cube
        let mut surface = ContactSurface::new(&mesh, &[vec![0, 3, 2, 1], top.clone(), top]).unwrap();
        let mut declared = Vec::new();
        for p in 0..16 {
            for dof in Dof::displacements(3) {
                declared.push((p, *dof));
            }
        }
        let equations = Equations::new(16, &declared, &Essential::new(), 0).unwrap();
        let state = FemState::new(&equations, &Config::new()).unwrap();
        surface.init(&equations).unwrap();
        let xx = surface.positions(&state).unwrap();
        (surface, xx)
    }

    #[test]
    fn project_picks_the_closest_facet() {
        let (surface, xx) = lower_cube_surfaces();

        // from above: the top facet (index 1, the lowest of the duplicates) wins
        let p = project(&surface, &xx, [0.5, 0.5, 1.2], [0.0, 0.0, -1.0], 0.01, 10.0)
            .unwrap()
            .unwrap();
        assert_eq!(p.facet, 1);
        approx_eq(p.t, 0.2, 1e-14);

        // from below: the bottom facet wins
        let p = project(&surface, &xx, [0.5, 0.5, -0.1], [0.0, 0.0, 1.0], 0.01, 10.0)
            .unwrap()
            .unwrap();
        assert_eq!(p.facet, 0);
        approx_eq(p.t, 0.1, 1e-14);

        // search radius
        assert_eq!(
            project(&surface, &xx, [0.5, 0.5, 1.2], [0.0, 0.0, -1.0], 0.01, 0.1).unwrap(),
            None
        );

        // outside the facets
        assert_eq!(
            project(&surface, &xx, [1.5, 0.5, 1.2], [0.0, 0.0, -1.0], 0.01, 10.0).unwrap(),
            None
        );
    }

    #[test]
    fn project_closest_works() {
        let (surface, xx) = lower_cube_surfaces();
        let p = project_closest(&surface, &xx, [0.75, 0.25, 0.9], 0.01, 10.0).unwrap().unwrap();
        assert_eq!(p.facet, 1);
        approx_eq(p.rs[0], 0.5, 1e-14);
        approx_eq(p.rs[1], -0.5, 1e-14);
        approx_eq(p.t, 0.1, 1e-14);
        assert_eq!(project_closest(&surface, &xx, [0.75, 0.25, 0.9], 0.01, 0.05).unwrap(), None);
        assert_eq!(project_closest(&surface, &xx, [1.5, 0.25, 0.5], 0.01, 10.0).unwrap(), None);
    }
}
