use crate::base::Dof;
use crate::fem::{gather, EqNumber, Equations, FemState};
use crate::StrError;
use gemlab::integ;
use gemlab::mesh::{Mesh, PointId};
use gemlab::shapes::{GeoClass, GeoKind, Scratchpad};
use russell_lab::Vector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Holds a facet of a contact surface
#[derive(Clone, Debug)]
pub struct Facet {
    /// Shape of the facet (Tri3 or Qua4)
    pub kind: GeoKind,

    /// Local indices (into the surface nodes) of the facet nodes, counter-clockwise
    /// when seen from the outside
    pub nodes: Vec<usize>,
}

/// Holds the contact state of one (nodal) integration point of a slave surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactPoint {
    /// Local index of the node
    pub node: usize,

    /// Lumped (tributary) area
    pub area: f64,

    /// Master facet onto which the point projects
    pub facet: Option<usize>,

    /// Reference coordinates of the projection on the master facet
    pub rs: [f64; 2],

    /// Scalar gap of sliding contact (positive means separation)
    pub gap: f64,

    /// Vector gap of tied contact
    pub gap_vec: [f64; 3],

    /// Master normal at the projection (sliding contact)
    pub normal: [f64; 3],

    /// Lagrange multiplier of sliding contact
    pub lm: f64,

    /// Lagrange multiplier of tied contact
    pub lm_vec: [f64; 3],

    /// Indicates that the point transmits tractions
    pub active: bool,
}

impl ContactPoint {
    /// Removes the projection and deactivates the point
    pub fn clear(&mut self) {
        self.facet = None;
        self.rs = [0.0, 0.0];
        self.gap = 0.0;
        self.gap_vec = [0.0; 3];
        self.normal = [0.0; 3];
        self.lm = 0.0;
        self.lm_vec = [0.0; 3];
        self.active = false;
    }
}

/// Holds the history of a surface (for checkpoints)
#[derive(Serialize, Deserialize)]
struct SurfaceHistory {
    points: Vec<ContactPoint>,
    projected: bool,
}

/// Holds the geometry of a facet at a point ξ = (r,s)
#[derive(Clone, Debug)]
pub struct FacetPoint {
    /// Position x(ξ)
    pub x: [f64; 3],

    /// Unit normal (pointing outwards)
    pub normal: [f64; 3],

    /// Tangent vectors ∂x/∂r and ∂x/∂s
    pub tangents: [[f64; 3]; 2],

    /// Area scale |∂x/∂r × ∂x/∂s|
    pub area_scale: f64,

    /// Shape functions N(ξ)
    pub interp: Vec<f64>,
}

/// Calculates the geometry of a facet at ξ; the coordinates of the pad must be set
pub(crate) fn calc_facet_point(pad: &mut Scratchpad, rs: [f64; 2]) -> Result<FacetPoint, StrError> {
    let mut un = Vector::new(3);
    let mut x = Vector::new(3);
    let area_scale = pad.calc_normal_vector(&mut un, &rs)?;
    pad.calc_coords(&mut x, &rs)?;
    let jj = &pad.jacobian;
    Ok(FacetPoint {
        x: [x[0], x[1], x[2]],
        normal: [un[0], un[1], un[2]],
        tangents: [
            [jj.get(0, 0), jj.get(1, 0), jj.get(2, 0)],
            [jj.get(0, 1), jj.get(1, 1), jj.get(2, 1)],
        ],
        area_scale,
        interp: pad.interp.as_data().to_vec(),
    })
}

/// Tells whether ξ = (r,s) lies within a facet enlarged by the tolerance `stol`
pub fn facet_contains(kind: GeoKind, rs: [f64; 2], stol: f64) -> bool {
    let [r, s] = rs;
    match kind.class() {
        GeoClass::Tri => r >= -stol && s >= -stol && r + s <= 1.0 + stol,
        _ => f64::abs(r) <= 1.0 + stol && f64::abs(s) <= 1.0 + stol,
    }
}

/// Returns the reference coordinates of the centre of a facet
pub fn facet_centre(kind: GeoKind) -> [f64; 2] {
    match kind.class() {
        GeoClass::Tri => [1.0 / 3.0, 1.0 / 3.0],
        _ => [0.0, 0.0],
    }
}

/// Implements a contact surface made of Tri3 or Qua4 facets
///
/// The surface is integrated with nodal quadrature: each node is a contact point
/// carrying its tributary area ∫ Nᵐ dA.
pub struct ContactSurface {
    /// Mesh points of the surface (sorted)
    pub nodes: Vec<PointId>,

    /// Facets with local node indices
    pub facets: Vec<Facet>,

    /// Contact points (one per node; same order as `nodes`)
    pub points: Vec<ContactPoint>,

    /// Indicates that the (tied) projection has been performed
    pub projected: bool,

    /// Reference coordinates of the nodes
    coords: Vec<[f64; 3]>,

    /// Scratchpads of the facets
    pads: Vec<Scratchpad>,

    /// Equation numbers of the displacements of each node
    eqs: Vec<Vec<EqNumber>>,
}

impl ContactSurface {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `mesh` -- a 3D mesh
    /// * `facets` -- lists of 3 (Tri3) or 4 (Qua4) points ordered counter-clockwise
    ///   when seen from the outside (the normal points outwards)
    pub fn new(mesh: &Mesh, facets: &[Vec<PointId>]) -> Result<Self, StrError> {
        if mesh.ndim != 3 {
            return Err("ContactSurface requires a 3D mesh");
        }
        if facets.is_empty() {
            return Err("ContactSurface requires at least one facet");
        }

        // unique nodes
        let mut nodes: Vec<PointId> = Vec::new();
        for facet in facets {
            if facet.len() != 3 && facet.len() != 4 {
                return Err("a facet must have 3 (Tri3) or 4 (Qua4) points");
            }
            for p in facet {
                if *p >= mesh.points.len() {
                    return Err("facet refers to a point outside the mesh");
                }
                nodes.push(*p);
            }
        }
        nodes.sort();
        nodes.dedup();
        let local: HashMap<PointId, usize> = nodes.iter().enumerate().map(|(i, p)| (*p, i)).collect();
        let coords: Vec<[f64; 3]> = nodes
            .iter()
            .map(|p| {
                let x = &mesh.points[*p].coords;
                [x[0], x[1], x[2]]
            })
            .collect();

        // facets with local indices and their scratchpads
        let mut list = Vec::with_capacity(facets.len());
        let mut pads = Vec::with_capacity(facets.len());
        for f in facets {
            let kind = if f.len() == 3 { GeoKind::Tri3 } else { GeoKind::Qua4 };
            let nodes: Vec<usize> = f.iter().map(|p| local[p]).collect();
            let mut pad = Scratchpad::new(3, kind)?;
            for (m, node) in nodes.iter().enumerate() {
                for j in 0..3 {
                    pad.set_xx(m, j, coords[*node][j]);
                }
            }
            list.push(Facet { kind, nodes });
            pads.push(pad);
        }

        // tributary areas
        let mut areas = vec![0.0; nodes.len()];
        for (facet, pad) in list.iter().zip(pads.iter_mut()) {
            let mut area = 0.0;
            let mut shares = vec![0.0; facet.nodes.len()];
            for iota in integ::default_points(facet.kind) {
                let p = calc_facet_point(pad, [iota[0], iota[1]])?;
                let c = p.area_scale * iota[3];
                area += c;
                for m in 0..shares.len() {
                    shares[m] += c * p.interp[m];
                }
            }
            if area <= 0.0 {
                return Err("found a degenerate facet with zero area");
            }
            for (m, node) in facet.nodes.iter().enumerate() {
                areas[*node] += shares[m];
            }
        }

        let points = areas
            .iter()
            .enumerate()
            .map(|(node, area)| ContactPoint {
                node,
                area: *area,
                facet: None,
                rs: [0.0, 0.0],
                gap: 0.0,
                gap_vec: [0.0; 3],
                normal: [0.0; 3],
                lm: 0.0,
                lm_vec: [0.0; 3],
                active: false,
            })
            .collect();
        let nnode = nodes.len();
        Ok(ContactSurface {
            nodes,
            facets: list,
            points,
            projected: false,
            coords,
            pads,
            eqs: vec![Vec::new(); nnode],
        })
    }

    /// Returns the total area (sum of lumped areas)
    pub fn area(&self) -> f64 {
        self.points.iter().map(|p| p.area).sum()
    }

    /// Caches the equation numbers of the node displacements
    pub fn init(&mut self, equations: &Equations) -> Result<(), StrError> {
        let dofs = Dof::displacements(3);
        for (i, p) in self.nodes.iter().enumerate() {
            self.eqs[i] = equations
                .local_eqs(&[*p], dofs)
                .map_err(|_| "contact surface nodes must have displacement DOFs")?;
        }
        Ok(())
    }

    /// Returns the equation numbers of the displacements of a node (local index)
    pub fn node_eqs(&self, node: usize) -> &[EqNumber] {
        &self.eqs[node]
    }

    /// Returns the displacement of a node (local index)
    pub fn displacement(&self, node: usize, state: &FemState) -> Result<[f64; 3], StrError> {
        if self.eqs[node].is_empty() {
            return Err("ContactSurface is not initialized");
        }
        let u = gather(&state.uu, &self.eqs[node]);
        Ok([u[0], u[1], u[2]])
    }

    /// Returns the current positions x = X + u of all nodes
    pub fn positions(&self, state: &FemState) -> Result<Vec<[f64; 3]>, StrError> {
        let mut xx = Vec::with_capacity(self.nodes.len());
        for (node, x) in self.coords.iter().enumerate() {
            let u = self.displacement(node, state)?;
            xx.push([x[0] + u[0], x[1] + u[1], x[2] + u[2]]);
        }
        Ok(xx)
    }

    /// Returns a scratchpad of a facet with the coordinates set to the given positions
    pub fn facet_pad(&self, facet: usize, positions: &[[f64; 3]]) -> Scratchpad {
        let mut pad = self.pads[facet].clone();
        for (m, node) in self.facets[facet].nodes.iter().enumerate() {
            for j in 0..3 {
                pad.set_xx(m, j, positions[*node][j]);
            }
        }
        pad
    }

    /// Returns the geometry at ξ = (r,s) of a facet in the given configuration
    pub fn facet_point(&self, facet: usize, positions: &[[f64; 3]], rs: [f64; 2]) -> Result<FacetPoint, StrError> {
        let mut pad = self.facet_pad(facet, positions);
        calc_facet_point(&mut pad, rs)
    }

    /// Returns the shape functions of a facet at ξ = (r,s)
    pub fn facet_interp(&self, facet: usize, rs: [f64; 2]) -> Vec<f64> {
        let pad = &self.pads[facet];
        let mut nn = Vector::new(pad.kind.nnode());
        (pad.fn_interp)(&mut nn, &rs);
        nn.as_data().to_vec()
    }

    /// Returns the unit normals at the nodes (average of the normals of the adjacent facets)
    pub fn node_normals(&self, positions: &[[f64; 3]]) -> Result<Vec<[f64; 3]>, StrError> {
        let mut normals = vec![[0.0; 3]; self.nodes.len()];
        for (index, facet) in self.facets.iter().enumerate() {
            let mut pad = self.facet_pad(index, positions);
            for (m, node) in facet.nodes.iter().enumerate() {
                let ksi = facet.kind.reference_coords(m);
                let p = calc_facet_point(&mut pad, [ksi[0], ksi[1]])?;
                for i in 0..3 {
                    normals[*node][i] += p.normal[i];
                }
            }
        }
        Ok(normals.iter().map(|n| unit(*n)).collect())
    }

    /// Returns the history for checkpoints
    pub fn history(&self) -> Result<Value, StrError> {
        let history = SurfaceHistory {
            points: self.points.clone(),
            projected: self.projected,
        };
        serde_json::to_value(&history).map_err(|_| "cannot serialize the history of ContactSurface")
    }

    /// Restores the history from a checkpoint
    pub fn set_history(&mut self, history: &Value) -> Result<(), StrError> {
        let history: SurfaceHistory = serde_json::from_value(history.clone())
            .map_err(|_| "cannot deserialize the history of ContactSurface")?;
        if history.points.len() != self.points.len() {
            return Err("history of ContactSurface is incompatible with the surface");
        }
        self.points = history.points;
        self.projected = history.projected;
        Ok(())
    }
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn norm(a: [f64; 3]) -> f64 {
    f64::sqrt(dot(a, a))
}

pub(crate) fn unit(a: [f64; 3]) -> [f64; 3] {
    let n = norm(a);
    if n > 0.0 {
        [a[0] / n, a[1] / n, a[2] / n]
    } else {
        a
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
