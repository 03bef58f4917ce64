use super::projection::{project, project_closest};
use super::surface::dot;
use super::ContactSurface;
use crate::base::{Arena, Handle};
use crate::fem::{EqNumber, FemState, LocalMatrix, LocalVector};
use crate::StrError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Defines the kind of contact
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ContactKind {
    /// The slave nodes are glued to their projections on the master surface (vector gap)
    Tied,

    /// Frictionless sliding contact (scalar normal gap; positive means separation)
    Sliding,
}

/// Holds the parameters of a contact interface
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ContactParams {
    /// Penalty factor ε
    pub epsn: f64,

    /// Augmentation tolerance on the relative change of the multiplier norm (zero disables)
    pub atol: f64,

    /// Parametric tolerance of the projection
    pub stol: f64,

    /// Search radius (maximum distance along the projection ray)
    pub srad: f64,

    /// Minimum number of augmentations
    pub naugmin: usize,

    /// Maximum number of augmentations; the interface then stops augmenting
    pub naugmax: usize,

    /// Treats each surface alternately as slave and master
    pub two_pass: bool,

    /// Enables the augmented Lagrangian method; otherwise, the penalty method is used
    /// and a penalty-dependent gap remains at convergence
    pub laugon: bool,

    /// Augmentation tolerance on the gap norm (zero disables)
    pub gap_tol: f64,
}

impl ContactParams {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        ContactParams {
            epsn: 1.0,
            atol: 0.01,
            stol: 0.01,
            srad: 1.0,
            naugmin: 0,
            naugmax: 10,
            two_pass: false,
            laugon: true,
            gap_tol: 0.0,
        }
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if self.epsn <= 0.0 {
            return Some(format!("epsn = {:?} is incorrect; it must be > 0.0", self.epsn));
        }
        if self.atol < 0.0 {
            return Some(format!("atol = {:?} is incorrect; it must be ≥ 0.0", self.atol));
        }
        if self.stol < 0.0 {
            return Some(format!("stol = {:?} is incorrect; it must be ≥ 0.0", self.stol));
        }
        if self.srad <= 0.0 {
            return Some(format!("srad = {:?} is incorrect; it must be > 0.0", self.srad));
        }
        if self.gap_tol < 0.0 {
            return Some(format!("gap_tol = {:?} is incorrect; it must be ≥ 0.0", self.gap_tol));
        }
        if self.naugmax < self.naugmin {
            return Some(format!(
                "naugmax = {:?} is incorrect; it must be ≥ naugmin = {:?}",
                self.naugmax, self.naugmin
            ));
        }
        None
    }
}

/// Implements a contact interface between two surfaces
///
/// Tied contact (vector gap g = u_s − Σ N_a u_a; traction t = λ + ε g):
///
/// ```text
/// R_s += −A t          K = ε A [     I     −N_b I  ]
/// R_a += A t N_a               [  −N_a I   N_a N_b I ]
/// ```
///
/// Sliding contact (gap g = ν·(x_s − q); traction t_n = min(0, λ + ε g)):
///
/// ```text
/// R_s += −t_n A ν      K = ε A b bᵀ   with b = [ν; −N_a ν]
/// R_a += t_n A N_a ν
/// ```
///
/// The projection point q and the master normal ν are frozen in the linearization.
pub struct ContactInterface {
    /// Kind of contact
    pub kind: ContactKind,

    /// Slave surface
    pub slave: Handle<ContactSurface>,

    /// Master surface
    pub master: Handle<ContactSurface>,

    /// Parameters
    pub params: ContactParams,
}

impl ContactInterface {
    /// Allocates a new instance
    pub fn new(
        kind: ContactKind,
        slave: Handle<ContactSurface>,
        master: Handle<ContactSurface>,
        params: ContactParams,
    ) -> Result<Self, StrError> {
        if slave == master {
            return Err("contact interface requires two distinct surfaces");
        }
        if params.validate().is_some() {
            return Err("cannot allocate contact interface because params.validate() failed");
        }
        Ok(ContactInterface {
            kind,
            slave,
            master,
            params,
        })
    }

    /// Returns the (slave, master) pairs of all passes
    fn passes(&self) -> Vec<(Handle<ContactSurface>, Handle<ContactSurface>)> {
        if self.params.two_pass {
            vec![(self.slave, self.master), (self.master, self.slave)]
        } else {
            vec![(self.slave, self.master)]
        }
    }

    /// Prepares a new time step (tied contact projects the slave nodes once)
    pub fn prep_step(&self, surfaces: &mut Arena<ContactSurface>, state: &FemState) -> Result<(), StrError> {
        if self.kind != ContactKind::Tied {
            return Ok(());
        }
        for (s, m) in self.passes() {
            let (slave, master) = surfaces.pair_mut(s, m)?;
            if slave.projected {
                continue;
            }
            let xs = slave.positions(state)?;
            let xm = master.positions(state)?;
            let normals = slave.node_normals(&xs)?;
            let (stol, srad) = (self.params.stol, self.params.srad);
            for (node, point) in slave.points.iter_mut().enumerate() {
                // along the node normal first; then the closest point (e.g., rays parallel to the master)
                let found = match project(master, &xm, xs[node], normals[node], stol, srad)? {
                    Some(p) => Some(p),
                    None => project_closest(master, &xm, xs[node], stol, srad)?,
                };
                match found {
                    Some(p) => {
                        point.facet = Some(p.facet);
                        point.rs = p.rs;
                        point.active = true;
                    }
                    None => point.clear(),
                }
            }
            slave.projected = true;
            log::info!(
                "tied contact: {} of {} slave nodes projected",
                slave.points.iter().filter(|p| p.active).count(),
                slave.points.len()
            );
        }
        Ok(())
    }

    /// Updates projections, gaps, and the active set for the given state
    pub fn update(&self, surfaces: &mut Arena<ContactSurface>, state: &FemState) -> Result<(), StrError> {
        for (s, m) in self.passes() {
            let (slave, master) = surfaces.pair_mut(s, m)?;
            match self.kind {
                ContactKind::Tied => {
                    let mut gaps = Vec::with_capacity(slave.points.len());
                    for point in &slave.points {
                        gaps.push(match point.facet {
                            Some(facet) => Some(tied_gap(slave, master, point.node, facet, point.rs, state)?),
                            None => None,
                        });
                    }
                    for (point, gap) in slave.points.iter_mut().zip(gaps) {
                        if let Some(g) = gap {
                            point.gap_vec = g;
                        }
                    }
                }
                ContactKind::Sliding => {
                    let xs = slave.positions(state)?;
                    let xm = master.positions(state)?;
                    let normals = slave.node_normals(&xs)?;
                    let eps = self.params.epsn;
                    for (node, point) in slave.points.iter_mut().enumerate() {
                        match project(master, &xm, xs[node], normals[node], self.params.stol, self.params.srad)? {
                            Some(p) => {
                                let fp = master.facet_point(p.facet, &xm, p.rs)?;
                                let (q, nu) = (fp.x, fp.normal);
                                let x = xs[node];
                                point.facet = Some(p.facet);
                                point.rs = p.rs;
                                point.normal = nu;
                                point.gap = dot(nu, [x[0] - q[0], x[1] - q[1], x[2] - q[2]]);
                                point.active = point.lm + eps * point.gap < 0.0;
                            }
                            None => point.clear(),
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Calculates the contributions to the residual R = F_ext − F_int
    pub fn residual(&self, surfaces: &Arena<ContactSurface>, _state: &FemState) -> Result<Vec<LocalVector>, StrError> {
        let eps = self.params.epsn;
        let mut blocks = Vec::new();
        for (s, m) in self.passes() {
            let (slave, master) = (surfaces.get(s), surfaces.get(m));
            let pass: Vec<Option<LocalVector>> = slave
                .points
                .par_iter()
                .map(|point| {
                    let facet = match (point.active, point.facet) {
                        (true, Some(facet)) => facet,
                        _ => return None,
                    };
                    let (eqs, nn) = point_eqs(slave, master, point.node, facet, point.rs);
                    let mut local = LocalVector::new(eqs);
                    let a = point.area;
                    let t = match self.kind {
                        ContactKind::Tied => [
                            point.lm_vec[0] + eps * point.gap_vec[0],
                            point.lm_vec[1] + eps * point.gap_vec[1],
                            point.lm_vec[2] + eps * point.gap_vec[2],
                        ],
                        ContactKind::Sliding => {
                            let tn = f64::min(0.0, point.lm + eps * point.gap);
                            [tn * point.normal[0], tn * point.normal[1], tn * point.normal[2]]
                        }
                    };
                    for i in 0..3 {
                        local.ff[i] = -a * t[i];
                        for (k, n) in nn.iter().enumerate() {
                            local.ff[3 + 3 * k + i] = a * t[i] * n;
                        }
                    }
                    Some(local)
                })
                .collect();
            blocks.extend(pass.into_iter().flatten());
        }
        Ok(blocks)
    }

    /// Calculates the contributions to the stiffness K = −∂R/∂U
    pub fn stiffness(&self, surfaces: &Arena<ContactSurface>, _state: &FemState) -> Result<Vec<LocalMatrix>, StrError> {
        let eps = self.params.epsn;
        let mut blocks = Vec::new();
        for (s, m) in self.passes() {
            let (slave, master) = (surfaces.get(s), surfaces.get(m));
            let pass: Vec<Option<LocalMatrix>> = slave
                .points
                .par_iter()
                .map(|point| {
                    let facet = match (point.active, point.facet) {
                        (true, Some(facet)) => facet,
                        _ => return None,
                    };
                    let (eqs, nn) = point_eqs(slave, master, point.node, facet, point.rs);
                    let mut local = LocalMatrix::new(eqs);
                    let c = eps * point.area;
                    // weights of the slave node (1) and master nodes (−N_a)
                    let mut w = vec![1.0];
                    w.extend(nn.iter().map(|n| -n));
                    for (p, wp) in w.iter().enumerate() {
                        for (q, wq) in w.iter().enumerate() {
                            for i in 0..3 {
                                for j in 0..3 {
                                    let v = match self.kind {
                                        ContactKind::Tied => {
                                            if i == j {
                                                c * wp * wq
                                            } else {
                                                0.0
                                            }
                                        }
                                        ContactKind::Sliding => c * wp * wq * point.normal[i] * point.normal[j],
                                    };
                                    local.kk.set(3 * p + i, 3 * q + j, v);
                                }
                            }
                        }
                    }
                    Some(local)
                })
                .collect();
            blocks.extend(pass.into_iter().flatten());
        }
        Ok(blocks)
    }

    /// Performs an augmentation of the Lagrange multipliers
    ///
    /// Returns true if the augmentation has converged (the multipliers are kept).
    pub fn augment(&self, surfaces: &mut Arena<ContactSurface>, naug: usize) -> Result<bool, StrError> {
        if !self.params.laugon {
            return Ok(true);
        }
        let eps = self.params.epsn;

        // norms of the multipliers before and after the update, and of the gaps
        let (mut norm_lm0, mut norm_lm1, mut norm_gap) = (0.0, 0.0, 0.0);
        for (s, _) in self.passes() {
            for point in surfaces.get(s).points.iter().filter(|p| p.facet.is_some()) {
                match self.kind {
                    ContactKind::Tied => {
                        for i in 0..3 {
                            let lm1 = point.lm_vec[i] + eps * point.gap_vec[i];
                            norm_lm0 += point.lm_vec[i] * point.lm_vec[i];
                            norm_lm1 += lm1 * lm1;
                            norm_gap += point.gap_vec[i] * point.gap_vec[i];
                        }
                    }
                    ContactKind::Sliding => {
                        let lm1 = f64::min(0.0, point.lm + eps * point.gap);
                        norm_lm0 += point.lm * point.lm;
                        norm_lm1 += lm1 * lm1;
                        if point.active {
                            norm_gap += point.gap * point.gap;
                        }
                    }
                }
            }
        }
        let (norm_lm0, norm_lm1, norm_gap) = (f64::sqrt(norm_lm0), f64::sqrt(norm_lm1), f64::sqrt(norm_gap));
        let pct = if norm_lm1 > 0.0 {
            f64::abs((norm_lm1 - norm_lm0) / norm_lm1)
        } else {
            0.0
        };

        let mut converged = true;
        if self.params.atol > 0.0 && pct >= self.params.atol {
            converged = false;
        }
        if self.params.gap_tol > 0.0 && norm_gap > self.params.gap_tol {
            converged = false;
        }
        if naug < self.params.naugmin {
            converged = false;
        }
        if naug >= self.params.naugmax {
            if !converged {
                log::warn!("contact augmentation stopped after {} augmentations", naug);
            }
            converged = true;
        }
        log::info!(
            "contact augmentation {}: pct = {:e} (tol = {:e}), gap norm = {:e}",
            naug,
            pct,
            self.params.atol,
            norm_gap
        );

        // update the multipliers
        if !converged {
            for (s, _) in self.passes() {
                for point in surfaces.get_mut(s).points.iter_mut().filter(|p| p.facet.is_some()) {
                    match self.kind {
                        ContactKind::Tied => {
                            for i in 0..3 {
                                point.lm_vec[i] += eps * point.gap_vec[i];
                            }
                        }
                        ContactKind::Sliding => {
                            point.lm = f64::min(0.0, point.lm + eps * point.gap);
                            point.active = point.lm + eps * point.gap < 0.0;
                        }
                    }
                }
            }
        }
        Ok(converged)
    }
}

/// Computes the tied gap g = u_s − Σ N_a u_a
fn tied_gap(
    slave: &ContactSurface,
    master: &ContactSurface,
    node: usize,
    facet: usize,
    rs: [f64; 2],
    state: &FemState,
) -> Result<[f64; 3], StrError> {
    let mut g = slave.displacement(node, state)?;
    let nn = master.facet_interp(facet, rs);
    for (k, m) in master.facets[facet].nodes.iter().enumerate() {
        let u = master.displacement(*m, state)?;
        for i in 0..3 {
            g[i] -= nn[k] * u[i];
        }
    }
    Ok(g)
}

/// Returns the equation numbers (slave node then master facet nodes) and the master shape functions
fn point_eqs(
    slave: &ContactSurface,
    master: &ContactSurface,
    node: usize,
    facet: usize,
    rs: [f64; 2],
) -> (Vec<EqNumber>, Vec<f64>) {
    let nn = master.facet_interp(facet, rs);
    let mut eqs = slave.node_eqs(node).to_vec();
    for m in &master.facets[facet].nodes {
        eqs.extend_from_slice(master.node_eqs(*m));
    }
    (eqs, nn)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
