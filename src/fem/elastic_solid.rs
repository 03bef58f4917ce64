use super::{gather, Domain, EqNumber, Equations, FemState, LocalMatrix, LocalVector};
use crate::base::{Dof, Physics};
use crate::StrError;
use gemlab::integ;
use gemlab::mesh::{CellAttribute, CellId, Mesh, PointId};
use gemlab::shapes::Scratchpad;
use rayon::prelude::*;
use russell_lab::{Matrix, Vector};
use russell_tensor::{LinElasticity, Tensor2};
use serde_json::Value;

/// Holds the (geometry-dependent) data of one element
struct SolidElement {
    /// Index of the cell in the mesh
    cell: CellId,

    /// Point ids of the cell
    points: Vec<PointId>,

    /// Shape functions and coordinates of the cell
    pad: Scratchpad,

    /// Integration points
    ips: integ::IntegPointData,

    /// Local equation numbers (available after init)
    eqs: Vec<EqNumber>,

    /// Element stiffness matrix (nnode·ndim × nnode·ndim)
    kk: Matrix,
}

/// Implements a domain of small-strain linear-elastic solid cells
///
/// Any solid cell kind of gemlab is accepted (e.g., Hex8 or Tet4 in 3D; Qua4 or Tri3 in 2D,
/// with plane-strain conditions). Stresses at the integration points are stored as Mandel
/// vectors and make up the history of the domain.
pub struct ElasticSolid {
    ndim: usize,
    elements: Vec<SolidElement>,
    model: LinElasticity,
    stresses: Vec<Vec<Vec<f64>>>,
}

/// Calculates the small strain ε = sym(∇u) from the nodal displacements and the gradient B
fn calc_strain(eps: &mut Tensor2, uu: &Vector, bb: &Matrix, ndim: usize) {
    let nnode = bb.dims().0;
    for i in 0..ndim {
        for j in i..ndim {
            let mut v = 0.0;
            for m in 0..nnode {
                v += uu[m * ndim + i] * bb.get(m, j) + uu[m * ndim + j] * bb.get(m, i);
            }
            eps.sym_set(i, j, v / 2.0);
        }
    }
}

impl ElasticSolid {
    /// Allocates a new instance with all cells of the mesh carrying `attribute`
    ///
    /// # Input
    ///
    /// * `mesh` -- the mesh (2D means plane-strain)
    /// * `attribute` -- the attribute of the cells in this domain
    /// * `young` -- Young's modulus
    /// * `poisson` -- Poisson's coefficient
    pub fn new(mesh: &Mesh, attribute: CellAttribute, young: f64, poisson: f64) -> Result<Self, StrError> {
        if young <= 0.0 {
            return Err("Young's modulus must be > 0.0");
        }
        if poisson < 0.0 || poisson >= 0.5 {
            return Err("Poisson's coefficient must be 0.0 ≤ ν < 0.5");
        }
        let ndim = mesh.ndim;
        let model = LinElasticity::new(young, poisson, ndim == 2, false);

        let mut elements = Vec::new();
        for cell in mesh.cells.iter().filter(|c| c.attribute == attribute) {
            if cell.kind.ndim() != ndim {
                return Err("ElasticSolid requires solid cells with the same dimension as the mesh");
            }
            if cell.points.iter().any(|p| *p >= mesh.points.len()) {
                return Err("cell refers to a point outside the mesh");
            }
            let mut pad = Scratchpad::new(ndim, cell.kind)?;
            mesh.set_pad(&mut pad, &cell.points);
            let ips = integ::default_points(cell.kind);
            for iota in ips {
                if pad.calc_jacobian(iota)? <= 0.0 {
                    return Err("found non-positive Jacobian determinant in cell");
                }
            }
            let n = cell.points.len() * ndim;
            let mut kk = Matrix::new(n, n);
            let mut args = integ::CommonArgs::new(&mut pad, ips);
            integ::mat_10_bdb(&mut kk, &mut args, |dd, _, _, _| {
                dd.set_tensor(1.0, model.get_modulus());
                Ok(())
            })?;
            elements.push(SolidElement {
                cell: cell.id,
                points: cell.points.clone(),
                pad,
                ips,
                eqs: Vec::new(),
                kk,
            });
        }
        if elements.is_empty() {
            return Err("there are no cells with the given attribute");
        }

        let stresses = elements
            .iter()
            .map(|e| vec![vec![0.0; 2 * ndim]; e.ips.len()])
            .collect();
        Ok(ElasticSolid {
            ndim,
            elements,
            model,
            stresses,
        })
    }

    /// Returns the ids of the cells in this domain
    pub fn cells(&self) -> Vec<CellId> {
        self.elements.iter().map(|e| e.cell).collect()
    }

    /// Returns the stresses (Mandel components) at the integration points of the e-th element
    pub fn stresses(&self, e: usize) -> &[Vec<f64>] {
        &self.stresses[e]
    }

    fn check_initialized(&self) -> Result<(), StrError> {
        match self.elements.first() {
            Some(e) if e.eqs.is_empty() => Err("ElasticSolid domain is not initialized"),
            _ => Ok(()),
        }
    }
}

impl Domain for ElasticSolid {
    fn physics(&self) -> Physics {
        Physics::Structural
    }

    fn points(&self) -> Vec<PointId> {
        self.elements.iter().flat_map(|e| e.points.iter().copied()).collect()
    }

    fn init(&mut self, equations: &Equations) -> Result<(), StrError> {
        let dofs = Dof::displacements(self.ndim);
        for e in &mut self.elements {
            e.eqs = equations.local_eqs(&e.points, dofs)?;
        }
        Ok(())
    }

    /// Integrates R_e = −∫ σ(u)·B dΩ
    fn residual(&self, state: &FemState) -> Result<Vec<LocalVector>, StrError> {
        self.check_initialized()?;
        let ndim = self.ndim;
        let model = &self.model;
        self.elements
            .par_iter()
            .map(|e| {
                let uu = gather(&state.uu, &e.eqs);
                let mut local = LocalVector::new(e.eqs.clone());
                let mut pad = e.pad.clone();
                let mut eps = Tensor2::new_sym_ndim(ndim);
                let mut args = integ::CommonArgs::new(&mut pad, e.ips);
                args.alpha = -1.0;
                integ::vec_04_tb(&mut local.ff, &mut args, |sig, _, _, bb| {
                    calc_strain(&mut eps, &uu, bb, ndim);
                    model.calc_stress(sig, &eps);
                    Ok(())
                })?;
                Ok(local)
            })
            .collect()
    }

    fn stiffness(&self, _state: &FemState) -> Result<Vec<LocalMatrix>, StrError> {
        self.check_initialized()?;
        let blocks = self
            .elements
            .par_iter()
            .map(|e| LocalMatrix {
                eqs: e.eqs.clone(),
                kk: e.kk.clone(),
            })
            .collect();
        Ok(blocks)
    }

    fn update(&mut self, state: &FemState) -> Result<(), StrError> {
        self.check_initialized()?;
        let ndim = self.ndim;
        let model = &self.model;
        self.stresses
            .par_iter_mut()
            .zip(self.elements.par_iter())
            .try_for_each(|(sig_e, e)| -> Result<(), StrError> {
                let uu = gather(&state.uu, &e.eqs);
                let mut pad = e.pad.clone();
                let mut eps = Tensor2::new_sym_ndim(ndim);
                let mut sig = Tensor2::new_sym_ndim(ndim);
                for (p, iota) in e.ips.iter().enumerate() {
                    pad.calc_gradient(iota)?;
                    calc_strain(&mut eps, &uu, &pad.gradient, ndim);
                    model.calc_stress(&mut sig, &eps);
                    sig_e[p] = sig.vector().as_data().to_vec();
                }
                Ok(())
            })
    }

    fn history(&self) -> Result<Value, StrError> {
        serde_json::to_value(&self.stresses).map_err(|_| "cannot serialize the history of ElasticSolid")
    }

    fn set_history(&mut self, history: &Value) -> Result<(), StrError> {
        let stresses: Vec<Vec<Vec<f64>>> =
            serde_json::from_value(history.clone()).map_err(|_| "cannot deserialize the history of ElasticSolid")?;
        if stresses.len() != self.elements.len() {
            return Err("history of ElasticSolid is incompatible with the domain");
        }
        self.stresses = stresses;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
