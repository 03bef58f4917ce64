use super::{gather, Domain, EqNumber, Equations, FemState, LocalMatrix, LocalVector};
use crate::base::{Dof, Physics};
use crate::StrError;
use gemlab::mesh::PointId;
use serde_json::Value;

/// Holds the data of a two-node discrete element
#[derive(Clone, Debug)]
struct Link {
    /// First point
    a: PointId,

    /// Second point
    b: PointId,

    /// Local equation numbers (available after init)
    eqs: Vec<EqNumber>,
}

/// Implements a domain of nonlinear axial springs
///
/// Each spring connects two points along a fixed unit direction n. With the elongation
/// `e = n·(u_b − u_a)`, the axial force is `f = k·e + k3·e³`.
pub struct NonlinearSprings {
    ndim: usize,
    links: Vec<Link>,
    directions: Vec<Vec<f64>>,
    k: f64,
    k3: f64,

    /// Axial force of each spring (history)
    forces: Vec<f64>,
}

impl NonlinearSprings {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `ndim` -- space dimension (2 or 3)
    /// * `connections` -- pairs of points
    /// * `direction` -- direction of the springs (normalized here)
    /// * `k` -- linear stiffness
    /// * `k3` -- cubic stiffness
    pub fn new(
        ndim: usize,
        connections: &[(PointId, PointId)],
        direction: &[f64],
        k: f64,
        k3: f64,
    ) -> Result<Self, StrError> {
        if ndim != 2 && ndim != 3 {
            return Err("ndim must be 2 or 3");
        }
        if direction.len() != ndim {
            return Err("direction must have ndim components");
        }
        let norm = f64::sqrt(direction.iter().map(|x| x * x).sum());
        if norm <= f64::EPSILON {
            return Err("direction must not be the zero vector");
        }
        let n: Vec<f64> = direction.iter().map(|x| x / norm).collect();
        let links: Vec<_> = connections
            .iter()
            .map(|(a, b)| Link {
                a: *a,
                b: *b,
                eqs: Vec::new(),
            })
            .collect();
        let directions = vec![n; links.len()];
        let forces = vec![0.0; links.len()];
        Ok(NonlinearSprings {
            ndim,
            links,
            directions,
            k,
            k3,
            forces,
        })
    }

    /// Returns the axial force of each spring (as of the last update)
    pub fn forces(&self) -> &[f64] {
        &self.forces
    }

    /// Returns the elongation of a spring
    fn elongation(&self, i: usize, state: &FemState) -> f64 {
        let uu = gather(&state.uu, &self.links[i].eqs);
        let n = &self.directions[i];
        (0..self.ndim).map(|d| n[d] * (uu[self.ndim + d] - uu[d])).sum()
    }
}

impl Domain for NonlinearSprings {
    fn physics(&self) -> Physics {
        Physics::Structural
    }

    fn points(&self) -> Vec<PointId> {
        self.links.iter().flat_map(|l| [l.a, l.b]).collect()
    }

    fn init(&mut self, equations: &Equations) -> Result<(), StrError> {
        let dofs = Dof::displacements(self.ndim);
        for link in &mut self.links {
            link.eqs = equations.local_eqs(&[link.a, link.b], dofs)?;
        }
        Ok(())
    }

    fn residual(&self, state: &FemState) -> Result<Vec<LocalVector>, StrError> {
        let mut blocks = Vec::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            let e = self.elongation(i, state);
            let f = self.k * e + self.k3 * e * e * e;
            let n = &self.directions[i];
            let mut local = LocalVector::new(link.eqs.clone());
            for d in 0..self.ndim {
                local.ff[d] = f * n[d];
                local.ff[self.ndim + d] = -f * n[d];
            }
            blocks.push(local);
        }
        Ok(blocks)
    }

    fn stiffness(&self, state: &FemState) -> Result<Vec<LocalMatrix>, StrError> {
        let mut blocks = Vec::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            let e = self.elongation(i, state);
            let kt = self.k + 3.0 * self.k3 * e * e;
            let n = &self.directions[i];
            let mut local = LocalMatrix::new(link.eqs.clone());
            for r in 0..self.ndim {
                for c in 0..self.ndim {
                    let v = kt * n[r] * n[c];
                    local.kk.set(r, c, v);
                    local.kk.set(r, self.ndim + c, -v);
                    local.kk.set(self.ndim + r, c, -v);
                    local.kk.set(self.ndim + r, self.ndim + c, v);
                }
            }
            blocks.push(local);
        }
        Ok(blocks)
    }

    fn update(&mut self, state: &FemState) -> Result<(), StrError> {
        for i in 0..self.links.len() {
            let e = self.elongation(i, state);
            self.forces[i] = self.k * e + self.k3 * e * e * e;
        }
        Ok(())
    }

    fn history(&self) -> Result<Value, StrError> {
        serde_json::to_value(&self.forces).map_err(|_| "cannot serialize the history of NonlinearSprings")
    }

    fn set_history(&mut self, history: &Value) -> Result<(), StrError> {
        let forces: Vec<f64> = serde_json::from_value(history.clone())
            .map_err(|_| "cannot deserialize the history of NonlinearSprings")?;
        if forces.len() != self.links.len() {
            return Err("history of NonlinearSprings is incompatible with the domain");
        }
        self.forces = forces;
        Ok(())
    }
}

/// Implements a domain of nonlinear thermal conduction links
///
/// With `ΔT = T_a − T_b`, the heat flow from a to b is `q = κ·(ΔT + β·ΔT³)`.
/// An optional heat capacity `c` is lumped at the ends of each link (c/2 per end).
pub struct ConductionLinks {
    links: Vec<Link>,
    kappa: f64,
    beta: f64,
    capacity: f64,

    /// Heat flow of each link (history)
    flows: Vec<f64>,
}

impl ConductionLinks {
    /// Allocates a new instance
    pub fn new(connections: &[(PointId, PointId)], kappa: f64, beta: f64) -> Result<Self, StrError> {
        if kappa <= 0.0 {
            return Err("conductance must be > 0.0");
        }
        if beta < 0.0 {
            return Err("nonlinear coefficient must be ≥ 0.0");
        }
        let links: Vec<_> = connections
            .iter()
            .map(|(a, b)| Link {
                a: *a,
                b: *b,
                eqs: Vec::new(),
            })
            .collect();
        let flows = vec![0.0; links.len()];
        Ok(ConductionLinks {
            links,
            kappa,
            beta,
            capacity: 0.0,
            flows,
        })
    }

    /// Sets the heat capacity of each link for transient analyses
    pub fn set_capacity(&mut self, capacity: f64) -> Result<&mut Self, StrError> {
        if capacity < 0.0 {
            return Err("heat capacity must be ≥ 0.0");
        }
        self.capacity = capacity;
        Ok(self)
    }

    /// Returns the heat flow of each link (as of the last update)
    pub fn flows(&self) -> &[f64] {
        &self.flows
    }

    fn delta_t(&self, i: usize, state: &FemState) -> f64 {
        let tt = gather(&state.uu, &self.links[i].eqs);
        tt[0] - tt[1]
    }
}

impl Domain for ConductionLinks {
    fn physics(&self) -> Physics {
        Physics::Thermal
    }

    fn points(&self) -> Vec<PointId> {
        self.links.iter().flat_map(|l| [l.a, l.b]).collect()
    }

    fn init(&mut self, equations: &Equations) -> Result<(), StrError> {
        for link in &mut self.links {
            link.eqs = equations.local_eqs(&[link.a, link.b], &[Dof::T])?;
        }
        Ok(())
    }

    fn residual(&self, state: &FemState) -> Result<Vec<LocalVector>, StrError> {
        let mut blocks = Vec::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            let dt = self.delta_t(i, state);
            let q = self.kappa * (dt + self.beta * dt * dt * dt);
            let vv = gather(&state.vv, &link.eqs);
            let mut local = LocalVector::new(link.eqs.clone());
            local.ff[0] = -q - 0.5 * self.capacity * vv[0];
            local.ff[1] = q - 0.5 * self.capacity * vv[1];
            blocks.push(local);
        }
        Ok(blocks)
    }

    fn stiffness(&self, state: &FemState) -> Result<Vec<LocalMatrix>, StrError> {
        let mut blocks = Vec::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            let dt = self.delta_t(i, state);
            let kt = self.kappa * (1.0 + 3.0 * self.beta * dt * dt);
            let km = 0.5 * self.capacity * state.rate_factor;
            let mut local = LocalMatrix::new(link.eqs.clone());
            local.kk.set(0, 0, kt + km);
            local.kk.set(0, 1, -kt);
            local.kk.set(1, 0, -kt);
            local.kk.set(1, 1, kt + km);
            blocks.push(local);
        }
        Ok(blocks)
    }

    fn update(&mut self, state: &FemState) -> Result<(), StrError> {
        for i in 0..self.links.len() {
            let dt = self.delta_t(i, state);
            self.flows[i] = self.kappa * (dt + self.beta * dt * dt * dt);
        }
        Ok(())
    }

    fn history(&self) -> Result<Value, StrError> {
        serde_json::to_value(&self.flows).map_err(|_| "cannot serialize the history of ConductionLinks")
    }

    fn set_history(&mut self, history: &Value) -> Result<(), StrError> {
        let flows: Vec<f64> = serde_json::from_value(history.clone())
            .map_err(|_| "cannot deserialize the history of ConductionLinks")?;
        if flows.len() != self.links.len() {
            return Err("history of ConductionLinks is incompatible with the domain");
        }
        self.flows = flows;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
