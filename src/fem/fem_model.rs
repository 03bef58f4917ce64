use super::{Domain, Equations, FemState, LocalMatrix, RigidBody};
use crate::base::{Arena, Dof, Essential, Handle, Natural};
use crate::constraint::Constraint;
use crate::contact::{ContactInterface, ContactSurface};
use crate::StrError;
use gemlab::mesh::{Mesh, PointId};
use russell_lab::Vector;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Holds all entities of a finite element model
///
/// The arenas are the single owners of domains, contact surfaces, contact interfaces,
/// and constraints; all other references go through handles.
pub struct FemModel<'a> {
    /// The mesh (points only are used by the core)
    pub mesh: &'a Mesh,

    /// Physics domains (elements plus materials)
    pub domains: Arena<Box<dyn Domain>>,

    /// Contact surfaces
    pub surfaces: Arena<ContactSurface>,

    /// Contact interfaces (referring to surfaces by handle)
    pub contacts: Arena<ContactInterface>,

    /// Nonlinear constraints
    pub constraints: Arena<Box<dyn Constraint>>,

    /// Rigid bodies (numbered after the mesh points)
    pub rigid_bodies: Vec<RigidBody>,

    /// Essential boundary conditions
    pub essential: Essential,

    /// Natural boundary conditions (concentrated loads)
    pub natural: Natural,

    /// Equation of each point load (None if the DOF is fixed)
    load_eqs: Vec<Option<usize>>,
}

/// Holds the internal history of all entities of a model (checkpoints)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelHistory {
    pub domains: Vec<Value>,
    pub constraints: Vec<Value>,
    pub surfaces: Vec<Value>,
}

impl<'a> FemModel<'a> {
    /// Allocates a new (empty) instance
    pub fn new(mesh: &'a Mesh) -> Self {
        FemModel {
            mesh,
            domains: Arena::new(),
            surfaces: Arena::new(),
            contacts: Arena::new(),
            constraints: Arena::new(),
            rigid_bodies: Vec::new(),
            essential: Essential::new(),
            natural: Natural::new(),
            load_eqs: Vec::new(),
        }
    }

    /// Adds a domain
    pub fn add_domain<D>(&mut self, domain: D) -> Handle<Box<dyn Domain>>
    where
        D: Domain + 'static,
    {
        self.domains.insert(Box::new(domain))
    }

    /// Adds a contact surface
    pub fn add_surface(&mut self, surface: ContactSurface) -> Handle<ContactSurface> {
        self.surfaces.insert(surface)
    }

    /// Adds a contact interface
    pub fn add_contact(&mut self, contact: ContactInterface) -> Result<Handle<ContactInterface>, StrError> {
        if contact.slave.index() >= self.surfaces.len() || contact.master.index() >= self.surfaces.len() {
            return Err("contact interface refers to a surface that is not in the model");
        }
        Ok(self.contacts.insert(contact))
    }

    /// Adds a constraint
    pub fn add_constraint<C>(&mut self, constraint: C) -> Handle<Box<dyn Constraint>>
    where
        C: Constraint + 'static,
    {
        self.constraints.insert(Box::new(constraint))
    }

    /// Adds a rigid body with reference point at `center`
    ///
    /// Returns a copy of the body holding its virtual point id.
    pub fn add_rigid_body(&mut self, center: &[f64]) -> Result<RigidBody, StrError> {
        if center.len() != self.mesh.ndim {
            return Err("the center of the rigid body must have ndim coordinates");
        }
        let body = RigidBody {
            id: self.mesh.points.len() + self.rigid_bodies.len(),
            center: center.to_vec(),
        };
        self.rigid_bodies.push(body.clone());
        Ok(body)
    }

    /// Returns the number of points including the virtual points of the rigid bodies
    pub fn n_point(&self) -> usize {
        self.mesh.points.len() + self.rigid_bodies.len()
    }

    /// Returns all (point, DOF) pairs required by the domains, contact surfaces, and rigid bodies
    pub fn declared_dofs(&self) -> Vec<(PointId, Dof)> {
        let ndim = self.mesh.ndim;
        let mut declared = Vec::new();
        for domain in self.domains.iter() {
            let dofs = domain.physics().dofs(ndim);
            for p in domain.points() {
                for dof in &dofs {
                    declared.push((p, *dof));
                }
            }
        }
        for surface in self.surfaces.iter() {
            for p in &surface.nodes {
                for dof in Dof::displacements(ndim) {
                    declared.push((*p, *dof));
                }
            }
        }
        for body in &self.rigid_bodies {
            for dof in body.dofs() {
                declared.push((body.id, dof));
            }
        }
        declared
    }

    /// Returns the number of Lagrange multipliers required by the constraints
    pub fn n_lagrange(&self) -> usize {
        self.constraints.iter().map(|c| c.n_lagrange()).sum()
    }

    /// Tells whether the global stiffness is symmetric
    pub fn symmetric(&self) -> bool {
        self.domains.iter().all(|d| d.physics().symmetric())
    }

    /// Numbers the equations and initializes all entities
    ///
    /// Must be called again whenever entities or boundary conditions are added.
    pub fn init_equations(&mut self) -> Result<Equations, StrError> {
        if self.domains.is_empty() {
            return Err("the model must have at least one domain");
        }
        let equations = Equations::new(self.n_point(), &self.declared_dofs(), &self.essential, self.n_lagrange())?;
        let mut load_eqs = Vec::with_capacity(self.natural.all.len());
        for load in &self.natural.all {
            let eq = equations
                .eq_number(load.point_id, load.dof)
                .map_err(|_| "a point load refers to an undeclared DOF")?;
            load_eqs.push(eq.index());
        }
        self.load_eqs = load_eqs;
        for domain in self.domains.iter_mut() {
            domain.init(&equations)?;
        }
        for surface in self.surfaces.iter_mut() {
            surface.init(&equations)?;
        }
        let mut lagrange = 0;
        for constraint in self.constraints.iter_mut() {
            constraint.init(&equations, lagrange)?;
            lagrange += constraint.n_lagrange();
        }
        Ok(equations)
    }

    /// Prepares all entities for a new time step and updates them to the predicted state
    pub fn prep_step(&mut self, state: &FemState) -> Result<(), StrError> {
        for domain in self.domains.iter_mut() {
            domain.prep_step(state)?;
        }
        for constraint in self.constraints.iter_mut() {
            constraint.prep_step(state)?;
        }
        for contact in self.contacts.iter() {
            contact.prep_step(&mut self.surfaces, state)?;
        }
        self.update(state)
    }

    /// Updates the internal history, the constraint violations, and the contact gaps
    pub fn update(&mut self, state: &FemState) -> Result<(), StrError> {
        for domain in self.domains.iter_mut() {
            domain.update(state)?;
        }
        for constraint in self.constraints.iter_mut() {
            constraint.update(state)?;
        }
        for contact in self.contacts.iter() {
            contact.update(&mut self.surfaces, state)?;
        }
        Ok(())
    }

    /// Calculates the global residual R = F_ext − F_int (free and prescribed rows)
    ///
    /// The local blocks are merged in a fixed order (loads, domains, constraints, contacts).
    pub fn residual(&self, state: &FemState, rr: &mut Vector) -> Result<(), StrError> {
        rr.fill(0.0);
        for (load, eq) in self.natural.all.iter().zip(&self.load_eqs) {
            if let Some(k) = eq {
                rr[*k] += load.value(state.t);
            }
        }
        for domain in self.domains.iter() {
            for block in domain.residual(state)? {
                block.add_to(rr);
            }
        }
        for constraint in self.constraints.iter() {
            for block in constraint.residual(state)? {
                block.add_to(rr);
            }
        }
        for contact in self.contacts.iter() {
            for block in contact.residual(&self.surfaces, state)? {
                block.add_to(rr);
            }
        }
        Ok(())
    }

    /// Collects all local contributions to the stiffness matrix
    pub fn stiffness(&self, state: &FemState) -> Result<Vec<LocalMatrix>, StrError> {
        let mut blocks = Vec::new();
        for domain in self.domains.iter() {
            blocks.extend(domain.stiffness(state)?);
        }
        for constraint in self.constraints.iter() {
            blocks.extend(constraint.stiffness(state)?);
        }
        for contact in self.contacts.iter() {
            blocks.extend(contact.stiffness(&self.surfaces, state)?);
        }
        Ok(blocks)
    }

    /// Runs one augmentation of all constraints and contact interfaces
    ///
    /// Every entity is augmented (no short-circuit); returns true if all have converged.
    pub fn augment(&mut self, naug: usize) -> Result<bool, StrError> {
        let mut converged = true;
        for constraint in self.constraints.iter_mut() {
            converged &= constraint.augment(naug)?;
        }
        for contact in self.contacts.iter() {
            converged &= contact.augment(&mut self.surfaces, naug)?;
        }
        Ok(converged)
    }

    /// Returns the internal history of all entities
    pub fn history(&self) -> Result<ModelHistory, StrError> {
        Ok(ModelHistory {
            domains: self.domains.iter().map(|d| d.history()).collect::<Result<_, _>>()?,
            constraints: self.constraints.iter().map(|c| c.history()).collect::<Result<_, _>>()?,
            surfaces: self.surfaces.iter().map(|s| s.history()).collect::<Result<_, _>>()?,
        })
    }

    /// Restores the internal history of all entities
    pub fn set_history(&mut self, history: &ModelHistory) -> Result<(), StrError> {
        if history.domains.len() != self.domains.len()
            || history.constraints.len() != self.constraints.len()
            || history.surfaces.len() != self.surfaces.len()
        {
            return Err("history is incompatible with the model");
        }
        for (domain, h) in self.domains.iter_mut().zip(&history.domains) {
            domain.set_history(h)?;
        }
        for (constraint, h) in self.constraints.iter_mut().zip(&history.constraints) {
            constraint.set_history(h)?;
        }
        for (surface, h) in self.surfaces.iter_mut().zip(&history.surfaces) {
            surface.set_history(h)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::FemModel;
    use crate::base::{Dof, SampleMeshes};
    use crate::constraint::{Enforcement, LinearConstraint, LinearConstraintSet};
    use crate::contact::{ContactInterface, ContactKind, ContactParams, ContactSurface};
    use crate::fem::{ConductionLinks, ElasticSolid, FemState};
    use russell_lab::{approx_eq, Vector};

    #[test]
    fn init_captures_errors() {
        let mesh = SampleMeshes::bar_hex8(1, 1.0, 1.0, 1.0);
        let mut model = FemModel::new(&mesh);
        assert_eq!(model.init_equations().err(), Some("the model must have at least one domain"));

        model.add_domain(ElasticSolid::new(&mesh, 1, 1000.0, 0.0).unwrap());
        model.natural.points(&[0], Dof::T, 1.0, None);
        assert_eq!(model.init_equations().err(), Some("a point load refers to an undeclared DOF"));

        model.natural.all.clear();
        model.essential.fixed(&[0], &[Dof::T]);
        assert_eq!(
            model.init_equations().err(),
            Some("an essential boundary condition refers to an undeclared DOF")
        );

        model.essential.all.clear();
        let constraint = LinearConstraint::new(&[(0, Dof::P, 1.0)], Enforcement::Penalty, 1.0).unwrap();
        model.add_constraint(LinearConstraintSet::new(vec![constraint]));
        assert_eq!(model.init_equations().err(), Some("a linear constraint refers to an undeclared DOF"));
    }

    #[test]
    fn init_works() {
        let (mesh, top, bottom) = SampleMeshes::two_cubes(0.0);
        let mut model = FemModel::new(&mesh);
        model.add_domain(ElasticSolid::new(&mesh, 1, 1000.0, 0.25).unwrap());
        let master = model.add_surface(ContactSurface::new(&mesh, &[top]).unwrap());
        let slave = model.add_surface(ContactSurface::new(&mesh, &[bottom]).unwrap());
        let contact = ContactInterface::new(ContactKind::Sliding, slave, master, ContactParams::new()).unwrap();
        model.add_contact(contact).unwrap();
        let constraint = LinearConstraint::new(
            &[(0, Dof::Ux, 1.0), (8, Dof::Ux, -1.0)],
            Enforcement::LagrangeMultiplier,
            0.0,
        )
        .unwrap();
        model.add_constraint(LinearConstraintSet::new(vec![constraint]));
        assert!(model.symmetric());
        assert_eq!(model.n_lagrange(), 1);
        let equations = model.init_equations().unwrap();
        assert_eq!(equations.n_nodal, 48);
        assert_eq!(equations.n_equation, 49);

        // thermal links are symmetric as well
        model.add_domain(ConductionLinks::new(&[(0, 1)], 1.0, 0.0).unwrap());
        assert!(model.symmetric());
        let equations = model.init_equations().unwrap();
        assert_eq!(equations.n_nodal, 50);
    }

    #[test]
    fn residual_and_history_work() {
        let mesh = SampleMeshes::bar_hex8(1, 1.0, 1.0, 1.0);
        let mut model = FemModel::new(&mesh);
        model.add_domain(ElasticSolid::new(&mesh, 1, 1000.0, 0.0).unwrap());
        model.natural.points(&[4, 5], Dof::Ux, 2.0, None);
        model.essential.fixed(&[0], &[Dof::Ux]);
        let equations = model.init_equations().unwrap();
        let state = FemState::new(&equations, &crate::base::Config::new()).unwrap();

        // at rest, the residual holds the point loads only
        let mut rr = Vector::new(equations.n_equation);
        model.residual(&state, &mut rr).unwrap();
        let k4 = equations.eq_number(4, Dof::Ux).unwrap().index().unwrap();
        let k5 = equations.eq_number(5, Dof::Ux).unwrap().index().unwrap();
        approx_eq(rr[k4], 2.0, 1e-15);
        approx_eq(rr[k5], 2.0, 1e-15);
        approx_eq(rr.as_data().iter().sum::<f64>(), 4.0, 1e-15);

        // history
        let history = model.history().unwrap();
        assert_eq!(history.domains.len(), 1);
        model.set_history(&history).unwrap();
        let mut wrong = history.clone();
        wrong.surfaces.push(serde_json::Value::Null);
        assert_eq!(
            model.set_history(&wrong).err(),
            Some("history is incompatible with the model")
        );
    }
}
