use super::Dof;
use crate::FnTime;
use gemlab::mesh::PointId;
use std::collections::HashMap;
use std::fmt;

/// Defines an essential boundary condition
#[derive(Clone, Copy, Debug)]
pub enum Ebc {
    /// The DOF is removed from the system (no equation; no reaction)
    Fixed,

    /// The DOF keeps an equation with a prescribed value; its reaction is recovered
    ///
    /// The value at time t is `value · f(t)`, or just `value` if `f` is None.
    Prescribed(f64, Option<FnTime>),
}

impl Ebc {
    /// Returns the target value at time t (zero if fixed)
    pub fn value(&self, t: f64) -> f64 {
        match self {
            Ebc::Fixed => 0.0,
            Ebc::Prescribed(value, f) => match f {
                Some(f) => value * f(t),
                None => *value,
            },
        }
    }
}

/// Holds essential boundary conditions
pub struct Essential {
    pub all: HashMap<(PointId, Dof), Ebc>,
}

impl Essential {
    /// Allocates a new instance
    pub fn new() -> Self {
        Essential { all: HashMap::new() }
    }

    /// Removes DOFs from the system (e.g., fully clamped supports)
    pub fn fixed(&mut self, points: &[PointId], dofs: &[Dof]) -> &mut Self {
        for point_id in points {
            for dof in dofs {
                self.all.insert((*point_id, *dof), Ebc::Fixed);
            }
        }
        self
    }

    /// Sets prescribed values at points
    ///
    /// A later call for the same (point, dof) pair replaces the previous condition.
    pub fn prescribed(&mut self, points: &[PointId], dof: Dof, value: f64, f: Option<FnTime>) -> &mut Self {
        for point_id in points {
            self.all.insert((*point_id, dof), Ebc::Prescribed(value, f));
        }
        self
    }

    /// Returns the condition at (point, dof), if any
    pub fn get(&self, point_id: PointId, dof: Dof) -> Option<&Ebc> {
        self.all.get(&(point_id, dof))
    }
}

impl fmt::Display for Essential {
    /// Prints a formatted summary of the essential boundary conditions
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Essential boundary conditions\n")?;
        write!(f, "=============================\n")?;
        let mut keys: Vec<_> = self.all.keys().collect();
        keys.sort();
        for key in keys {
            match self.all[key] {
                Ebc::Fixed => write!(f, "{:?} : {:?} fixed\n", key.0, key.1)?,
                ebc => write!(
                    f,
                    "{:?} : {:?}(0) = {:?}, {:?}(1) = {:?}\n",
                    key.0,
                    key.1,
                    ebc.value(0.0),
                    key.1,
                    ebc.value(1.0)
                )?,
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
