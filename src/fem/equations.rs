use crate::base::{Dof, DofFamily, Ebc, Essential};
use crate::StrError;
use gemlab::mesh::PointId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Holds the decoded equation number of a DOF
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EqNumber {
    /// Unknown DOF with equation k
    Free(usize),

    /// Prescribed DOF with equation k (the row yields the reaction)
    Prescribed(usize),

    /// DOF removed from the system
    Fixed,
}

impl EqNumber {
    /// Returns the encoded id: k (free), −(k+2) (prescribed), or −1 (fixed)
    pub fn encode(&self) -> isize {
        match self {
            EqNumber::Free(k) => *k as isize,
            EqNumber::Prescribed(k) => -(*k as isize) - 2,
            EqNumber::Fixed => -1,
        }
    }

    /// Decodes an id given by [EqNumber::encode]
    pub fn decode(id: isize) -> Self {
        if id >= 0 {
            EqNumber::Free(id as usize)
        } else if id == -1 {
            EqNumber::Fixed
        } else {
            EqNumber::Prescribed((-id - 2) as usize)
        }
    }

    /// Returns the equation index of free or prescribed DOFs
    pub fn index(&self) -> Option<usize> {
        match self {
            EqNumber::Free(k) | EqNumber::Prescribed(k) => Some(*k),
            EqNumber::Fixed => None,
        }
    }
}

/// Holds equation numbers (DOF numbers)
///
/// # Examples
///
/// ```text
/// point   DOF   id    decoded
///   0     Ux    -1    fixed
///   0     Uy    -2    prescribed(0)
///   1     Ux     1    free(1)
///   1     Uy     2    free(2)
///   λ₀           3    free(3)   << Lagrange multipliers come last
/// ```
///
/// Free and prescribed DOFs share the equation space `[0, n_equation)`; the prescribed rows
/// are kept in the global system with a unit diagonal and are used to recover reactions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Equations {
    /// Holds the encoded ids of all point DOFs
    ///
    /// **Note:** The array has a length equal to npoint; the inner maps have variable lengths
    /// according to the number of DOFs at the point.
    pub ids: Vec<HashMap<Dof, isize>>,

    /// Holds the total number of equations (nodal plus Lagrange multipliers)
    pub n_equation: usize,

    /// Holds the number of nodal equations (free plus prescribed)
    pub n_nodal: usize,

    /// Holds the number of Lagrange multiplier equations
    pub n_lagrange: usize,

    /// Holds the number of prescribed equations
    pub n_prescribed: usize,

    /// Holds the number of fixed DOFs (without equation)
    pub n_fixed: usize,

    /// Indicates which equations are prescribed (len = n_equation)
    pub prescribed: Vec<bool>,

    /// Holds the DOF family of each equation (len = n_equation)
    pub families: Vec<DofFamily>,
}

impl Equations {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `npoint` -- number of points in the mesh plus the number of rigid bodies
    /// * `declared` -- all (point, DOF) pairs required by the domains (duplicates allowed)
    /// * `essential` -- essential boundary conditions
    /// * `n_lagrange` -- number of Lagrange multipliers appended after the nodal DOFs
    pub fn new(
        npoint: usize,
        declared: &[(PointId, Dof)],
        essential: &Essential,
        n_lagrange: usize,
    ) -> Result<Self, StrError> {
        // collect the unique DOFs of each point
        let mut memo_point_dofs = vec![BTreeSet::new(); npoint];
        for (point_id, dof) in declared {
            if *point_id >= npoint {
                return Err("a declared DOF refers to a point outside the mesh");
            }
            memo_point_dofs[*point_id].insert(*dof);
        }

        // all essential conditions must refer to declared DOFs
        for (point_id, dof) in essential.all.keys() {
            if *point_id >= npoint || !memo_point_dofs[*point_id].contains(dof) {
                return Err("an essential boundary condition refers to an undeclared DOF");
            }
        }

        // compute all ids (points and DOFs are sorted)
        let mut ids = vec![HashMap::new(); npoint];
        let mut prescribed = Vec::new();
        let mut families = Vec::new();
        let mut n_prescribed = 0;
        let mut n_fixed = 0;
        for point_id in 0..npoint {
            for dof in &memo_point_dofs[point_id] {
                let eq = match essential.get(point_id, *dof) {
                    Some(Ebc::Fixed) => {
                        n_fixed += 1;
                        EqNumber::Fixed
                    }
                    Some(Ebc::Prescribed(..)) => {
                        n_prescribed += 1;
                        prescribed.push(true);
                        families.push(dof.family());
                        EqNumber::Prescribed(prescribed.len() - 1)
                    }
                    None => {
                        prescribed.push(false);
                        families.push(dof.family());
                        EqNumber::Free(prescribed.len() - 1)
                    }
                };
                ids[point_id].insert(*dof, eq.encode());
            }
        }

        // Lagrange multipliers
        let n_nodal = prescribed.len();
        prescribed.extend(std::iter::repeat(false).take(n_lagrange));
        families.extend(std::iter::repeat(DofFamily::Lagrange).take(n_lagrange));
        Ok(Equations {
            ids,
            n_equation: n_nodal + n_lagrange,
            n_nodal,
            n_lagrange,
            n_prescribed,
            n_fixed,
            prescribed,
            families,
        })
    }

    /// Returns the equation number of a (point, DOF) pair
    pub fn eq_number(&self, point_id: PointId, dof: Dof) -> Result<EqNumber, StrError> {
        match self.ids.get(point_id).and_then(|dofs| dofs.get(&dof)) {
            Some(id) => Ok(EqNumber::decode(*id)),
            None => Err("cannot find equation number corresponding to (PointId,DOF)"),
        }
    }

    /// Returns the equation numbers of the DOFs of a list of points (point-major order)
    pub fn local_eqs(&self, points: &[PointId], dofs: &[Dof]) -> Result<Vec<EqNumber>, StrError> {
        let mut eqs = Vec::with_capacity(points.len() * dofs.len());
        for point_id in points {
            for dof in dofs {
                eqs.push(self.eq_number(*point_id, *dof)?);
            }
        }
        Ok(eqs)
    }

    /// Returns the equation number of the i-th Lagrange multiplier
    pub fn lagrange_eq(&self, i: usize) -> Result<EqNumber, StrError> {
        if i >= self.n_lagrange {
            return Err("Lagrange multiplier index is out of range");
        }
        Ok(EqNumber::Free(self.n_nodal + i))
    }

    /// Returns the DOF families present in the system (sorted, without Lagrange multipliers)
    pub fn present_families(&self) -> Vec<DofFamily> {
        let set: BTreeSet<_> = self
            .families
            .iter()
            .filter(|f| **f != DofFamily::Lagrange)
            .copied()
            .collect();
        set.into_iter().collect()
    }
}

impl fmt::Display for Equations {
    /// Prints a formatted summary of the equation numbers
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Points: DOFs and encoded equation numbers\n")?;
        write!(f, "=========================================\n")?;
        for point_id in 0..self.ids.len() {
            let mut dofs: Vec<_> = self.ids[point_id].iter().collect();
            dofs.sort();
            write!(f, "{:?}: {:?}\n", point_id, dofs)?;
        }
        write!(f, "\nInformation\n")?;
        write!(f, "===========\n")?;
        write!(f, "number of equations = {}\n", self.n_equation)?;
        write!(f, "number of prescribed = {}\n", self.n_prescribed)?;
        write!(f, "number of fixed = {}\n", self.n_fixed)?;
        write!(f, "number of Lagrange multipliers = {}\n", self.n_lagrange)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{EqNumber, Equations};
    use crate::base::{Dof, DofFamily, Essential};

    #[test]
    fn eq_number_encoding_works() {
        for eq in [EqNumber::Free(0), EqNumber::Free(7), EqNumber::Prescribed(0), EqNumber::Prescribed(5)] {
            assert_eq!(EqNumber::decode(eq.encode()), eq);
        }
        assert_eq!(EqNumber::Fixed.encode(), -1);
        assert_eq!(EqNumber::Prescribed(0).encode(), -2);
        assert_eq!(EqNumber::Prescribed(3).encode(), -5);
        assert_eq!(EqNumber::decode(-1), EqNumber::Fixed);
        assert_eq!(EqNumber::Fixed.index(), None);
        assert_eq!(EqNumber::Prescribed(4).index(), Some(4));
    }

    #[test]
    fn new_captures_errors() {
        let essential = Essential::new();
        assert_eq!(
            Equations::new(1, &[(1, Dof::Ux)], &essential, 0).err(),
            Some("a declared DOF refers to a point outside the mesh")
        );
        let mut essential = Essential::new();
        essential.fixed(&[0], &[Dof::T]);
        assert_eq!(
            Equations::new(1, &[(0, Dof::Ux)], &essential, 0).err(),
            Some("an essential boundary condition refers to an undeclared DOF")
        );
    }

    #[test]
    fn new_works() {
        let mut essential = Essential::new();
        essential.fixed(&[0], &[Dof::Ux]).prescribed(&[0], Dof::Uy, 1.0, None);
        let declared = [(1, Dof::Uy), (0, Dof::Uy), (1, Dof::Ux), (0, Dof::Ux), (1, Dof::Ux)];
        let eqs = Equations::new(2, &declared, &essential, 1).unwrap();
        assert_eq!(eqs.n_equation, 4);
        assert_eq!(eqs.n_nodal, 3);
        assert_eq!(eqs.n_prescribed, 1);
        assert_eq!(eqs.n_fixed, 1);
        assert_eq!(eqs.eq_number(0, Dof::Ux).unwrap(), EqNumber::Fixed);
        assert_eq!(eqs.eq_number(0, Dof::Uy).unwrap(), EqNumber::Prescribed(0));
        assert_eq!(eqs.eq_number(1, Dof::Ux).unwrap(), EqNumber::Free(1));
        assert_eq!(eqs.eq_number(1, Dof::Uy).unwrap(), EqNumber::Free(2));
        assert_eq!(
            eqs.eq_number(1, Dof::T).err(),
            Some("cannot find equation number corresponding to (PointId,DOF)")
        );
        assert_eq!(eqs.lagrange_eq(0).unwrap(), EqNumber::Free(3));
        assert_eq!(eqs.lagrange_eq(1).err(), Some("Lagrange multiplier index is out of range"));
        assert_eq!(eqs.prescribed, &[true, false, false, false]);
        assert_eq!(eqs.families[3], DofFamily::Lagrange);
        assert_eq!(eqs.present_families(), &[DofFamily::Displacement]);
        assert_eq!(
            eqs.local_eqs(&[1, 0], &[Dof::Ux, Dof::Uy]).unwrap(),
            &[EqNumber::Free(1), EqNumber::Free(2), EqNumber::Fixed, EqNumber::Prescribed(0)]
        );
        assert_eq!(
            format!("{}", eqs),
            "Points: DOFs and encoded equation numbers\n\
             =========================================\n\
             0: [(Ux, -1), (Uy, -2)]\n\
             1: [(Ux, 1), (Uy, 2)]\n\
             \n\
             Information\n\
             ===========\n\
             number of equations = 4\n\
             number of prescribed = 1\n\
             number of fixed = 1\n\
             number of Lagrange multipliers = 1\n"
        );
    }

    #[test]
    fn numbering_is_a_bijection() {
        // 3×3 grid of points with mixed conditions
        let npoint = 9;
        let mut essential = Essential::new();
        essential
            .fixed(&[0, 1, 2], &[Dof::Ux])
            .prescribed(&[3, 6], Dof::Uy, 0.5, None)
            .prescribed(&[8], Dof::T, 1.0, None);
        let mut declared = Vec::new();
        for p in 0..npoint {
            declared.push((p, Dof::Ux));
            declared.push((p, Dof::Uy));
            if p % 2 == 0 {
                declared.push((p, Dof::T));
            }
        }
        let eqs = Equations::new(npoint, &declared, &essential, 2).unwrap();
        let mut seen = vec![false; eqs.n_equation];
        let mut n_free = 0;
        for p in 0..npoint {
            for (dof, id) in &eqs.ids[p] {
                match EqNumber::decode(*id) {
                    EqNumber::Free(k) => {
                        assert!(*id >= 0);
                        assert!(k < eqs.n_nodal);
                        assert!(!seen[k]);
                        assert!(!eqs.prescribed[k]);
                        seen[k] = true;
                        n_free += 1;
                    }
                    EqNumber::Prescribed(k) => {
                        assert!(*id < -1);
                        assert!(essential.get(p, *dof).is_some());
                        assert!(!seen[k]);
                        assert!(eqs.prescribed[k]);
                        seen[k] = true;
                    }
                    EqNumber::Fixed => {
                        assert_eq!(*id, -1);
                        assert!(essential.get(p, *dof).is_some());
                    }
                }
            }
        }
        assert_eq!(n_free + eqs.n_prescribed, eqs.n_nodal);
        assert_eq!(seen.iter().filter(|s| **s).count(), eqs.n_nodal);
        assert_eq!(eqs.n_fixed, 3);
        assert_eq!(eqs.n_prescribed, 3);
        assert_eq!(eqs.n_equation, 9 * 2 + 5 - 3 + 2);
    }
}
