use super::EqNumber;
use russell_lab::{Matrix, Vector};

/// Holds a local (element, facet, or constraint) contribution to the residual vector
///
/// The residual is R = F_ext − F_int; thus internal forces enter with a negative sign.
#[derive(Clone, Debug)]
pub struct LocalVector {
    /// Equation numbers of the local entries
    pub eqs: Vec<EqNumber>,

    /// Local vector (len = eqs.len())
    pub ff: Vector,
}

/// Holds a local contribution to the global stiffness matrix K = −∂R/∂U
#[derive(Clone, Debug)]
pub struct LocalMatrix {
    /// Equation numbers of the local rows and columns
    pub eqs: Vec<EqNumber>,

    /// Local matrix (eqs.len() × eqs.len())
    pub kk: Matrix,
}

impl LocalVector {
    /// Allocates a zeroed block
    pub fn new(eqs: Vec<EqNumber>) -> Self {
        let n = eqs.len();
        LocalVector { eqs, ff: Vector::new(n) }
    }

    /// Adds this block into a global vector (free and prescribed rows)
    pub fn add_to(&self, rr: &mut Vector) {
        for (l, eq) in self.eqs.iter().enumerate() {
            if let Some(k) = eq.index() {
                rr[k] += self.ff[l];
            }
        }
    }
}

impl LocalMatrix {
    /// Allocates a zeroed block
    pub fn new(eqs: Vec<EqNumber>) -> Self {
        let n = eqs.len();
        LocalMatrix {
            eqs,
            kk: Matrix::new(n, n),
        }
    }

    /// Adds a value to the (i,j) entry
    #[inline]
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        let v = self.kk.get(i, j);
        self.kk.set(i, j, v + value);
    }
}

/// Gathers the local values of a global vector (zero for fixed DOFs)
pub fn gather(uu: &Vector, eqs: &[EqNumber]) -> Vector {
    let mut local = Vector::new(eqs.len());
    for (l, eq) in eqs.iter().enumerate() {
        if let Some(k) = eq.index() {
            local[l] = uu[k];
        }
    }
    local
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{gather, LocalMatrix, LocalVector};
    use crate::fem::EqNumber;
    use russell_lab::Vector;

    #[test]
    fn add_to_and_gather_work() {
        let eqs = vec![EqNumber::Free(2), EqNumber::Fixed, EqNumber::Prescribed(0)];
        let mut local = LocalVector::new(eqs.clone());
        local.ff[0] = 1.0;
        local.ff[1] = 10.0;
        local.ff[2] = 100.0;
        let mut rr = Vector::new(3);
        local.add_to(&mut rr);
        local.add_to(&mut rr);
        assert_eq!(rr.as_data(), &[200.0, 0.0, 2.0]);

        let uu = Vector::from(&[5.0, 6.0, 7.0]);
        assert_eq!(gather(&uu, &eqs).as_data(), &[7.0, 0.0, 5.0]);
    }

    #[test]
    fn local_matrix_add_works() {
        let mut local = LocalMatrix::new(vec![EqNumber::Free(0), EqNumber::Free(1)]);
        local.add(0, 1, 2.0);
        local.add(0, 1, 3.0);
        assert_eq!(local.kk.get(0, 1), 5.0);
        assert_eq!(local.kk.get(1, 0), 0.0);
    }
}
