use super::{EqNumber, LocalMatrix};
use crate::StrError;
use russell_lab::Vector;
use russell_sparse::{Genie, LinSolParams, LinSolver, SparseMatrix, Sym};

/// Holds variables to solve the global linear system K·u = R
///
/// Prescribed equations are kept in the system with a unit diagonal; the coupling of free
/// rows with prescribed columns goes to the right-hand side correction `ff_presc`.
pub struct LinearSystem<'a> {
    /// Total number of global equations
    pub n_equation: usize,

    /// Holds the current capacity of the COO matrix
    ///
    /// **Notes:**
    ///
    /// 1. The local matrices add only to parts of the global matrix yielding a banded matrix
    /// 2. The least upper bound (supremum) of nnz is the sum of the number of entries of all
    ///    local matrices (only the lower triangle if the storage is triangular) plus
    ///    the number of prescribed equations (unit diagonal)
    /// 3. The contact active set changes between reformations; thus, the capacity is
    ///    enlarged whenever a reformation needs more entries
    pub nnz_sup: usize,

    /// Holds the symmetry type of the stored matrix
    pub sym: Sym,

    /// Holds the global stiffness matrix K
    pub kk: SparseMatrix,

    /// Holds the right-hand side correction −K_fp·ΔU_p due to prescribed increments
    pub ff_presc: Vector,

    /// Holds the linear solver
    pub solver: LinSolver<'a>,

    /// Number of entries added to K since the last reset
    nnz: usize,

    /// Linear solver type
    genie: Genie,

    /// Linear solver parameters
    params: LinSolParams,

    /// Verbose mode of the linear solver
    verbose: bool,
}

impl<'a> LinearSystem<'a> {
    /// Allocates a new instance
    pub fn new(
        n_equation: usize,
        nnz_sup: usize,
        symmetric: bool,
        genie: Genie,
        params: LinSolParams,
    ) -> Result<Self, StrError> {
        let sym = genie.get_sym(symmetric);
        let nnz_sup = usize::max(nnz_sup, n_equation);
        Ok(LinearSystem {
            n_equation,
            nnz_sup,
            sym,
            kk: SparseMatrix::new_coo(n_equation, n_equation, nnz_sup, sym)?,
            ff_presc: Vector::new(n_equation),
            solver: LinSolver::new(genie)?,
            nnz: 0,
            genie,
            params,
            verbose: false,
        })
    }

    /// Returns the number of entries required by a local matrix
    pub fn nnz_local(&self, block: &LocalMatrix) -> usize {
        let n = block.eqs.iter().filter(|eq| matches!(eq, EqNumber::Free(_))).count();
        if self.sym.triangular() {
            (n * n + n) / 2
        } else {
            n * n
        }
    }

    /// Clears K and the prescribed correction; enlarges K if `nnz_required` exceeds the capacity
    pub fn reset(&mut self, nnz_required: usize) -> Result<(), StrError> {
        if nnz_required > self.nnz_sup {
            self.nnz_sup = nnz_required;
            self.kk = SparseMatrix::new_coo(self.n_equation, self.n_equation, self.nnz_sup, self.sym)?;
        } else {
            self.kk.reset()?;
        }
        self.ff_presc.fill(0.0);
        self.nnz = 0;
        Ok(())
    }

    /// Adds a local matrix into K
    ///
    /// # Input
    ///
    /// * `block` -- the local matrix and its equation numbers
    /// * `up` -- the remaining prescribed increments (indexed by equation; zero elsewhere)
    ///
    /// Rows of prescribed or fixed DOFs are skipped. For a free row `I` and prescribed
    /// column `J`, the term `k_IJ · up_J` is subtracted from `ff_presc[I]`.
    pub fn assemble(&mut self, block: &LocalMatrix, up: &Vector) -> Result<(), StrError> {
        let triangular = self.sym.triangular();
        for (l, row) in block.eqs.iter().enumerate() {
            let i = match row {
                EqNumber::Free(i) => *i,
                _ => continue,
            };
            for (ll, col) in block.eqs.iter().enumerate() {
                match col {
                    EqNumber::Free(j) => {
                        if triangular && *j > i {
                            continue;
                        }
                        self.kk.put(i, *j, block.kk.get(l, ll))?;
                        self.nnz += 1;
                    }
                    EqNumber::Prescribed(j) => {
                        self.ff_presc[i] -= block.kk.get(l, ll) * up[*j];
                    }
                    EqNumber::Fixed => (),
                }
            }
        }
        Ok(())
    }

    /// Puts ones on the diagonal of the prescribed equations
    pub fn finalize(&mut self, prescribed: &[bool]) -> Result<(), StrError> {
        for (eq, presc) in prescribed.iter().enumerate() {
            if *presc {
                self.kk.put(eq, eq, 1.0)?;
                self.nnz += 1;
            }
        }
        Ok(())
    }

    /// Returns the number of entries added to K since the last reset
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Factorizes K
    ///
    /// The sparsity pattern may change between factorizations (contact); thus, the solver
    /// is allocated anew before each factorization.
    pub fn factorize(&mut self) -> Result<(), StrError> {
        self.solver = LinSolver::new(self.genie)?;
        self.solver.actual.factorize(&mut self.kk, Some(self.params))
    }

    /// Solves K·x = rhs using the last factorization
    pub fn solve(&mut self, x: &mut Vector, rhs: &Vector) -> Result<(), StrError> {
        self.solver.actual.solve(x, &self.kk, rhs, self.verbose)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::LinearSystem;
    use crate::fem::{EqNumber, LocalMatrix};
    use russell_lab::{approx_eq, Vector};
    use russell_sparse::{Genie, LinSolParams};

    fn spring_block(eqs: Vec<EqNumber>, k: f64) -> LocalMatrix {
        let mut block = LocalMatrix::new(eqs);
        block.kk.set(0, 0, k);
        block.kk.set(0, 1, -k);
        block.kk.set(1, 0, -k);
        block.kk.set(1, 1, k);
        block
    }

    #[test]
    fn new_captures_errors() {
        assert_eq!(
            LinearSystem::new(0, 0, false, Genie::Umfpack, LinSolParams::new()).err(),
            Some("nrow must be ≥ 1")
        );
    }

    #[test]
    fn assemble_moves_prescribed_columns_to_rhs() {
        // three springs in series: (fixed) 0 --k1-- 1 --k2-- 2 --k3-- 3 (prescribed)
        //                          eq:      -      0       1       2
        let (k1, k2, k3) = (1.0, 2.0, 4.0);
        let mut ls = LinearSystem::new(3, 0, false, Genie::Umfpack, LinSolParams::new()).unwrap();
        let blocks = [
            spring_block(vec![EqNumber::Fixed, EqNumber::Free(0)], k1),
            spring_block(vec![EqNumber::Free(0), EqNumber::Free(1)], k2),
            spring_block(vec![EqNumber::Free(1), EqNumber::Prescribed(2)], k3),
        ];
        let nnz: usize = blocks.iter().map(|b| ls.nnz_local(b)).sum::<usize>() + 1;
        assert_eq!(nnz, 1 + 4 + 1 + 1);
        let mut up = Vector::new(3);
        up[2] = 0.7;
        ls.reset(nnz).unwrap();
        for block in &blocks {
            ls.assemble(block, &up).unwrap();
        }
        ls.finalize(&[false, false, true]).unwrap();
        assert_eq!(ls.nnz(), nnz);
        assert_eq!(ls.ff_presc.as_data(), &[0.0, k3 * 0.7, 0.0]);

        // solve with rhs = ff_presc (free rows) and up (prescribed rows)
        let mut rhs = ls.ff_presc.clone();
        rhs[2] = up[2];
        ls.factorize().unwrap();
        let mut x = Vector::new(3);
        ls.solve(&mut x, &rhs).unwrap();

        // series springs: displacement at node 1 = δ·k3·k2 / (k1·k2 + k1·k3 + k2·k3)
        let den = k1 * k2 + k1 * k3 + k2 * k3;
        approx_eq(x[0], 0.7 * k2 * k3 / den, 1e-14);
        approx_eq(x[1], 0.7 * k3 * (k1 + k2) / den, 1e-14);
        approx_eq(x[2], 0.7, 1e-15);
    }

    #[test]
    fn reset_enlarges_the_capacity() {
        let mut ls = LinearSystem::new(2, 1, false, Genie::Umfpack, LinSolParams::new()).unwrap();
        assert_eq!(ls.nnz_sup, 2);
        ls.reset(4).unwrap();
        assert_eq!(ls.nnz_sup, 4);
        let block = spring_block(vec![EqNumber::Free(0), EqNumber::Free(1)], 1.0);
        ls.assemble(&block, &Vector::new(2)).unwrap();
        assert_eq!(ls.nnz(), 4);
        ls.reset(2).unwrap();
        assert_eq!(ls.nnz_sup, 4);
        assert_eq!(ls.nnz(), 0);
    }
}
