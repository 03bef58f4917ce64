use super::Constraint;
use crate::base::Dof;
use crate::fem::{gather, EqNumber, Equations, FemState, LocalMatrix, LocalVector};
use crate::StrError;
use gemlab::mesh::PointId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Specifies how a constraint is enforced
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Enforcement {
    /// Force ε·(c·u) (a penalty-dependent violation remains)
    Penalty,

    /// Force λ + ε·(c·u) with λ updated at augmentations
    AugmentedLagrangian,

    /// λ is an unknown; the system gains the saddle-point block [0 c; cᵀ 0]
    LagrangeMultiplier,
}

/// Holds a linear constraint Σ c_i u_i = 0 over DOFs
#[derive(Clone, Debug)]
pub struct LinearConstraint {
    /// Terms (point, DOF, coefficient)
    pub terms: Vec<(PointId, Dof, f64)>,

    /// Enforcement method
    pub enforcement: Enforcement,

    /// Penalty factor ε (ignored by the Lagrange multiplier method)
    pub penalty: f64,
}

impl LinearConstraint {
    /// Allocates a new instance
    pub fn new(terms: &[(PointId, Dof, f64)], enforcement: Enforcement, penalty: f64) -> Result<Self, StrError> {
        if terms.is_empty() {
            return Err("linear constraint must have at least one term");
        }
        if terms.iter().all(|(_, _, c)| *c == 0.0) {
            return Err("linear constraint must have a non-zero coefficient");
        }
        if enforcement != Enforcement::LagrangeMultiplier && penalty <= 0.0 {
            return Err("penalty must be > 0.0");
        }
        Ok(LinearConstraint {
            terms: terms.to_vec(),
            enforcement,
            penalty,
        })
    }
}

/// Holds the state of a constraint in the set
#[derive(Clone, Debug)]
struct Item {
    constraint: LinearConstraint,
    eqs: Vec<EqNumber>,
    lagrange: Option<EqNumber>,
    coefficients: Vec<f64>,
    lm: f64,
    violation: f64,
}

/// Holds the history of a constraint (for checkpoints)
#[derive(Serialize, Deserialize)]
struct ItemHistory {
    lm: f64,
    violation: f64,
}

/// Implements a set of linear constraints sharing the augmentation parameters
pub struct LinearConstraintSet {
    items: Vec<Item>,

    /// Augmentation tolerance on the relative change of the multiplier norm (zero disables)
    pub atol: f64,

    /// Augmentation tolerance on the violation norm (zero disables)
    pub gap_tol: f64,

    /// Minimum number of augmentations
    pub naugmin: usize,

    /// Maximum number of augmentations; the set then stops augmenting
    pub naugmax: usize,
}

impl LinearConstraintSet {
    /// Allocates a new instance
    pub fn new(constraints: Vec<LinearConstraint>) -> Self {
        let items = constraints
            .into_iter()
            .map(|constraint| {
                let coefficients = constraint.terms.iter().map(|(_, _, c)| *c).collect();
                Item {
                    constraint,
                    eqs: Vec::new(),
                    lagrange: None,
                    coefficients,
                    lm: 0.0,
                    violation: 0.0,
                }
            })
            .collect();
        LinearConstraintSet {
            items,
            atol: 0.01,
            gap_tol: 0.0,
            naugmin: 0,
            naugmax: 10,
        }
    }

    /// Returns the multiplier of each constraint (the augmented or the unknown λ)
    pub fn multipliers(&self) -> Vec<f64> {
        self.items.iter().map(|item| item.lm).collect()
    }

    /// Returns the violation c·u of each constraint (as of the last update)
    pub fn violations(&self) -> Vec<f64> {
        self.items.iter().map(|item| item.violation).collect()
    }

    fn value(item: &Item, state: &FemState) -> f64 {
        let uu = gather(&state.uu, &item.eqs);
        item.coefficients.iter().enumerate().map(|(i, c)| c * uu[i]).sum()
    }

    /// Returns the force conjugate to the constraint
    fn force(item: &Item, state: &FemState) -> f64 {
        let v = LinearConstraintSet::value(item, state);
        match item.constraint.enforcement {
            Enforcement::Penalty => item.constraint.penalty * v,
            Enforcement::AugmentedLagrangian => item.lm + item.constraint.penalty * v,
            Enforcement::LagrangeMultiplier => match item.lagrange.and_then(|eq| eq.index()) {
                Some(k) => state.uu[k],
                None => 0.0,
            },
        }
    }
}

impl Constraint for LinearConstraintSet {
    fn n_lagrange(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.constraint.enforcement == Enforcement::LagrangeMultiplier)
            .count()
    }

    fn init(&mut self, equations: &Equations, lagrange: usize) -> Result<(), StrError> {
        let mut next = lagrange;
        for item in &mut self.items {
            item.eqs.clear();
            for (point_id, dof, _) in &item.constraint.terms {
                let eq = equations
                    .eq_number(*point_id, *dof)
                    .map_err(|_| "a linear constraint refers to an undeclared DOF")?;
                item.eqs.push(eq);
            }
            if item.constraint.enforcement == Enforcement::LagrangeMultiplier {
                item.lagrange = Some(equations.lagrange_eq(next)?);
                next += 1;
            }
        }
        Ok(())
    }

    fn residual(&self, state: &FemState) -> Result<Vec<LocalVector>, StrError> {
        let mut blocks = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let t = LinearConstraintSet::force(item, state);
            let mut eqs = item.eqs.clone();
            if let Some(eq) = item.lagrange {
                eqs.push(eq);
            }
            let mut local = LocalVector::new(eqs);
            for (i, c) in item.coefficients.iter().enumerate() {
                local.ff[i] = -c * t;
            }
            if item.lagrange.is_some() {
                local.ff[item.eqs.len()] = -LinearConstraintSet::value(item, state);
            }
            blocks.push(local);
        }
        Ok(blocks)
    }

    fn stiffness(&self, _state: &FemState) -> Result<Vec<LocalMatrix>, StrError> {
        let mut blocks = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let n = item.eqs.len();
            let mut eqs = item.eqs.clone();
            if let Some(eq) = item.lagrange {
                eqs.push(eq);
            }
            let mut local = LocalMatrix::new(eqs);
            match item.constraint.enforcement {
                Enforcement::Penalty | Enforcement::AugmentedLagrangian => {
                    let eps = item.constraint.penalty;
                    for i in 0..n {
                        for j in 0..n {
                            local.kk.set(i, j, eps * item.coefficients[i] * item.coefficients[j]);
                        }
                    }
                }
                Enforcement::LagrangeMultiplier => {
                    for i in 0..n {
                        local.kk.set(i, n, item.coefficients[i]);
                        local.kk.set(n, i, item.coefficients[i]);
                    }
                }
            }
            blocks.push(local);
        }
        Ok(blocks)
    }

    fn update(&mut self, state: &FemState) -> Result<(), StrError> {
        for item in &mut self.items {
            item.violation = LinearConstraintSet::value(item, state);
            if item.constraint.enforcement == Enforcement::LagrangeMultiplier {
                item.lm = LinearConstraintSet::force(item, state);
            }
        }
        Ok(())
    }

    fn augment(&mut self, naug: usize) -> Result<bool, StrError> {
        let (mut norm_lm0, mut norm_lm1, mut norm_gap) = (0.0, 0.0, 0.0);
        let mut n_augmented = 0;
        for item in &self.items {
            if item.constraint.enforcement != Enforcement::AugmentedLagrangian {
                continue;
            }
            let lm1 = item.lm + item.constraint.penalty * item.violation;
            norm_lm0 += item.lm * item.lm;
            norm_lm1 += lm1 * lm1;
            norm_gap += item.violation * item.violation;
            n_augmented += 1;
        }
        if n_augmented == 0 {
            return Ok(true);
        }
        let (norm_lm0, norm_lm1, norm_gap) = (f64::sqrt(norm_lm0), f64::sqrt(norm_lm1), f64::sqrt(norm_gap));
        let pct = if norm_lm1 > 0.0 {
            f64::abs((norm_lm1 - norm_lm0) / norm_lm1)
        } else {
            0.0
        };
        let mut converged = true;
        if self.atol > 0.0 && pct >= self.atol {
            converged = false;
        }
        if self.gap_tol > 0.0 && norm_gap > self.gap_tol {
            converged = false;
        }
        if naug < self.naugmin {
            converged = false;
        }
        if naug >= self.naugmax {
            if !converged {
                log::warn!("constraint augmentation stopped after {} augmentations", naug);
            }
            converged = true;
        }
        log::info!(
            "constraint augmentation {}: pct = {:e} (tol = {:e}), violation norm = {:e}",
            naug,
            pct,
            self.atol,
            norm_gap
        );
        if !converged {
            for item in &mut self.items {
                if item.constraint.enforcement == Enforcement::AugmentedLagrangian {
                    item.lm += item.constraint.penalty * item.violation;
                }
            }
        }
        Ok(converged)
    }

    fn history(&self) -> Result<Value, StrError> {
        let history: Vec<_> = self
            .items
            .iter()
            .map(|item| ItemHistory {
                lm: item.lm,
                violation: item.violation,
            })
            .collect();
        serde_json::to_value(&history).map_err(|_| "cannot serialize the history of LinearConstraintSet")
    }

    fn set_history(&mut self, history: &Value) -> Result<(), StrError> {
        let history: Vec<ItemHistory> = serde_json::from_value(history.clone())
            .map_err(|_| "cannot deserialize the history of LinearConstraintSet")?;
        if history.len() != self.items.len() {
            return Err("history of LinearConstraintSet is incompatible with the set");
        }
        for (item, h) in self.items.iter_mut().zip(history) {
            item.lm = h.lm;
            item.violation = h.violation;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
