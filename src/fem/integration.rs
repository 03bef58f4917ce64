use super::FemState;
use crate::base::Predictor;
use serde::{Deserialize, Serialize};

/// Holds the generalized-α time integration parameters of first-order (rate) equations
///
/// With ρ∞ the spectral radius at infinity:
///
/// ```text
/// αf = 1 / (1 + ρ∞)
/// αm = (3 − ρ∞) / (2 (1 + ρ∞))   (order = 1)
/// αm = (2 − ρ∞) / (1 + ρ∞)       (order = 2)
/// β  = (1 + αm − αf)² / 4
/// γ  = 1/2 + αm − αf
/// ```
///
/// ρ∞ = −1 selects the backward Euler scheme (all parameters equal to one).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationParams {
    pub alpha_f: f64,
    pub alpha_m: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl IntegrationParams {
    /// Allocates a new instance (the parameters are validated by Config)
    pub fn new(rho_inf: f64, order: usize) -> Self {
        if rho_inf == -1.0 {
            return IntegrationParams {
                alpha_f: 1.0,
                alpha_m: 1.0,
                beta: 1.0,
                gamma: 1.0,
            };
        }
        let alpha_f = 1.0 / (1.0 + rho_inf);
        let alpha_m = if order == 1 {
            (3.0 - rho_inf) / (1.0 + rho_inf) / 2.0
        } else {
            (2.0 - rho_inf) / (1.0 + rho_inf)
        };
        let d = 1.0 + alpha_m - alpha_f;
        IntegrationParams {
            alpha_f,
            alpha_m,
            beta: d * d / 4.0,
            gamma: 0.5 + alpha_m - alpha_f,
        }
    }

    /// Predicts the primary values of the free equations at the beginning of a time step
    ///
    /// Also updates the rates and the rate factor. `free` flags the equations that may be predicted.
    /// The zero-rate predictor sets the rates of the free equations to zero.
    pub fn predict(&self, predictor: Predictor, state: &mut FemState, free: &[bool]) {
        let dt = state.dt;
        for k in 0..state.uu.dim() {
            if !free[k] {
                continue;
            }
            state.uu[k] = match predictor {
                Predictor::RampRate => state.uu_old[k],
                Predictor::ZeroRate => state.uu_old[k] + state.vv_old[k] * dt * (1.0 - self.gamma) * self.alpha_f,
                Predictor::HoldRate => state.uu_old[k] + state.vv_old[k] * dt,
            };
        }
        self.update_rates(state);
        if predictor == Predictor::ZeroRate {
            for k in 0..state.vv.dim() {
                if free[k] {
                    state.vv[k] = 0.0;
                }
            }
        }
    }

    /// Updates the rates from the current primary values: `V = V_t (1 − 1/γ) + (U − U_t) / (γ Δt)`
    pub fn update_rates(&self, state: &mut FemState) {
        let c = 1.0 / (self.gamma * state.dt);
        for k in 0..state.vv.dim() {
            state.vv[k] = state.vv_old[k] * (1.0 - 1.0 / self.gamma) + (state.uu[k] - state.uu_old[k]) * c;
        }
        state.rate_factor = c;
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
