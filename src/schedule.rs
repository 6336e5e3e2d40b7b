use crate::config::ModelConfig;
use serde::{Deserialize, Serialize};

/// Compute the daily transmission rate of exposed carriers.
///
/// The rate decays exponentially from `b_e_init` at day 0 towards `b_e_final`
/// with decay rate `eta`.
pub fn transmission_schedule(b_e_init: f64, b_e_final: f64, eta: f64, n_days: usize) -> Vec<f64> {
    (0..n_days)
        .map(|day| {
            let decay = (-eta * day as f64).exp();
            b_e_init * decay + b_e_final * (1.0 - decay)
        })
        .collect()
}

/// Rate parameters of a single run.
///
/// Only the exposed transmission schedule `b_e` and the infected death rate
/// `mu_i` ever change, and only through [`RateParameters::apply_lockdown`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RateParameters {
    pub b_e: Vec<f64>,
    pub b_i: f64,

    pub mu_s: f64,
    pub mu_e: f64,
    pub mu_i: f64,
    pub mu_r: f64,

    pub nu: f64,
    pub gamma: f64,
    pub sigma: f64,
    pub delta: f64,
}

impl RateParameters {
    /// Build the rate parameters for a run of `n_days` days.
    pub fn new(model: &ModelConfig, n_days: usize) -> Self {
        Self {
            b_e: transmission_schedule(model.b_e_init, model.b_e_final, model.eta, n_days),
            b_i: model.b_i,
            mu_s: model.mu_s,
            mu_e: model.mu_e,
            mu_i: model.mu_i,
            mu_r: model.mu_r,
            nu: model.nu,
            gamma: model.gamma,
            sigma: model.sigma,
            delta: model.delta,
        }
    }

    /// Divide the exposed transmission rate from `day` onward, and the
    /// infected death rate, by the lockdown `effectiveness`.
    pub fn apply_lockdown(&mut self, day: usize, effectiveness: f64) {
        for b_e in self.b_e.iter_mut().skip(day) {
            *b_e /= effectiveness;
        }
        self.mu_i /= effectiveness;
    }
}
