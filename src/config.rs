//! World construction parameters.
//!
//! Grounded on `rust_qsim`'s `config_simple.rs` (a plain serde struct of
//! scenario-wide settings), flattened to the fixed parameter list of spec
//! §6 since this crate has no file-driven module system and no CLI.

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldParams {
    pub name: String,
    /// Simulation horizon in seconds.
    pub t_max: f64,
    /// Platoon size: vehicles represented by one simulation entity.
    pub delta_n: f64,
    /// Simulation step / reaction-time lag, in seconds.
    pub tau: f64,
    /// DUO recomputation period, in seconds.
    pub duo_update_time: f64,
    /// DUO exponential blend weight, in (0, 1].
    pub duo_update_weight: f32,
    /// 0 => deterministic route choice; >0 => perturbation scale (spec §9).
    pub route_choice_uncertainty: f32,
    pub print_mode: bool,
    pub random_seed: u64,
    /// Whether platoons keep a per-step (t, state, link, x, v) log.
    pub vehicle_log_mode: bool,
}

impl WorldParams {
    pub fn new(name: impl Into<String>, t_max: f64, delta_n: f64, tau: f64) -> Self {
        WorldParams {
            name: name.into(),
            t_max,
            delta_n,
            tau,
            duo_update_time: 600.0,
            duo_update_weight: 0.5,
            route_choice_uncertainty: 0.0,
            print_mode: false,
            random_seed: 42,
            vehicle_log_mode: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.t_max <= 0.0 {
            return Err(SimError::InvalidParameter("t_max must be > 0".into()));
        }
        if self.delta_n <= 0.0 {
            return Err(SimError::InvalidParameter("delta_n must be > 0".into()));
        }
        if self.tau <= 0.0 {
            return Err(SimError::InvalidParameter("tau must be > 0".into()));
        }
        if self.duo_update_time <= 0.0 {
            return Err(SimError::InvalidParameter(
                "duo_update_time must be > 0".into(),
            ));
        }
        if !(self.duo_update_weight > 0.0 && self.duo_update_weight <= 1.0) {
            return Err(SimError::InvalidParameter(
                "duo_update_weight must be in (0, 1]".into(),
            ));
        }
        if self.route_choice_uncertainty < 0.0 {
            return Err(SimError::InvalidParameter(
                "route_choice_uncertainty must be >= 0".into(),
            ));
        }
        Ok(())
    }

    pub fn num_steps(&self) -> u32 {
        (self.t_max / self.tau).ceil() as u32
    }

    pub fn duo_period_steps(&self) -> u32 {
        ((self.duo_update_time / self.tau).ceil() as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_tau() {
        let mut p = WorldParams::new("t", 100.0, 5.0, 1.0);
        p.tau = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_bad_duo_weight() {
        let mut p = WorldParams::new("t", 100.0, 5.0, 1.0);
        p.duo_update_weight = 1.5;
        assert!(p.validate().is_err());
        p.duo_update_weight = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn num_steps_rounds_up() {
        let p = WorldParams::new("t", 100.0, 5.0, 3.0);
        assert_eq!(p.num_steps(), 34);
    }
}
