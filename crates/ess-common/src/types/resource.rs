//! Resource renewal sub-model
//!
//! ```text
//! ρ(L) = ρ_max × (1 − L)²
//! ```
//!
//! Where L is the lock-in index in [0, 1]. Renewal falls quadratically as
//! institutional rigidity rises; at L = 1 the resource no longer renews.

use serde::{Deserialize, Serialize};

/// Default maximum renewal rate (ρ_max)
pub const DEFAULT_MAX_RENEWAL_RATE: f64 = 0.5;

/// Parameters of the renewable resource
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceParameters {
    /// Maximum renewal rate (ρ_max), reached at lock-in 0
    pub max_renewal_rate: f64,
}

impl Default for ResourceParameters {
    fn default() -> Self {
        Self {
            max_renewal_rate: DEFAULT_MAX_RENEWAL_RATE,
        }
    }
}

impl ResourceParameters {
    /// Parameters with a calibrated ρ_max
    pub fn with_max_renewal_rate(max_renewal_rate: f64) -> Self {
        Self { max_renewal_rate }
    }

    /// Renewal rate at a lock-in index
    #[inline]
    pub fn renewal_rate(&self, lock_in_index: f64) -> f64 {
        let complement = 1.0 - lock_in_index;
        self.max_renewal_rate * complement * complement
    }

    /// Renewal rate as a fraction of ρ_max (0 when ρ_max is 0)
    pub fn renewal_fraction(&self, lock_in_index: f64) -> f64 {
        if self.max_renewal_rate == 0.0 {
            return 0.0;
        }
        self.renewal_rate(lock_in_index) / self.max_renewal_rate
    }
}
