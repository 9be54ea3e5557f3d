//! Fixed-step explicit integrator for autonomous ODE systems
//!
//! Classic fourth-order Runge-Kutta. The state is checked for NaN/Inf before
//! every stage and after every step, so a blow-up surfaces as
//! [`IntegrationError::IntegrationDiverged`] instead of leaking into callers.

use ess_common::{IntegrationError, Result};

/// Right-hand side `dy/dt = f(y)` of an ODE system
pub trait DynamicalSystem {
    /// Length of the state vector
    fn dim(&self) -> usize;

    /// Write `f(state)` into `out`
    fn derivative(&self, state: &[f64], out: &mut [f64]) -> Result<()>;
}

/// Reusable RK4 stepper
///
/// Holds the stage buffers so a long run allocates once.
#[derive(Debug, Clone)]
pub struct Rk4 {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    probe: Vec<f64>,
}

impl Rk4 {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            probe: vec![0.0; dim],
        }
    }

    /// Advance `state` in place by `h`
    ///
    /// `time` and `step` only label the error on divergence.
    pub fn step<S: DynamicalSystem + ?Sized>(
        &mut self,
        system: &S,
        state: &mut [f64],
        h: f64,
        time: f64,
        step: usize,
    ) -> Result<()> {
        let diverged = IntegrationError::IntegrationDiverged { time, step };

        if !all_finite(state) {
            return Err(diverged.into());
        }
        system.derivative(state, &mut self.k1)?;

        stage(&mut self.probe, state, &self.k1, 0.5 * h);
        if !all_finite(&self.probe) {
            return Err(diverged.into());
        }
        system.derivative(&self.probe, &mut self.k2)?;

        stage(&mut self.probe, state, &self.k2, 0.5 * h);
        if !all_finite(&self.probe) {
            return Err(diverged.into());
        }
        system.derivative(&self.probe, &mut self.k3)?;

        stage(&mut self.probe, state, &self.k3, h);
        if !all_finite(&self.probe) {
            return Err(diverged.into());
        }
        system.derivative(&self.probe, &mut self.k4)?;

        let sixth = h / 6.0;
        for i in 0..state.len() {
            state[i] += sixth * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
        }

        if !all_finite(state) {
            return Err(IntegrationError::IntegrationDiverged {
                time: time + h,
                step: step + 1,
            }
            .into());
        }
        Ok(())
    }
}

#[inline]
fn stage(out: &mut [f64], base: &[f64], slope: &[f64], h: f64) {
    for ((o, b), k) in out.iter_mut().zip(base).zip(slope) {
        *o = b + h * k;
    }
}

#[inline]
fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ess_common::EssError;

    /// dy/dt = −y
    struct Decay;

    impl DynamicalSystem for Decay {
        fn dim(&self) -> usize {
            1
        }

        fn derivative(&self, state: &[f64], out: &mut [f64]) -> Result<()> {
            out[0] = -state[0];
            Ok(())
        }
    }

    /// dy/dt = y², blows up at t = 1 from y(0) = 1
    struct Blowup;

    impl DynamicalSystem for Blowup {
        fn dim(&self) -> usize {
            1
        }

        fn derivative(&self, state: &[f64], out: &mut [f64]) -> Result<()> {
            out[0] = state[0] * state[0];
            Ok(())
        }
    }

    #[test]
    fn test_rk4_matches_exponential_decay() {
        let mut rk4 = Rk4::new(Decay.dim());
        let mut y = [1.0];
        let h = 0.01;
        for i in 0..100 {
            rk4.step(&Decay, &mut y, h, i as f64 * h, i).unwrap();
        }
        assert!((y[0] - (-1.0_f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_blowup_reports_divergence() {
        let mut rk4 = Rk4::new(Blowup.dim());
        let mut y = [1.0];
        let h = 0.5;
        let mut result = Ok(());
        for i in 0..20 {
            result = rk4.step(&Blowup, &mut y, h, i as f64 * h, i);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(
            result,
            Err(EssError::Integration(IntegrationError::IntegrationDiverged { .. }))
        ));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut rk4 = Rk4::new(1);
        let mut y = [f64::NAN];
        let err = rk4.step(&Decay, &mut y, 0.1, 0.0, 0).unwrap_err();
        assert!(matches!(
            err,
            EssError::Integration(IntegrationError::IntegrationDiverged { step: 0, .. })
        ));
    }
}
