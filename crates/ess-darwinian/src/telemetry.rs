//! Prometheus metrics for stability solves
//!
//! Metrics are owned by the caller: build a [`SolverMetrics`], register it on
//! a registry, and hand it to a solver with `with_metrics`.

use ess_common::StabilityKind;

/// Solver counters and histograms
#[derive(Clone)]
pub struct SolverMetrics {
    pub solves_total: prometheus::IntCounter,
    pub non_converged_total: prometheus::IntCounter,
    pub classifications_total: prometheus::IntCounterVec,
    pub integration_steps: prometheus::Histogram,
    pub degenerate_landscapes_total: prometheus::IntCounter,
}

impl SolverMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            solves_total: prometheus::IntCounter::new(
                "ess_solves_total",
                "Total stability solves completed",
            )?,
            non_converged_total: prometheus::IntCounter::new(
                "ess_non_converged_total",
                "Solves that reached t_max without converging",
            )?,
            classifications_total: prometheus::IntCounterVec::new(
                prometheus::Opts::new(
                    "ess_classifications_total",
                    "Equilibria by stability classification",
                ),
                &["kind"],
            )?,
            integration_steps: prometheus::Histogram::with_opts(
                prometheus::HistogramOpts::new(
                    "ess_integration_steps",
                    "Integration steps per solve",
                )
                .buckets(prometheus::exponential_buckets(10.0, 10.0, 7)?),
            )?,
            degenerate_landscapes_total: prometheus::IntCounter::new(
                "ess_degenerate_landscapes_total",
                "Solves aborted on a zero carrying capacity",
            )?,
        })
    }

    pub fn register(&self, registry: &prometheus::Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.solves_total.clone()))?;
        registry.register(Box::new(self.non_converged_total.clone()))?;
        registry.register(Box::new(self.classifications_total.clone()))?;
        registry.register(Box::new(self.integration_steps.clone()))?;
        registry.register(Box::new(self.degenerate_landscapes_total.clone()))?;
        Ok(())
    }

    /// Record a finished solve
    pub fn observe_solve(&self, kind: StabilityKind, converged: bool, steps: usize) {
        self.solves_total.inc();
        if !converged {
            self.non_converged_total.inc();
        }
        self.classifications_total
            .with_label_values(&[kind.as_str()])
            .inc();
        self.integration_steps.observe(steps as f64);
    }
}

impl std::fmt::Debug for SolverMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverMetrics")
            .field("solves_total", &self.solves_total.get())
            .field("non_converged_total", &self.non_converged_total.get())
            .field("degenerate_landscapes_total", &self.degenerate_landscapes_total.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_observe() {
        let registry = prometheus::Registry::new();
        let metrics = SolverMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        metrics.observe_solve(StabilityKind::Ess, true, 500);
        metrics.observe_solve(StabilityKind::Unknown, false, 50_000);

        assert_eq!(metrics.solves_total.get(), 2);
        assert_eq!(metrics.non_converged_total.get(), 1);
        assert_eq!(
            metrics.classifications_total.with_label_values(&["ESS"]).get(),
            1
        );
        assert_eq!(metrics.integration_steps.get_sample_count(), 2);
        assert!(!registry.gather().is_empty());
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = prometheus::Registry::new();
        let metrics = SolverMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());
    }
}
