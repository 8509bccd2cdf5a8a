//! ---
//! crm_section: "06-security-access-control"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Prometheus counters for guard decisions."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{IntCounterVec, Opts, Registry};
use r_crm_logging::AccessOutcome;

/// Guard decision counters exported via Prometheus.
#[derive(Clone)]
pub struct AccessMetrics {
    registry: Arc<Registry>,
    decisions_total: IntCounterVec,
}

impl std::fmt::Debug for AccessMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessMetrics").finish_non_exhaustive()
    }
}

impl AccessMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let decisions_total = IntCounterVec::new(
            Opts::new(
                "access_decisions_total",
                "Guard decisions partitioned by guard and outcome",
            ),
            &["guard", "outcome"],
        )?;
        registry.register(Box::new(decisions_total.clone()))?;
        Ok(Self {
            registry,
            decisions_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Count one decision of `guard`.
    pub fn record(&self, guard: &str, outcome: AccessOutcome) {
        self.decisions_total
            .with_label_values(&[guard, outcome.as_str()])
            .inc();
    }

    /// Current count for a guard/outcome pair.
    pub fn count(&self, guard: &str, outcome: AccessOutcome) -> u64 {
        self.decisions_total
            .with_label_values(&[guard, outcome.as_str()])
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_are_partitioned_by_label() {
        let registry = Arc::new(Registry::new());
        let metrics = AccessMetrics::new(registry.clone()).unwrap();
        metrics.record("route", AccessOutcome::Granted);
        metrics.record("route", AccessOutcome::Redirected);
        metrics.record("route", AccessOutcome::Redirected);
        assert_eq!(metrics.count("route", AccessOutcome::Redirected), 2);
        assert_eq!(metrics.count("inline", AccessOutcome::Denied), 0);
        assert_eq!(registry.gather().len(), 1);
    }

    #[test]
    fn double_registration_fails() {
        let registry = Arc::new(Registry::new());
        let _first = AccessMetrics::new(registry.clone()).unwrap();
        assert!(AccessMetrics::new(registry).is_err());
    }
}
