// ── Engine configuration ──
//
// Tuning for a single drill-down explorer. Built by the host (CLI,
// config crate) and handed to `DrillController`; the core never reads
// files or the environment.

use std::time::Duration;

use crate::error::CoreError;

/// Configuration for one hierarchy explorer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrillConfig {
    /// Deepest depth that still has children. Nodes at this depth are
    /// terminal and never fetched. `None` leaves it to the fetcher.
    pub max_depth: Option<usize>,
    /// Upper bound on a single fetch. An elapsed timeout is recorded as
    /// a regular fetch failure.
    pub fetch_timeout: Option<Duration>,
}

impl DrillConfig {
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fetch_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CoreError::Config {
                message: "fetch_timeout must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = DrillConfig::default().with_fetch_timeout(Duration::ZERO);
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));
        assert!(DrillConfig::default().with_max_depth(2).validate().is_ok());
    }
}
