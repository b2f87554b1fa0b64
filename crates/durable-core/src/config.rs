use std::time::Duration;

const DEFAULT_MAX_CONCURRENT: usize = 64;
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Orchestrator-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Invocations allowed to run at once; the rest wait for a permit.
    pub max_concurrent: usize,
    /// Timeout for tasks whose [`TaskConfig`](durable_model::TaskConfig) sets none.
    pub default_timeout: Option<Duration>,
    /// How long `shutdown` waits for workers to drain.
    pub shutdown_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            default_timeout: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_concurrency_is_clamped() {
        let cfg = OrchestratorConfig::default().with_max_concurrent(0);
        assert_eq!(cfg.max_concurrent, 1);
    }
}
