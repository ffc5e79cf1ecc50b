//! Injector settings

/// What happens to providers synthesized during a resolution that fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitPolicy {
    /// All or nothing: a failed resolution leaves the registry untouched
    #[default]
    Transactional,
    /// Nested providers are committed as soon as they are built and stay
    /// registered even if the outer resolution fails
    Eager,
}

/// Settings of an [crate::Injector]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub commit: CommitPolicy,
    /// Fail with [crate::WiringError::CyclicDependency] instead of recursing forever
    pub detect_cycles: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            commit: CommitPolicy::Transactional,
            detect_cycles: true,
        }
    }
}

impl Config {
    pub fn with_commit(mut self, commit: CommitPolicy) -> Self {
        self.commit = commit;
        self
    }

    pub fn with_cycle_detection(mut self, enabled: bool) -> Self {
        self.detect_cycles = enabled;
        self
    }
}
