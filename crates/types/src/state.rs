//! The migration coordinator's state machine (§4.F).

use std::fmt;

/// Lifecycle of a single migration coordinator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    LogicDeployed,
    ProxyDeployed,
    Migrated,
    Synchronizing,
    Failed,
}

impl EngineState {
    /// Whether `init()` may run from this state.
    pub fn can_init(self) -> bool {
        matches!(self, EngineState::Uninitialized)
    }

    /// Whether `migrateSrcContract` may run from this state.
    pub fn can_migrate_src_contract(self) -> bool {
        matches!(self, EngineState::Initialized)
    }

    /// Whether `migrateChangesToProxy` may run from this state.
    pub fn can_migrate_changes(self) -> bool {
        matches!(self, EngineState::Migrated)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Uninitialized => "Uninitialized",
            EngineState::Initialized => "Initialized",
            EngineState::LogicDeployed => "LogicDeployed",
            EngineState::ProxyDeployed => "ProxyDeployed",
            EngineState::Migrated => "Migrated",
            EngineState::Synchronizing => "Synchronizing",
            EngineState::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_uninitialized_can_init() {
        assert!(EngineState::Uninitialized.can_init());
        assert!(!EngineState::Initialized.can_init());
    }

    #[test]
    fn only_migrated_accepts_incremental_changes() {
        assert!(EngineState::Migrated.can_migrate_changes());
        assert!(!EngineState::ProxyDeployed.can_migrate_changes());
    }
}
