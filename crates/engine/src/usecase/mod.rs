//! Use cases: the operations callers invoke against an [`EngineContext`].
//!
//! Each submodule adds an `impl EngineContext` block for one area.
//!
//! [`EngineContext`]: crate::context::EngineContext

pub mod auth;
pub mod connection;
pub mod container;
pub mod device;

pub use connection::{ProbeResult, ProbeStatus, TaskHandle};
pub use device::{DeviceOverviewEntry, DevicesOverview, FactsReport};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::automation::runner::MockPlaybookRunner;
    use crate::client::FakeConnector;
    use crate::conf::EngineConfig;
    use crate::context::EngineContext;
    use crate::store::Store;

    pub fn context() -> (EngineContext, Arc<FakeConnector>) {
        context_with_runner(MockPlaybookRunner::new())
    }

    pub fn context_with_runner(runner: MockPlaybookRunner) -> (EngineContext, Arc<FakeConnector>) {
        let mut config = EngineConfig::default();
        config.vault.secret = "usecase-test-secret".to_string();
        config.runtime.operation_timeout_secs = 2;

        let connector = Arc::new(FakeConnector::new());
        let ctx = EngineContext::new(config, Store::in_memory(), connector.clone(), move |_| {
            Arc::new(runner)
        });
        (ctx, connector)
    }
}
