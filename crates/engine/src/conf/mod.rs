//! Conf module: configuration model and layered loading.

pub mod model;
pub mod load;

pub use model::{
    AutomationConfig, EngineConfig, LogFormat, LogOutput, LoggingConfig, NotificationConfig,
    RuntimeConfig, VaultConfig,
};
