//! Load: layered configuration (defaults, files, environment).

use anyhow::{Context, Result};

use super::model::EngineConfig;
use crate::watcher::schedule::Schedule;

const CONFIG_PATHS: &[&str] = &[
    "/etc/fleet/engine",
    "config/engine",
    "crates/fleetd/config/engine",
];

const MIN_SECRET_LEN: usize = 16;

impl EngineConfig {
    /// Load configuration from engine.toml and environment variables
    /// Priority: Environment Variables > Config Files > Defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from(CONFIG_PATHS)
    }

    /// Same layering as [`EngineConfig::load`] over an explicit list of files.
    pub fn load_from(paths: &[&str]) -> Result<Self> {
        let defaults = config::Config::try_from(&EngineConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        for path in paths {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Double underscore for nested keys: FLEET_VAULT__SECRET
        builder = builder.add_source(
            config::Environment::with_prefix("FLEET")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.vault.secret.len() < MIN_SECRET_LEN {
            anyhow::bail!(
                "vault.secret must be at least {} characters (set FLEET_VAULT__SECRET)",
                MIN_SECRET_LEN
            );
        }
        if self.vault.default_vault_id.is_empty() {
            anyhow::bail!("vault.default_vault_id must not be empty");
        }
        if self.runtime.operation_timeout_secs == 0 {
            anyhow::bail!("runtime.operation_timeout_secs must be > 0");
        }
        if self.runtime.events_reconnect_secs == 0 {
            anyhow::bail!("runtime.events_reconnect_secs must be > 0");
        }
        if self.notifications.capacity == 0 {
            anyhow::bail!("notifications.capacity must be > 0");
        }
        if self.automation.check_playbook_ref.is_empty() {
            anyhow::bail!("automation.check_playbook_ref must not be empty");
        }

        Schedule::parse(&self.runtime.default_watch_schedule)
            .context("Invalid runtime.default_watch_schedule")?;
        Schedule::parse(&self.runtime.default_stats_schedule)
            .context("Invalid runtime.default_stats_schedule")?;

        Ok(())
    }
}
