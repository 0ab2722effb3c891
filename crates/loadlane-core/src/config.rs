//! Run configuration.
//!
//! Sources, in order of precedence: `LOADLANE_`-prefixed environment
//! variables, a file named by `LOADLANE_CONFIG`, `./config/loadlane.*`,
//! then hardcoded defaults.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for one load run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Base URL of the server under test.
    pub server_url: String,

    /// Websocket endpoint for live-report subscriptions.
    pub websocket_url: String,

    /// Number of simulated users (worker threads).
    pub users: u64,

    /// Iterations each user runs before exiting.
    pub iterations_per_user: u64,

    /// Lower bound of the think time between iterations.
    pub wait_time_min_ms: u64,

    /// Upper bound of the think time between iterations.
    pub wait_time_max_ms: u64,

    /// Where the request log is written when the run ends.
    pub output_csv: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9080".to_string(),
            websocket_url: "ws://localhost:9080/ws".to_string(),
            users: 1,
            iterations_per_user: 1,
            wait_time_min_ms: 1000,
            wait_time_max_ms: 3000,
            output_csv: "requests.csv".to_string(),
        }
    }
}

impl RunConfig {
    /// Load configuration from the layered sources.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a source is malformed or validation
    /// fails.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("LOADLANE_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }
        builder = builder.add_source(File::with_name("./config/loadlane").required(false));

        // Example: LOADLANE_WAIT_TIME_MIN_MS=500
        builder = builder.add_source(
            Environment::with_prefix("LOADLANE")
                .separator("__")
                .try_parsing(true),
        );

        let config: RunConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from one specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the file is missing or malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: RunConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Self::default();
        builder
            .set_default("server_url", defaults.server_url)?
            .set_default("websocket_url", defaults.websocket_url)?
            .set_default("users", defaults.users)?
            .set_default("iterations_per_user", defaults.iterations_per_user)?
            .set_default("wait_time_min_ms", defaults.wait_time_min_ms)?
            .set_default("wait_time_max_ms", defaults.wait_time_max_ms)?
            .set_default("output_csv", defaults.output_csv)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users == 0 {
            return Err(ConfigError::Message("users must be > 0".to_string()));
        }
        if self.iterations_per_user == 0 {
            return Err(ConfigError::Message(
                "iterations_per_user must be > 0".to_string(),
            ));
        }
        if self.wait_time_max_ms < self.wait_time_min_ms {
            return Err(ConfigError::Message(
                "wait_time_max_ms must be >= wait_time_min_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Think-time lower bound as a `Duration`.
    #[must_use]
    pub fn wait_time_min(&self) -> Duration {
        Duration::from_millis(self.wait_time_min_ms)
    }

    /// Think-time upper bound as a `Duration`.
    #[must_use]
    pub fn wait_time_max(&self) -> Duration {
        Duration::from_millis(self.wait_time_max_ms)
    }
}
