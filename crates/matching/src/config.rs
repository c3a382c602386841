// Copyright 2025 chenjjiaa
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};

use crate::engine::{EngineConfig, MAX_ITERATIONS};

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory component name
pub const LOG_COMPONENT_NAME: &str = "matching";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

/// Default capacity of the notification queue
pub const DEFAULT_NOTIFICATION_QUEUE_SIZE: usize = 1_024;

/// Matching service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
	/// Optimizer options
	pub engine: EngineConfig,
	/// Bounded capacity of the notification queue
	pub notification_queue_size: usize,
	/// Log every decoded trade and persisted record
	pub verbose_logging: bool,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			engine: EngineConfig::default(),
			notification_queue_size: DEFAULT_NOTIFICATION_QUEUE_SIZE,
			verbose_logging: false,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from environment variables
	///
	/// Nested keys use a double underscore, e.g. `MATCHING_ENGINE__ITERATIONS=50`.
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(
				config::Environment::with_prefix("MATCHING")
					.separator("__")
					.try_parsing(true),
			)
			.build()?;

		let parsed: Self = cfg.try_deserialize()?;
		parsed.validate()?;
		Ok(parsed)
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(
				config::Environment::with_prefix("MATCHING")
					.separator("__")
					.try_parsing(true),
			)
			.build()?;

		let parsed: Self = cfg.try_deserialize()?;
		parsed.validate()?;
		Ok(parsed)
	}

	/// Reject settings that would leave a run unbounded or unable to notify
	pub fn validate(&self) -> Result<(), config::ConfigError> {
		if self.engine.iterations == 0 || self.engine.iterations > MAX_ITERATIONS {
			return Err(config::ConfigError::Message(format!(
				"engine.iterations must be within 1..={}, got {}",
				MAX_ITERATIONS, self.engine.iterations
			)));
		}
		if self.notification_queue_size == 0 {
			return Err(config::ConfigError::Message(
				"notification_queue_size must be greater than zero".to_string(),
			));
		}
		Ok(())
	}
}
