use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`ResourceLock`](crate::ResourceLock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
	/// Timeout used by `acquire_default`, in milliseconds.
	#[serde(default = "default_timeout_ms")]
	pub default_timeout_ms: u64,
}

/// Returns the default acquire timeout in milliseconds.
fn default_timeout_ms() -> u64 {
	30_000
}

impl Default for LockConfig {
	fn default() -> Self {
		Self {
			default_timeout_ms: default_timeout_ms(),
		}
	}
}

impl LockConfig {
	/// Parses a config from TOML text. Missing fields take their defaults.
	pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(text)
	}

	/// Default acquire timeout.
	pub fn default_timeout(&self) -> Duration {
		Duration::from_millis(self.default_timeout_ms)
	}
}
