use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Configuration for document synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Capacity of each document's event channel.
	///
	/// Subscribers that fall further behind than this observe a lag.
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
	/// Send a version bump with no content change as an empty delta chain
	/// instead of skipping it.
	#[serde(default)]
	pub announce_empty_deltas: bool,
}

/// Returns the default per-document event channel capacity.
fn default_event_capacity() -> usize {
	64
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			event_capacity: default_event_capacity(),
			announce_empty_deltas: false,
		}
	}
}

impl SyncConfig {
	/// Parses a config from TOML text. Missing fields take their defaults.
	pub fn from_toml(text: &str) -> Result<Self> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses a TOML config file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		Self::from_toml(&std::fs::read_to_string(path)?)
	}
}
