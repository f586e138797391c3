use std::collections::HashMap;

use parking_lot::RwLock;

use crate::Settings;

/// `omt://hostname:port` of a discovery server; empty for the default discovery.
pub const DISCOVERY_SERVER: &str = "DiscoveryServer";

/// The first port handed out to senders.
pub const NETWORK_PORT_START: &str = "NetworkPortStart";

/// The last port handed out to senders.
pub const NETWORK_PORT_END: &str = "NetworkPortEnd";

pub const DEFAULT_PORT_START: i32 = 6400;
pub const DEFAULT_PORT_END: i32 = 6600;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
	String(String),
	Integer(i32),
}

/// In-memory settings that last for the lifetime of the process.
pub struct LocalSettings {
	values: RwLock<HashMap<String, Value>>,
}

impl Default for LocalSettings {
	fn default() -> Self {
		let values = HashMap::from([
			(DISCOVERY_SERVER.to_string(), Value::String(String::new())),
			(NETWORK_PORT_START.to_string(), Value::Integer(DEFAULT_PORT_START)),
			(NETWORK_PORT_END.to_string(), Value::Integer(DEFAULT_PORT_END)),
		]);

		Self {
			values: RwLock::new(values),
		}
	}
}

impl LocalSettings {
	/// The inclusive port range for new senders.
	pub fn port_range(&self) -> (i32, i32) {
		let start = self.integer(NETWORK_PORT_START).unwrap_or(DEFAULT_PORT_START);
		let end = self.integer(NETWORK_PORT_END).unwrap_or(DEFAULT_PORT_END);
		(start, end)
	}
}

impl Settings for LocalSettings {
	fn string(&self, name: &str) -> Option<String> {
		match self.values.read().get(name)? {
			Value::String(value) => Some(value.clone()),
			Value::Integer(value) => Some(value.to_string()),
		}
	}

	fn set_string(&self, name: &str, value: &str) {
		tracing::debug!(name, value, "setting changed");
		self.values
			.write()
			.insert(name.to_string(), Value::String(value.to_string()));
	}

	fn integer(&self, name: &str) -> Option<i32> {
		match self.values.read().get(name)? {
			Value::Integer(value) => Some(*value),
			Value::String(value) => value.trim().parse().ok(),
		}
	}

	fn set_integer(&self, name: &str, value: i32) {
		tracing::debug!(name, value, "setting changed");
		self.values.write().insert(name.to_string(), Value::Integer(value));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let settings = LocalSettings::default();
		assert_eq!(settings.integer(NETWORK_PORT_START), Some(6400));
		assert_eq!(settings.string(NETWORK_PORT_END).as_deref(), Some("6600"));
		assert_eq!(settings.string(DISCOVERY_SERVER).as_deref(), Some(""));
		assert_eq!(settings.string("Missing"), None);
	}

	#[test]
	fn test_cross_type_reads() {
		let settings = LocalSettings::default();
		settings.set_string(NETWORK_PORT_START, " 7000 ");
		assert_eq!(settings.integer(NETWORK_PORT_START), Some(7000));
		assert_eq!(settings.port_range(), (7000, 6600));

		settings.set_string(DISCOVERY_SERVER, "omt://server:6399");
		assert_eq!(settings.integer(DISCOVERY_SERVER), None);
	}
}
