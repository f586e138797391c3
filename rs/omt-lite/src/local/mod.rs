//! An engine that connects senders and receivers living in the same process.
//!
//! No bytes touch the network: frames are handed over through bounded per-kind queues.
//! Senders still get a port from the configured range so that `omt://host:port` addresses resolve.

mod discovery;
mod receive;
mod send;

pub use discovery::*;
pub use receive::*;
pub use send::*;

use send::SenderState;

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use url::Url;

use crate::{
	Engine, Error, FrameTypes, LocalSettings, PreferredVideoFormat, Quality, ReceiveFlags, Settings, Timeout,
};

const URL_PREFIX: &str = "omt://";

// Queue depths per frame kind, in frames.
const VIDEO_QUEUE: usize = 4;
const AUDIO_QUEUE: usize = 10;
const METADATA_QUEUE: usize = 60;

/// Used when the caller leaves the timeout up to the engine.
const DEFAULT_TIMEOUT: Duration = Duration::ZERO;

fn timeout_or_default(timeout: Timeout) -> Duration {
	timeout.unwrap_or(DEFAULT_TIMEOUT)
}

/// The in-process engine.
#[derive(Clone)]
pub struct LocalEngine {
	network: Arc<Network>,
	settings: Arc<LocalSettings>,
}

impl Default for LocalEngine {
	fn default() -> Self {
		let host = std::env::var("HOSTNAME")
			.or_else(|_| std::env::var("COMPUTERNAME"))
			.unwrap_or_else(|_| "localhost".to_string());
		Self::new(&host)
	}
}

impl LocalEngine {
	pub fn new(host: &str) -> Self {
		Self {
			network: Arc::new(Network::new(host)),
			settings: Arc::default(),
		}
	}

	pub fn sender(&self, name: &str, quality: Quality) -> Result<LocalSender, Error> {
		LocalSender::new(self.network.clone(), &self.settings, name, quality)
	}

	pub fn receiver(
		&self,
		address: &str,
		frame_types: FrameTypes,
		format: PreferredVideoFormat,
		flags: ReceiveFlags,
	) -> Result<LocalReceiver, Error> {
		LocalReceiver::new(self.network.clone(), address, frame_types, format, flags)
	}
}

impl Engine for LocalEngine {
	fn send(&self, name: &str, quality: Quality) -> Result<Box<dyn crate::Sender>, Error> {
		Ok(Box::new(self.sender(name, quality)?))
	}

	fn receive(
		&self,
		address: &str,
		frame_types: FrameTypes,
		format: PreferredVideoFormat,
		flags: ReceiveFlags,
	) -> Result<Box<dyn crate::Receiver>, Error> {
		Ok(Box::new(self.receiver(address, frame_types, format, flags)?))
	}

	fn discovery(&self) -> Result<Box<dyn crate::Discovery>, Error> {
		Ok(Box::new(LocalDiscovery::new(self.network.clone())))
	}

	fn settings(&self) -> &dyn Settings {
		self.settings.as_ref()
	}
}

/// Every live sender, indexed by port.
pub(crate) struct Network {
	host: String,
	senders: Mutex<BTreeMap<i32, Weak<SenderState>>>,
}

impl Network {
	fn new(host: &str) -> Self {
		Self {
			host: host.to_uppercase(),
			senders: Default::default(),
		}
	}

	/// Reserve the lowest free port in `range` and register the sender built for it.
	fn publish<F>(&self, range: (i32, i32), build: F) -> Result<Arc<SenderState>, Error>
	where
		F: FnOnce(&str, i32) -> SenderState,
	{
		let mut senders = self.senders.lock();
		senders.retain(|_, sender| sender.strong_count() > 0);

		let (start, end) = range;
		let port = (start..=end)
			.find(|port| !senders.contains_key(port))
			.ok_or(Error::PortsExhausted(start, end))?;

		let state = Arc::new(build(&self.host, port));
		senders.insert(port, Arc::downgrade(&state));

		Ok(state)
	}

	fn unpublish(&self, port: i32) {
		self.senders.lock().remove(&port);
	}

	fn live(&self) -> Vec<Arc<SenderState>> {
		self.senders.lock().values().filter_map(Weak::upgrade).collect()
	}

	/// Find the sender for a discovery name or an `omt://host:port` URL.
	fn lookup(&self, address: &str) -> Result<Option<Arc<SenderState>>, Error> {
		if address.starts_with(URL_PREFIX) {
			let url = Url::parse(address)?;
			let port = url
				.port()
				.ok_or_else(|| Error::InvalidAddress(address.to_string()))?;
			let sender = self.senders.lock().get(&i32::from(port)).and_then(Weak::upgrade);
			return Ok(sender);
		}

		Ok(self
			.live()
			.into_iter()
			.find(|sender| sender.address.eq_ignore_ascii_case(address)))
	}
}

fn validate_address(address: &str) -> Result<(), Error> {
	if address.trim().is_empty() {
		return Err(Error::InvalidAddress(address.to_string()));
	}

	if address.starts_with(URL_PREFIX) {
		Url::parse(address)?
			.port()
			.ok_or_else(|| Error::InvalidAddress(address.to_string()))?;
	}

	Ok(())
}
