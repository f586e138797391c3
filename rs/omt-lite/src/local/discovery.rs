use std::sync::Arc;

use super::Network;
use crate::{Discovery, Error};

/// Lists the senders registered with the same [super::LocalEngine].
pub struct LocalDiscovery {
	network: Arc<Network>,
}

impl LocalDiscovery {
	pub(crate) fn new(network: Arc<Network>) -> Self {
		Self { network }
	}
}

impl Discovery for LocalDiscovery {
	fn addresses(&self) -> Result<Vec<String>, Error> {
		let mut addresses: Vec<String> = self
			.network
			.live()
			.into_iter()
			.map(|sender| sender.address.clone())
			.collect();
		addresses.sort();

		tracing::trace!(count = addresses.len(), "discovered");
		Ok(addresses)
	}
}
