use std::sync::{Arc, OnceLock};

use omt_lite::{Engine, FrameTypes, LocalEngine, PreferredVideoFormat, Quality, ReceiveFlags, Settings};
use parking_lot::Mutex;

use crate::{DiscoveryFacade, Error, Id, ReceiveFacade, Registry, SendFacade};

pub(crate) enum Instance {
	Send(SendFacade),
	Receive(ReceiveFacade),
}

impl Instance {
	pub fn as_send(&self) -> Result<&SendFacade, Error> {
		match self {
			Instance::Send(send) => Ok(send),
			Instance::Receive(_) => Err(Error::WrongHandle),
		}
	}

	pub fn as_receive(&self) -> Result<&ReceiveFacade, Error> {
		match self {
			Instance::Receive(receive) => Ok(receive),
			Instance::Send(_) => Err(Error::WrongHandle),
		}
	}
}

/// Everything the exports share: the engine, every live handle and the discovery.
pub(crate) struct Context {
	engine: Arc<dyn Engine>,
	instances: Registry<Instance>,

	// Created on first use.
	discovery: Mutex<Option<Arc<DiscoveryFacade>>>,
}

static CONTEXT: OnceLock<Context> = OnceLock::new();

/// Use `engine` for every export instead of the in-process default.
///
/// Must be called before the first export; fails once the context exists.
pub fn install<E: Engine>(engine: E) -> Result<(), Error> {
	let mut installed = false;
	CONTEXT.get_or_init(|| {
		installed = true;
		Context::new(Arc::new(engine))
	});

	if installed {
		Ok(())
	} else {
		Err(Error::AlreadyInstalled)
	}
}

impl Context {
	pub fn new(engine: Arc<dyn Engine>) -> Self {
		Self {
			engine,
			instances: Registry::default(),
			discovery: Mutex::new(None),
		}
	}

	/// The process-wide context, created with a [LocalEngine] unless one was installed.
	pub fn global() -> &'static Context {
		CONTEXT.get_or_init(|| Context::new(Arc::new(LocalEngine::default())))
	}

	pub fn settings(&self) -> &dyn Settings {
		self.engine.settings()
	}

	pub fn send_create(&self, name: &str, quality: Quality) -> Result<Id, Error> {
		let sender = self.engine.send(name, quality)?;
		let id = self.instances.insert(Instance::Send(SendFacade::new(sender)))?;
		tracing::debug!(%id, name, "send created");
		Ok(id)
	}

	pub fn receive_create(
		&self,
		address: &str,
		frame_types: FrameTypes,
		format: PreferredVideoFormat,
		flags: ReceiveFlags,
	) -> Result<Id, Error> {
		let receiver = self.engine.receive(address, frame_types, format, flags)?;
		let id = self.instances.insert(Instance::Receive(ReceiveFacade::new(receiver)))?;
		tracing::debug!(%id, address, "receive created");
		Ok(id)
	}

	pub fn get(&self, id: Id) -> Result<Arc<Instance>, Error> {
		self.instances.get(id).ok_or(Error::NotFound)
	}

	/// Dispose of a send handle and invalidate it.
	pub fn send_destroy(&self, id: Id) -> Result<(), Error> {
		self.get(id)?.as_send()?.dispose();
		self.free(id)
	}

	/// Dispose of a receive handle and invalidate it.
	pub fn receive_destroy(&self, id: Id) -> Result<(), Error> {
		self.get(id)?.as_receive()?.dispose();
		self.free(id)
	}

	fn free(&self, id: Id) -> Result<(), Error> {
		self.instances.remove(id).ok_or(Error::NotFound)?;
		tracing::debug!(%id, remaining = self.instances.len(), "handle freed");
		Ok(())
	}

	pub fn discovery(&self) -> Result<Arc<DiscoveryFacade>, Error> {
		let mut discovery = self.discovery.lock();
		if let Some(discovery) = discovery.as_ref() {
			return Ok(discovery.clone());
		}

		let facade = Arc::new(DiscoveryFacade::new(self.engine.discovery()?));
		*discovery = Some(facade.clone());
		Ok(facade)
	}
}
