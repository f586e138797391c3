use std::ffi::c_int;
use std::ops::Deref;

use omt_lite::{FrameType, MediaFrame, SenderInfo, Timeout};

use crate::{ffi, Base, Error, OMTMediaFrame};

pub(crate) struct SendFacade {
	base: Base<dyn omt_lite::Sender>,
}

impl Deref for SendFacade {
	type Target = Base<dyn omt_lite::Sender>;

	fn deref(&self) -> &Self::Target {
		&self.base
	}
}

impl SendFacade {
	pub fn new(sender: Box<dyn omt_lite::Sender>) -> Self {
		Self { base: Base::new(sender) }
	}

	pub fn send(&self, frame: MediaFrame) -> Result<c_int, Error> {
		let Some(sender) = self.connection() else {
			return Ok(0);
		};

		Ok(ffi::to_int(sender.send(frame)?))
	}

	pub fn address(&self) -> Option<String> {
		Some(self.connection()?.address())
	}

	pub fn set_redirect(&self, address: Option<&str>) -> Result<(), Error> {
		if let Some(sender) = self.connection() {
			sender.set_redirect(address)?;
		}
		Ok(())
	}

	/// Wait for metadata sent back by a receiver.
	pub fn receive(&self, timeout: Timeout) -> Result<*mut OMTMediaFrame, Error> {
		let Some(sender) = self.connection() else {
			return Ok(std::ptr::null_mut());
		};

		match sender.receive(timeout)? {
			Some(frame) if frame.kind() == FrameType::Metadata => self.retain_metadata(frame),
			_ => Ok(std::ptr::null_mut()),
		}
	}

	pub fn connections(&self) -> c_int {
		self.connection()
			.map_or(0, |sender| ffi::to_int(sender.connections()))
	}

	pub fn add_connection_metadata(&self, metadata: &str) -> Result<(), Error> {
		if let Some(sender) = self.connection() {
			sender.add_connection_metadata(metadata)?;
		}
		Ok(())
	}

	pub fn clear_connection_metadata(&self) {
		if let Some(sender) = self.connection() {
			sender.clear_connection_metadata();
		}
	}

	pub fn set_sender_information(&self, info: SenderInfo) {
		if let Some(sender) = self.connection() {
			sender.set_sender_information(info);
		}
	}
}
