use std::ffi::c_int;
use std::sync::Arc;

use omt_lite::{Connection, MediaFrame, Timeout};
use parking_lot::RwLock;

use crate::{Error, OMTMediaFrame, OMTStatistics, OMTTally, RetainedFrame, Slot};

/// Behavior shared by the send and receive facades.
///
/// Owns the engine connection and the metadata slot. Once disposed, every operation is a no-op
/// returning its neutral value.
pub(crate) struct Base<C: ?Sized> {
	connection: RwLock<Option<Arc<C>>>,
	metadata: Slot<RetainedFrame>,
}

impl<C: ?Sized + Connection> Base<C> {
	pub fn new(connection: Box<C>) -> Self {
		Self {
			connection: RwLock::new(Some(Arc::from(connection))),
			metadata: Slot::default(),
		}
	}

	/// The live connection, if not disposed.
	///
	/// Cloned out so blocking engine calls don't hold the lock.
	pub fn connection(&self) -> Option<Arc<C>> {
		self.connection.read().clone()
	}

	pub fn tally(&self, timeout: Timeout, out: Option<&mut OMTTally>) -> Result<c_int, Error> {
		let Some(connection) = self.connection() else {
			return Ok(0);
		};

		let (changed, tally) = connection.tally(timeout)?;
		if let Some(out) = out {
			*out = tally.into();
		}

		Ok(changed.into())
	}

	pub fn video_statistics(&self, out: Option<&mut OMTStatistics>) {
		if let (Some(connection), Some(out)) = (self.connection(), out) {
			*out = connection.video_statistics().into();
		}
	}

	pub fn audio_statistics(&self, out: Option<&mut OMTStatistics>) {
		if let (Some(connection), Some(out)) = (self.connection(), out) {
			*out = connection.audio_statistics().into();
		}
	}

	pub fn retain_metadata(&self, frame: MediaFrame) -> Result<*mut OMTMediaFrame, Error> {
		let frame = RetainedFrame::new(frame)?;
		Ok(self.metadata.put(frame, RetainedFrame::as_ptr))
	}

	pub fn is_disposed(&self) -> bool {
		self.connection.read().is_none()
	}

	/// Free the retained metadata, then release the connection. Safe to call more than once.
	pub fn dispose(&self) {
		self.metadata.clear();
		self.connection.write().take();
	}
}
