use std::ffi::c_int;
use std::ops::Deref;

use omt_lite::{FrameType, FrameTypes, MediaFrame, Quality, ReceiveFlags, SenderInfo, Tally, Timeout};

use crate::{ffi, Base, Error, OMTMediaFrame, RetainedFrame, Slot};

pub(crate) struct ReceiveFacade {
	base: Base<dyn omt_lite::Receiver>,
	video: Slot<RetainedFrame>,
	audio: Slot<RetainedFrame>,
}

impl Deref for ReceiveFacade {
	type Target = Base<dyn omt_lite::Receiver>;

	fn deref(&self) -> &Self::Target {
		&self.base
	}
}

impl ReceiveFacade {
	pub fn new(receiver: Box<dyn omt_lite::Receiver>) -> Self {
		Self {
			base: Base::new(receiver),
			video: Slot::default(),
			audio: Slot::default(),
		}
	}

	/// Wait for the next frame, retained in the slot for its kind.
	pub fn receive(&self, frame_types: FrameTypes, timeout: Timeout) -> Result<*mut OMTMediaFrame, Error> {
		let Some(receiver) = self.connection() else {
			return Ok(std::ptr::null_mut());
		};

		let Some(frame) = receiver.receive(frame_types, timeout)? else {
			return Ok(std::ptr::null_mut());
		};

		let slot = match frame.kind() {
			FrameType::Video => &self.video,
			FrameType::Audio => &self.audio,
			FrameType::Metadata => return self.retain_metadata(frame),
		};

		let frame = RetainedFrame::new(frame)?;
		Ok(slot.put(frame, RetainedFrame::as_ptr))
	}

	pub fn send(&self, frame: MediaFrame) -> Result<c_int, Error> {
		let Some(receiver) = self.connection() else {
			return Ok(0);
		};

		Ok(ffi::to_int(receiver.send(frame)?))
	}

	pub fn set_flags(&self, flags: ReceiveFlags) {
		if let Some(receiver) = self.connection() {
			receiver.set_flags(flags);
		}
	}

	pub fn set_suggested_quality(&self, quality: Quality) {
		if let Some(receiver) = self.connection() {
			receiver.set_suggested_quality(quality);
		}
	}

	pub fn set_tally(&self, tally: Tally) {
		if let Some(receiver) = self.connection() {
			receiver.set_tally(tally);
		}
	}

	pub fn sender_information(&self) -> Option<SenderInfo> {
		self.connection()?.sender_information()
	}

	/// Free the video and audio frames, then everything the base owns.
	pub fn dispose(&self) {
		self.video.clear();
		self.audio.clear();
		self.base.dispose();
	}
}
