use std::time::Duration;

use crate::{
	Error, FrameTypes, MediaFrame, PreferredVideoFormat, Quality, ReceiveFlags, SenderInfo, Statistics, Tally,
};

/// How long a call may block.
///
/// `Some(Duration::ZERO)` polls without blocking, `None` leaves the choice to the engine.
pub type Timeout = Option<Duration>;

/// The capability set behind the C library.
///
/// Every method may be called from any thread.
pub trait Engine: Send + Sync + 'static {
	/// Create a sender publishing under `name`.
	fn send(&self, name: &str, quality: Quality) -> Result<Box<dyn Sender>, Error>;

	/// Create a receiver and begin connecting to `address`.
	///
	/// `address` is either a discovery name or an `omt://host:port` URL.
	fn receive(
		&self,
		address: &str,
		frame_types: FrameTypes,
		format: PreferredVideoFormat,
		flags: ReceiveFlags,
	) -> Result<Box<dyn Receiver>, Error>;

	fn discovery(&self) -> Result<Box<dyn Discovery>, Error>;

	fn settings(&self) -> &dyn Settings;
}

/// Behavior shared by senders and receivers.
pub trait Connection: Send + Sync {
	/// Wait up to `timeout` for the tally to change.
	///
	/// Returns whether it changed, along with the last known tally either way.
	fn tally(&self, timeout: Timeout) -> Result<(bool, Tally), Error>;

	fn video_statistics(&self) -> Statistics;

	fn audio_statistics(&self) -> Statistics;
}

pub trait Sender: Connection {
	/// Send a frame to every connected receiver, returning the number of bytes queued.
	fn send(&self, frame: MediaFrame) -> Result<usize, Error>;

	/// The discovery address, in the format `HOSTNAME (NAME)`.
	fn address(&self) -> String;

	/// Ask receivers to connect somewhere else, or stop redirecting with `None`.
	fn set_redirect(&self, address: Option<&str>) -> Result<(), Error>;

	/// Wait up to `timeout` for metadata sent back by a receiver.
	fn receive(&self, timeout: Timeout) -> Result<Option<MediaFrame>, Error>;

	/// The number of connections; receivers use one for video/metadata and another for audio.
	fn connections(&self) -> usize;

	/// Metadata sent to every receiver as soon as it connects, and immediately to current ones.
	fn add_connection_metadata(&self, metadata: &str) -> Result<(), Error>;

	fn clear_connection_metadata(&self);

	fn set_sender_information(&self, info: SenderInfo);
}

pub trait Receiver: Connection {
	/// Wait up to `timeout` for the next frame of any of `frame_types`.
	fn receive(&self, frame_types: FrameTypes, timeout: Timeout) -> Result<Option<MediaFrame>, Error>;

	/// Send a metadata frame back to the sender.
	fn send(&self, frame: MediaFrame) -> Result<usize, Error>;

	/// Takes effect from the next frame received.
	fn set_flags(&self, flags: ReceiveFlags);

	fn set_suggested_quality(&self, quality: Quality);

	fn set_tally(&self, tally: Tally);

	/// Information published by the sender, if connected and provided.
	fn sender_information(&self) -> Option<SenderInfo>;
}

pub trait Discovery: Send + Sync {
	/// The addresses of every sender currently visible.
	fn addresses(&self) -> Result<Vec<String>, Error>;
}

/// Process-wide settings.
pub trait Settings: Send + Sync {
	fn string(&self, name: &str) -> Option<String>;

	fn set_string(&self, name: &str, value: &str);

	fn integer(&self, name: &str) -> Option<i32>;

	fn set_integer(&self, name: &str, value: i32);
}
