use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::send::{Peer, SenderState};
use super::{timeout_or_default, validate_address, Network, AUDIO_QUEUE, METADATA_QUEUE, VIDEO_QUEUE};
use crate::runtime::wait;
use crate::{
	Connection, Error, FrameType, FrameTypes, Media, MediaFrame, PreferredVideoFormat, Quality, ReceiveFlags,
	SenderInfo, Statistics, StatsCounter, Tally, Timeout,
};

type Queue = (async_channel::Sender<MediaFrame>, async_channel::Receiver<MediaFrame>);

/// The receiving end of the per-kind queues.
///
/// The receiver keeps its own senders so the queues stay open across reconnects.
struct Inbox {
	video: Queue,
	audio: Queue,
	metadata: Queue,
}

impl Inbox {
	fn new() -> Self {
		Self {
			video: async_channel::bounded(VIDEO_QUEUE),
			audio: async_channel::bounded(AUDIO_QUEUE),
			metadata: async_channel::bounded(METADATA_QUEUE),
		}
	}

	fn try_recv(&self, types: FrameTypes) -> Option<MediaFrame> {
		let queues = [
			(FrameTypes::VIDEO, &self.video.1),
			(FrameTypes::AUDIO, &self.audio.1),
			(FrameTypes::METADATA, &self.metadata.1),
		];

		queues
			.into_iter()
			.filter(|(kind, _)| types.contains(*kind))
			.find_map(|(_, queue)| queue.try_recv().ok())
	}

	async fn recv(&self, types: FrameTypes) -> MediaFrame {
		tokio::select! {
			Ok(frame) = self.video.1.recv(), if types.contains(FrameTypes::VIDEO) => frame,
			Ok(frame) = self.audio.1.recv(), if types.contains(FrameTypes::AUDIO) => frame,
			Ok(frame) = self.metadata.1.recv(), if types.contains(FrameTypes::METADATA) => frame,
			else => std::future::pending().await,
		}
	}
}

/// An attachment to a sender, detached on drop.
struct Link {
	sender: Weak<SenderState>,
	key: usize,
}

impl Link {
	fn sender(&self) -> Option<Arc<SenderState>> {
		self.sender.upgrade()
	}
}

impl Drop for Link {
	fn drop(&mut self) {
		if let Some(sender) = self.sender.upgrade() {
			sender.detach(self.key);
		}
	}
}

/// A receiver created by a [super::LocalEngine].
///
/// Connects on creation and retries on every call while the sender is missing.
pub struct LocalReceiver {
	network: Arc<Network>,
	address: String,
	frame_types: FrameTypes,
	format: PreferredVideoFormat,

	flags: Mutex<ReceiveFlags>,
	quality: Mutex<Quality>,
	own_tally: Mutex<Tally>,

	inbox: Inbox,
	link: Mutex<Option<Link>>,
	tally: Mutex<Option<watch::Receiver<Tally>>>,

	video_stats: StatsCounter,
	audio_stats: StatsCounter,
}

impl LocalReceiver {
	pub(super) fn new(
		network: Arc<Network>,
		address: &str,
		frame_types: FrameTypes,
		format: PreferredVideoFormat,
		flags: ReceiveFlags,
	) -> Result<Self, Error> {
		validate_address(address)?;

		let receiver = Self {
			network,
			address: address.to_string(),
			frame_types,
			format,
			flags: Mutex::new(flags),
			quality: Mutex::new(Quality::Default),
			own_tally: Mutex::new(Tally::default()),
			inbox: Inbox::new(),
			link: Default::default(),
			tally: Default::default(),
			video_stats: Default::default(),
			audio_stats: Default::default(),
		};

		tracing::info!(address, ?frame_types, ?format, ?flags, "receiver created");
		receiver.connect();

		Ok(receiver)
	}

	pub fn preferred_format(&self) -> PreferredVideoFormat {
		self.format
	}

	pub fn is_connected(&self) -> bool {
		self.link.lock().as_ref().and_then(Link::sender).is_some()
	}

	/// Attach to the sender if not already attached, following one redirect.
	fn connect(&self) -> Option<Arc<SenderState>> {
		let mut link = self.link.lock();
		if let Some(sender) = link.as_ref().and_then(Link::sender) {
			return Some(sender);
		}

		// Drop a stale link before attaching again.
		link.take();

		let sender = self.resolve()?;
		let key = sender.attach(Peer {
			frame_types: self.frame_types,
			video: self.inbox.video.0.clone(),
			audio: self.inbox.audio.0.clone(),
			metadata: self.inbox.metadata.0.clone(),
			tally: *self.own_tally.lock(),
			quality: *self.quality.lock(),
		});

		*self.tally.lock() = Some(sender.subscribe());
		*link = Some(Link {
			sender: Arc::downgrade(&sender),
			key,
		});

		tracing::info!(address = %self.address, sender = %sender.address, "connected");
		Some(sender)
	}

	fn resolve(&self) -> Option<Arc<SenderState>> {
		let sender = self.lookup(&self.address)?;
		match sender.redirect() {
			Some(target) => {
				tracing::debug!(from = %sender.address, to = %target, "following redirect");
				self.lookup(&target)
			}
			None => Some(sender),
		}
	}

	fn lookup(&self, address: &str) -> Option<Arc<SenderState>> {
		match self.network.lookup(address) {
			Ok(sender) => sender,
			Err(err) => {
				tracing::debug!(address, %err, "lookup failed");
				None
			}
		}
	}

	fn update<F: FnOnce(&mut Peer)>(&self, f: F) {
		if let Some(link) = self.link.lock().as_ref() {
			if let Some(sender) = link.sender() {
				sender.update(link.key, f);
			}
		}
	}

	/// Apply the receive flags and account for a frame leaving the inbox.
	fn deliver(&self, mut frame: MediaFrame) -> MediaFrame {
		let flags = *self.flags.lock();
		let size = frame.size();

		match &mut frame.media {
			Media::Video(video) => {
				if flags.contains(ReceiveFlags::COMPRESSED_ONLY) {
					video.data = Bytes::new();
				} else if !flags.contains(ReceiveFlags::INCLUDE_COMPRESSED) {
					video.compressed = None;
				}

				self.video_stats.received(size);
				self.video_stats.frame();
			}
			Media::Audio(_) => {
				self.audio_stats.received(size);
				self.audio_stats.frame();
			}
			Media::Metadata(_) => {}
		}

		frame
	}
}

impl Connection for LocalReceiver {
	fn tally(&self, timeout: Timeout) -> Result<(bool, Tally), Error> {
		let timeout = timeout_or_default(timeout);
		self.connect();

		let mut tally = self.tally.lock();
		let Some(tally) = tally.as_mut() else {
			wait(timeout, std::future::pending::<()>());
			return Ok((false, Tally::default()));
		};

		let changed = match tally.has_changed() {
			Ok(true) => true,
			_ => wait(timeout, tally.changed()).is_some_and(|res| res.is_ok()),
		};

		let current = *tally.borrow_and_update();
		Ok((changed, current))
	}

	fn video_statistics(&self) -> Statistics {
		self.video_stats.snapshot()
	}

	fn audio_statistics(&self) -> Statistics {
		self.audio_stats.snapshot()
	}
}

impl crate::Receiver for LocalReceiver {
	fn receive(&self, frame_types: FrameTypes, timeout: Timeout) -> Result<Option<MediaFrame>, Error> {
		self.connect();

		let types = frame_types & self.frame_types;
		let frame = match self.inbox.try_recv(types) {
			Some(frame) => Some(frame),
			None => wait(timeout_or_default(timeout), self.inbox.recv(types)),
		};

		Ok(frame.map(|frame| self.deliver(frame)))
	}

	fn send(&self, frame: MediaFrame) -> Result<usize, Error> {
		if frame.kind() != FrameType::Metadata {
			return Err(Error::Unsupported(frame.kind()));
		}
		frame.validate()?;

		match self.connect() {
			Some(sender) => Ok(sender.push_inbound(frame)),
			None => Ok(0),
		}
	}

	fn set_flags(&self, flags: ReceiveFlags) {
		*self.flags.lock() = flags;
	}

	fn set_suggested_quality(&self, quality: Quality) {
		*self.quality.lock() = quality;
		self.update(|peer| peer.quality = quality);
	}

	fn set_tally(&self, tally: Tally) {
		*self.own_tally.lock() = tally;
		self.update(|peer| peer.tally = tally);
	}

	fn sender_information(&self) -> Option<SenderInfo> {
		self.connect()?.info()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{AudioFrame, Codec, Receiver, Sender, VideoFrame};
	use std::time::Duration;

	fn engine() -> crate::LocalEngine {
		crate::LocalEngine::new("test")
	}

	fn video() -> MediaFrame {
		MediaFrame {
			timestamp: -1,
			frame_metadata: None,
			media: Media::Video(VideoFrame {
				codec: Codec::VMX1,
				width: 2,
				height: 2,
				stride: 4,
				flags: Default::default(),
				frame_rate_n: 30,
				frame_rate_d: 1,
				aspect_ratio: 1.0,
				color_space: Default::default(),
				data: Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8]),
				compressed: Some(Bytes::from_static(b"vmx1")),
			}),
		}
	}

	fn audio() -> MediaFrame {
		MediaFrame {
			timestamp: 5,
			frame_metadata: None,
			media: Media::Audio(AudioFrame {
				codec: Codec::FPA1,
				sample_rate: 48000,
				channels: 2,
				samples_per_channel: 2,
				data: Bytes::from(vec![0u8; 16]),
			}),
		}
	}

	#[test]
	fn test_compressed_flags() {
		let engine = engine();
		let sender = engine.sender("cam", Quality::Default).unwrap();
		let receiver = engine
			.receiver(
				&sender.address(),
				FrameTypes::VIDEO,
				PreferredVideoFormat::Uyvy,
				ReceiveFlags::INCLUDE_COMPRESSED,
			)
			.unwrap();

		sender.send(video()).unwrap();
		let frame = receiver.receive(FrameTypes::VIDEO, None).unwrap().unwrap();
		let Media::Video(video_frame) = frame.media else {
			panic!("expected video");
		};
		assert_eq!(video_frame.data.len(), 8);
		assert_eq!(video_frame.compressed.as_deref(), Some(&b"vmx1"[..]));
		assert!(frame.timestamp >= 0);

		receiver.set_flags(ReceiveFlags::COMPRESSED_ONLY);
		sender.send(video()).unwrap();
		let frame = receiver.receive(FrameTypes::VIDEO, None).unwrap().unwrap();
		let Media::Video(video_frame) = frame.media else {
			panic!("expected video");
		};
		assert!(video_frame.data.is_empty());
		assert!(video_frame.compressed.is_some());
	}

	#[test]
	fn test_filter_by_type() {
		let engine = engine();
		let sender = engine.sender("cam", Quality::Default).unwrap();
		let receiver = engine
			.receiver(&sender.address(), FrameTypes::all(), PreferredVideoFormat::Uyvy, ReceiveFlags::empty())
			.unwrap();

		sender.send(video()).unwrap();
		sender.send(audio()).unwrap();

		let frame = receiver.receive(FrameTypes::AUDIO, None).unwrap().unwrap();
		assert_eq!(frame.kind(), FrameType::Audio);
		assert_eq!(frame.timestamp, 5);

		assert!(receiver.receive(FrameTypes::METADATA, None).unwrap().is_none());
		let frame = receiver.receive(FrameTypes::all(), None).unwrap().unwrap();
		assert_eq!(frame.kind(), FrameType::Video);

		assert_eq!(receiver.audio_statistics().frames, 1);
		assert_eq!(receiver.audio_statistics().frames_since_last, 0);
	}

	#[test]
	fn test_unsubscribed_type_is_ignored() {
		let engine = engine();
		let sender = engine.sender("cam", Quality::Default).unwrap();
		let receiver = engine
			.receiver(&sender.address(), FrameTypes::AUDIO, PreferredVideoFormat::Uyvy, ReceiveFlags::empty())
			.unwrap();

		assert_eq!(sender.send(video()).unwrap(), 0);
		let frame = receiver.receive(FrameTypes::VIDEO, Some(Duration::from_millis(10))).unwrap();
		assert!(frame.is_none());
	}

	#[test]
	fn test_reconnects_after_sender_returns() {
		let engine = engine();
		let sender = engine.sender("cam", Quality::Default).unwrap();
		let address = sender.address();
		let receiver = engine
			.receiver(&address, FrameTypes::all(), PreferredVideoFormat::Uyvy, ReceiveFlags::empty())
			.unwrap();
		assert!(receiver.is_connected());

		drop(sender);
		assert!(!receiver.is_connected());
		assert_eq!(receiver.send(MediaFrame::metadata("<x/>")).unwrap(), 0);

		let sender = engine.sender("cam", Quality::Default).unwrap();
		assert!(receiver.receive(FrameTypes::all(), None).unwrap().is_none());
		assert!(receiver.is_connected());
		assert_eq!(sender.connections(), 2);
	}

	#[test]
	fn test_settings_carry_over_reconnect() {
		let engine = engine();
		let receiver = engine
			.receiver("TEST (cam)", FrameTypes::all(), PreferredVideoFormat::Bgra, ReceiveFlags::empty())
			.unwrap();
		assert_eq!(receiver.preferred_format(), PreferredVideoFormat::Bgra);

		receiver.set_tally(Tally::new(true, true));
		receiver.set_suggested_quality(Quality::Medium);

		let sender = engine.sender("cam", Quality::Default).unwrap();
		let (_, tally) = receiver.tally(None).unwrap();
		assert_eq!(tally, Tally::new(true, true));
		assert_eq!(sender.quality(), Quality::Medium);
	}
}
