use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use slab::Slab;
use tokio::sync::watch;

use super::{timeout_or_default, Network, METADATA_QUEUE};
use crate::runtime::wait;
use crate::{
	Connection, Error, FrameType, FrameTypes, LocalSettings, MediaFrame, Quality, SenderInfo, Statistics, StatsCounter,
	Tally, Timeout, MAX_METADATA_LENGTH,
};

/// A receiver attached to a sender.
pub(super) struct Peer {
	pub frame_types: FrameTypes,
	pub video: async_channel::Sender<MediaFrame>,
	pub audio: async_channel::Sender<MediaFrame>,
	pub metadata: async_channel::Sender<MediaFrame>,
	pub tally: Tally,
	pub quality: Quality,
}

impl Peer {
	fn queue(&self, kind: FrameType) -> &async_channel::Sender<MediaFrame> {
		match kind {
			FrameType::Video => &self.video,
			FrameType::Audio => &self.audio,
			FrameType::Metadata => &self.metadata,
		}
	}

	fn connections(&self) -> usize {
		let primary = self.frame_types.intersects(FrameTypes::VIDEO | FrameTypes::METADATA);
		let audio = self.frame_types.contains(FrameTypes::AUDIO);
		usize::from(primary) + usize::from(audio)
	}
}

/// The state of a sender shared with the receivers attached to it.
pub(super) struct SenderState {
	pub address: String,
	pub port: i32,
	quality: Quality,
	suggested: Mutex<Quality>,

	peers: Mutex<Slab<Peer>>,
	connection_metadata: Mutex<Vec<String>>,
	redirect: Mutex<Option<String>>,
	info: Mutex<Option<SenderInfo>>,

	tally: watch::Sender<Tally>,
	inbound: (async_channel::Sender<MediaFrame>, async_channel::Receiver<MediaFrame>),

	video_stats: StatsCounter,
	audio_stats: StatsCounter,
	epoch: Instant,
}

impl SenderState {
	fn new(host: &str, name: &str, port: i32, quality: Quality) -> Self {
		Self {
			address: format!("{} ({})", host, name),
			port,
			quality,
			suggested: Mutex::new(Quality::Default),
			peers: Default::default(),
			connection_metadata: Default::default(),
			redirect: Default::default(),
			info: Default::default(),
			tally: watch::Sender::new(Tally::default()),
			inbound: async_channel::bounded(METADATA_QUEUE),
			video_stats: Default::default(),
			audio_stats: Default::default(),
			epoch: Instant::now(),
		}
	}

	pub fn attach(&self, peer: Peer) -> usize {
		if peer.frame_types.contains(FrameTypes::METADATA) {
			for xml in self.connection_metadata.lock().iter() {
				let _ = peer.metadata.try_send(MediaFrame::metadata(xml.as_str()));
			}
		}

		let mut peers = self.peers.lock();
		let key = peers.insert(peer);
		self.recompute(&peers);

		key
	}

	pub fn detach(&self, key: usize) {
		let mut peers = self.peers.lock();
		if peers.try_remove(key).is_some() {
			self.recompute(&peers);
		}
	}

	/// Modify an attached peer and refresh the aggregate tally and quality.
	pub fn update<F: FnOnce(&mut Peer)>(&self, key: usize, f: F) {
		let mut peers = self.peers.lock();
		if let Some(peer) = peers.get_mut(key) {
			f(peer);
			self.recompute(&peers);
		}
	}

	fn recompute(&self, peers: &Slab<Peer>) {
		let tally: Tally = peers.iter().map(|(_, peer)| peer.tally).collect();
		self.tally.send_if_modified(|current| {
			if *current == tally {
				return false;
			}
			*current = tally;
			true
		});

		let suggested = peers.iter().map(|(_, peer)| peer.quality).max().unwrap_or_default();
		*self.suggested.lock() = suggested;
	}

	pub fn subscribe(&self) -> watch::Receiver<Tally> {
		self.tally.subscribe()
	}

	pub fn redirect(&self) -> Option<String> {
		self.redirect.lock().clone()
	}

	pub fn info(&self) -> Option<SenderInfo> {
		self.info.lock().clone()
	}

	/// Queue metadata sent back by a receiver, returning the bytes accepted.
	pub fn push_inbound(&self, frame: MediaFrame) -> usize {
		let size = frame.size();
		match self.inbound.0.try_send(frame) {
			Ok(()) => size,
			Err(_) => 0,
		}
	}

	fn quality(&self) -> Quality {
		match self.quality {
			Quality::Default => *self.suggested.lock(),
			quality => quality,
		}
	}

	/// The current time in 100ns units since the sender was created.
	fn timestamp(&self) -> i64 {
		i64::try_from(self.epoch.elapsed().as_nanos() / 100).unwrap_or(i64::MAX)
	}
}

/// A sender registered with a [super::LocalEngine].
pub struct LocalSender {
	network: Arc<Network>,
	state: Arc<SenderState>,
	tally: Mutex<watch::Receiver<Tally>>,
}

impl LocalSender {
	pub(super) fn new(
		network: Arc<Network>,
		settings: &LocalSettings,
		name: &str,
		quality: Quality,
	) -> Result<Self, Error> {
		if name.trim().is_empty() {
			return Err(Error::InvalidAddress(name.to_string()));
		}

		let state = network.publish(settings.port_range(), |host, port| {
			SenderState::new(host, name, port, quality)
		})?;
		let tally = Mutex::new(state.subscribe());

		tracing::info!(address = %state.address, port = state.port, ?quality, "sender created");

		Ok(Self { network, state, tally })
	}

	pub fn port(&self) -> i32 {
		self.state.port
	}

	/// The quality frames are encoded at, taking receiver suggestions into account.
	pub fn quality(&self) -> Quality {
		self.state.quality()
	}
}

impl Drop for LocalSender {
	fn drop(&mut self) {
		self.network.unpublish(self.state.port);
		tracing::info!(address = %self.state.address, "sender closed");
	}
}

impl Connection for LocalSender {
	fn tally(&self, timeout: Timeout) -> Result<(bool, Tally), Error> {
		let mut tally = self.tally.lock();

		let changed = match tally.has_changed() {
			Ok(true) => true,
			_ => wait(timeout_or_default(timeout), tally.changed()).is_some_and(|res| res.is_ok()),
		};

		let current = *tally.borrow_and_update();
		Ok((changed, current))
	}

	fn video_statistics(&self) -> Statistics {
		self.state.video_stats.snapshot()
	}

	fn audio_statistics(&self) -> Statistics {
		self.state.audio_stats.snapshot()
	}
}

impl crate::Sender for LocalSender {
	fn send(&self, mut frame: MediaFrame) -> Result<usize, Error> {
		frame.validate()?;

		if frame.timestamp == -1 {
			frame.timestamp = self.state.timestamp();
		}

		let kind = frame.kind();
		let stats = match kind {
			FrameType::Video => Some(&self.state.video_stats),
			FrameType::Audio => Some(&self.state.audio_stats),
			FrameType::Metadata => None,
		};

		let size = frame.size();
		let mut total = 0;

		if let Some(stats) = stats {
			stats.frame();
		}

		for (_, peer) in self.state.peers.lock().iter() {
			if !peer.frame_types.contains(kind.into()) {
				continue;
			}

			match peer.queue(kind).try_send(frame.clone()) {
				Ok(()) => total += size,
				Err(_) => {
					if let Some(stats) = stats {
						stats.dropped();
					}
				}
			}
		}

		if let Some(stats) = stats {
			stats.sent(total);
		}

		tracing::trace!(?kind, size, total, "sent frame");
		Ok(total)
	}

	fn address(&self) -> String {
		self.state.address.clone()
	}

	fn set_redirect(&self, address: Option<&str>) -> Result<(), Error> {
		let address = address.filter(|address| !address.is_empty());
		if let Some(address) = address {
			super::validate_address(address)?;
		}

		tracing::debug!(from = %self.state.address, to = ?address, "redirect");
		*self.state.redirect.lock() = address.map(str::to_string);

		Ok(())
	}

	fn receive(&self, timeout: Timeout) -> Result<Option<MediaFrame>, Error> {
		let inbound = &self.state.inbound.1;

		if let Ok(frame) = inbound.try_recv() {
			return Ok(Some(frame));
		}

		let frame = wait(timeout_or_default(timeout), inbound.recv()).and_then(Result::ok);
		Ok(frame)
	}

	fn connections(&self) -> usize {
		self.state.peers.lock().iter().map(|(_, peer)| peer.connections()).sum()
	}

	fn add_connection_metadata(&self, metadata: &str) -> Result<(), Error> {
		if metadata.len() >= MAX_METADATA_LENGTH {
			return Err(Error::InvalidFrame("metadata too large"));
		}

		self.state.connection_metadata.lock().push(metadata.to_string());

		for (_, peer) in self.state.peers.lock().iter() {
			if peer.frame_types.contains(FrameTypes::METADATA) {
				let _ = peer.metadata.try_send(MediaFrame::metadata(metadata));
			}
		}

		Ok(())
	}

	fn clear_connection_metadata(&self) {
		self.state.connection_metadata.lock().clear();
	}

	fn set_sender_information(&self, info: SenderInfo) {
		tracing::debug!(address = %self.state.address, ?info, "sender information");
		*self.state.info.lock() = Some(info);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn peer(frame_types: FrameTypes) -> (Peer, async_channel::Receiver<MediaFrame>) {
		let (video, _) = async_channel::bounded(1);
		let (audio, _) = async_channel::bounded(1);
		let (metadata, rx) = async_channel::bounded(8);
		let peer = Peer {
			frame_types,
			video,
			audio,
			metadata,
			tally: Tally::default(),
			quality: Quality::Default,
		};
		(peer, rx)
	}

	#[test]
	fn test_connections_per_peer() {
		assert_eq!(peer(FrameTypes::all()).0.connections(), 2);
		assert_eq!(peer(FrameTypes::METADATA).0.connections(), 1);
		assert_eq!(peer(FrameTypes::AUDIO).0.connections(), 1);
		assert_eq!(peer(FrameTypes::empty()).0.connections(), 0);
	}

	#[test]
	fn test_attach_sends_connection_metadata() {
		let state = SenderState::new("HOST", "cam", 6400, Quality::Default);
		state.connection_metadata.lock().push("<a/>".to_string());

		let (metadata_peer, rx) = peer(FrameTypes::METADATA);
		state.attach(metadata_peer);
		assert_eq!(rx.len(), 1);

		let (audio_peer, rx) = peer(FrameTypes::AUDIO);
		state.attach(audio_peer);
		assert!(rx.is_empty());
	}

	#[test]
	fn test_explicit_quality_wins() {
		let state = SenderState::new("HOST", "cam", 6400, Quality::Low);
		let (mut suggesting, _rx) = peer(FrameTypes::VIDEO);
		suggesting.quality = Quality::High;
		state.attach(suggesting);

		assert_eq!(state.quality(), Quality::Low);
	}

	#[test]
	fn test_detach_resets_aggregate() {
		let state = SenderState::new("HOST", "cam", 6400, Quality::Default);
		let (mut live, _rx) = peer(FrameTypes::VIDEO);
		live.tally = Tally::new(false, true);
		live.quality = Quality::Medium;

		let key = state.attach(live);
		assert_eq!(*state.subscribe().borrow(), Tally::new(false, true));
		assert_eq!(state.quality(), Quality::Medium);

		state.detach(key);
		state.detach(key);
		assert_eq!(*state.subscribe().borrow(), Tally::default());
		assert_eq!(state.quality(), Quality::Default);
	}

	#[test]
	fn test_generated_timestamps_increase() {
		let state = SenderState::new("HOST", "cam", 6400, Quality::Default);
		let first = state.timestamp();
		std::thread::sleep(std::time::Duration::from_millis(1));
		assert!(state.timestamp() > first);
	}
}
