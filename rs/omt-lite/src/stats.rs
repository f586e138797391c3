use parking_lot::Mutex;

/// A snapshot of per-kind transfer statistics.
///
/// The `*_since_last` fields are deltas since the previous snapshot taken from the same connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
	pub bytes_sent: i64,
	pub bytes_received: i64,
	pub bytes_sent_since_last: i64,
	pub bytes_received_since_last: i64,

	pub frames: i64,
	pub frames_since_last: i64,
	pub frames_dropped: i64,

	/// Time spent encoding or decoding, for engines that run a codec.
	///
	/// The local engine moves frames uncompressed, so it always reports 0.
	pub codec_time: i64,
	/// Codec time for the last frame; 0 when no codec runs.
	pub codec_time_since_last: i64,
}

#[derive(Default)]
struct Totals {
	bytes_sent: i64,
	bytes_received: i64,
	frames: i64,
	frames_dropped: i64,
}

/// Accumulates statistics for one frame kind and produces [Statistics] snapshots.
#[derive(Default)]
pub(crate) struct StatsCounter {
	state: Mutex<(Totals, Statistics)>,
}

impl StatsCounter {
	pub fn sent(&self, bytes: usize) {
		let mut state = self.state.lock();
		state.0.bytes_sent = state.0.bytes_sent.saturating_add(bytes as i64);
	}

	pub fn received(&self, bytes: usize) {
		let mut state = self.state.lock();
		state.0.bytes_received = state.0.bytes_received.saturating_add(bytes as i64);
	}

	pub fn frame(&self) {
		self.state.lock().0.frames += 1;
	}

	pub fn dropped(&self) {
		self.state.lock().0.frames_dropped += 1;
	}

	pub fn snapshot(&self) -> Statistics {
		let mut state = self.state.lock();
		let (totals, last) = &mut *state;

		let stats = Statistics {
			bytes_sent: totals.bytes_sent,
			bytes_received: totals.bytes_received,
			bytes_sent_since_last: totals.bytes_sent - last.bytes_sent,
			bytes_received_since_last: totals.bytes_received - last.bytes_received,
			frames: totals.frames,
			frames_since_last: totals.frames - last.frames,
			frames_dropped: totals.frames_dropped,
			..Default::default()
		};

		*last = stats;
		stats
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_since_last() {
		let counter = StatsCounter::default();
		counter.sent(100);
		counter.frame();

		let first = counter.snapshot();
		assert_eq!(first.bytes_sent, 100);
		assert_eq!(first.bytes_sent_since_last, 100);
		assert_eq!(first.frames_since_last, 1);

		counter.sent(50);
		counter.dropped();
		let second = counter.snapshot();
		assert_eq!(second.bytes_sent, 150);
		assert_eq!(second.bytes_sent_since_last, 50);
		assert_eq!(second.frames, 1);
		assert_eq!(second.frames_since_last, 0);
		assert_eq!(second.frames_dropped, 1);
		assert_eq!((second.codec_time, second.codec_time_since_last), (0, 0));
	}
}
