use std::ffi::{c_char, c_int, c_void, CString};

use bytes::Bytes;
use omt_lite::{
	AudioFrame, Codec, ColorSpace, FrameType, Media, MediaFrame, SenderInfo, Statistics, Tally, VideoFlags, VideoFrame,
};

use crate::{codec, Error};

/// The width of every fixed string field, terminator included.
pub const OMT_MAX_STRING_LENGTH: usize = 1024;

/// cbindgen:field-names=[preview, program]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OMTTally {
	pub preview: c_int,
	pub program: c_int,
}

impl From<Tally> for OMTTally {
	fn from(tally: Tally) -> Self {
		Self {
			preview: tally.preview.into(),
			program: tally.program.into(),
		}
	}
}

impl From<OMTTally> for Tally {
	fn from(tally: OMTTally) -> Self {
		Tally::new(tally.preview != 0, tally.program != 0)
	}
}

#[repr(C)]
pub struct OMTSenderInfo {
	pub product_name: [c_char; OMT_MAX_STRING_LENGTH],
	pub manufacturer: [c_char; OMT_MAX_STRING_LENGTH],
	pub version: [c_char; OMT_MAX_STRING_LENGTH],
	pub reserved1: [c_char; OMT_MAX_STRING_LENGTH],
	pub reserved2: [c_char; OMT_MAX_STRING_LENGTH],
	pub reserved3: [c_char; OMT_MAX_STRING_LENGTH],
}

impl OMTSenderInfo {
	/// Overwrite the published fields; the reserved ones are left alone.
	pub fn write(&mut self, info: &SenderInfo) {
		codec::write_fixed(&info.product_name, &mut self.product_name);
		codec::write_fixed(&info.manufacturer, &mut self.manufacturer);
		codec::write_fixed(&info.version, &mut self.version);
	}

	pub fn read(&self) -> SenderInfo {
		SenderInfo {
			product_name: codec::read_fixed(&self.product_name),
			manufacturer: codec::read_fixed(&self.manufacturer),
			version: codec::read_fixed(&self.version),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OMTStatistics {
	pub bytes_sent: i64,
	pub bytes_received: i64,
	pub bytes_sent_since_last: i64,
	pub bytes_received_since_last: i64,
	pub frames: i64,
	pub frames_since_last: i64,
	pub frames_dropped: i64,
	pub codec_time: i64,
	pub codec_time_since_last: i64,
	pub reserved1: i64,
	pub reserved2: i64,
	pub reserved3: i64,
	pub reserved4: i64,
	pub reserved5: i64,
	pub reserved6: i64,
	pub reserved7: i64,
}

impl From<Statistics> for OMTStatistics {
	fn from(stats: Statistics) -> Self {
		Self {
			bytes_sent: stats.bytes_sent,
			bytes_received: stats.bytes_received,
			bytes_sent_since_last: stats.bytes_sent_since_last,
			bytes_received_since_last: stats.bytes_received_since_last,
			frames: stats.frames,
			frames_since_last: stats.frames_since_last,
			frames_dropped: stats.frames_dropped,
			codec_time: stats.codec_time,
			codec_time_since_last: stats.codec_time_since_last,
			..Default::default()
		}
	}
}

/// A video, audio or metadata frame as laid out for C.
///
/// Timestamps are in units of 100ns. Metadata payloads and per-frame metadata are UTF-8 with the
/// terminator counted in their length.
///
/// cbindgen:field-names=[Type, Timestamp, Codec, Width, Height, Stride, Flags, FrameRateN, FrameRateD, AspectRatio, ColorSpace, SampleRate, Channels, SamplesPerChannel, Data, DataLength, CompressedData, CompressedLength, FrameMetadata, FrameMetadataLength]
#[repr(C)]
#[derive(Debug)]
pub struct OMTMediaFrame {
	pub frame_type: c_int,
	pub timestamp: i64,
	pub codec: c_int,
	pub width: c_int,
	pub height: c_int,
	pub stride: c_int,
	pub flags: c_int,
	pub frame_rate_n: c_int,
	pub frame_rate_d: c_int,
	pub aspect_ratio: f32,
	pub color_space: c_int,
	pub sample_rate: c_int,
	pub channels: c_int,
	pub samples_per_channel: c_int,
	pub data: *mut c_void,
	pub data_length: c_int,
	pub compressed_data: *mut c_void,
	pub compressed_length: c_int,
	pub frame_metadata: *mut c_void,
	pub frame_metadata_length: c_int,
}

impl Default for OMTMediaFrame {
	fn default() -> Self {
		Self {
			frame_type: 0,
			timestamp: 0,
			codec: 0,
			width: 0,
			height: 0,
			stride: 0,
			flags: 0,
			frame_rate_n: 0,
			frame_rate_d: 0,
			aspect_ratio: 0.0,
			color_space: 0,
			sample_rate: 0,
			channels: 0,
			samples_per_channel: 0,
			data: std::ptr::null_mut(),
			data_length: 0,
			compressed_data: std::ptr::null_mut(),
			compressed_length: 0,
			frame_metadata: std::ptr::null_mut(),
			frame_metadata_length: 0,
		}
	}
}

impl OMTMediaFrame {
	/// Copy a caller-owned frame into an engine frame.
	///
	/// # Safety
	/// Every pointer in the frame must be null or valid for its stated length.
	pub unsafe fn read(&self) -> Result<MediaFrame, Error> {
		let kind = FrameType::try_from(self.frame_type).map_err(|_| Error::UnknownFrameType(self.frame_type))?;
		let frame_metadata = unsafe { codec::read_bounded(self.frame_metadata.cast(), self.frame_metadata_length)? };

		let media = match kind {
			FrameType::Video => Media::Video(VideoFrame {
				codec: Codec(self.codec as u32),
				width: self.width,
				height: self.height,
				stride: self.stride,
				flags: VideoFlags::from_bits_truncate(self.flags),
				frame_rate_n: self.frame_rate_n,
				frame_rate_d: self.frame_rate_d,
				aspect_ratio: self.aspect_ratio,
				color_space: ColorSpace::from(self.color_space),
				data: unsafe { copy_bytes(self.data, self.data_length)? },
				// Compressed data is receive-only; VMX1 is sent through `data`.
				compressed: None,
			}),
			FrameType::Audio => Media::Audio(AudioFrame {
				codec: Codec(self.codec as u32),
				sample_rate: self.sample_rate,
				channels: self.channels,
				samples_per_channel: self.samples_per_channel,
				data: unsafe { copy_bytes(self.data, self.data_length)? },
			}),
			FrameType::Metadata => {
				if self.data.is_null() && self.data_length > 0 {
					return Err(Error::InvalidPointer);
				}
				let xml = unsafe { codec::read_bounded(self.data.cast(), self.data_length)? };
				Media::Metadata(xml.unwrap_or_default())
			}
		};

		Ok(MediaFrame {
			timestamp: self.timestamp,
			frame_metadata,
			media,
		})
	}
}

unsafe fn copy_bytes(data: *const c_void, len: c_int) -> Result<Bytes, Error> {
	let len = usize::try_from(len).map_err(|_| Error::InvalidLength(len))?;
	if len == 0 {
		return Ok(Bytes::new());
	}
	if data.is_null() {
		return Err(Error::InvalidPointer);
	}

	let slice = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) };
	Ok(Bytes::copy_from_slice(slice))
}

fn c_len(len: usize) -> Result<c_int, Error> {
	c_int::try_from(len).map_err(|_| Error::InvalidLength(c_int::MAX))
}

/// A frame handed out to C, along with every buffer its pointers reference.
///
/// Payloads are copied out of the engine's shared buffers, so a caller writing into its frame never
/// affects another receiver.
pub(crate) struct RetainedFrame {
	header: Box<OMTMediaFrame>,

	// Referenced by the header; never read directly.
	_data: Option<Box<[u8]>>,
	_compressed: Option<Box<[u8]>>,
	_text: Option<CString>,
	_frame_metadata: Option<CString>,
}

#[cfg(test)]
thread_local! {
	/// Frames alive on this thread.
	pub(crate) static LIVE_FRAMES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

// The raw pointers only reference buffers owned by the same value.
unsafe impl Send for RetainedFrame {}

impl RetainedFrame {
	pub fn new(frame: MediaFrame) -> Result<Self, Error> {
		let mut header = Box::new(OMTMediaFrame {
			frame_type: frame.kind().into(),
			timestamp: frame.timestamp,
			..Default::default()
		});

		let mut data = None;
		let mut compressed = None;
		let mut text = None;

		match frame.media {
			Media::Video(video) => {
				header.codec = video.codec.0 as c_int;
				header.width = video.width;
				header.height = video.height;
				header.stride = video.stride;
				header.flags = video.flags.bits();
				header.frame_rate_n = video.frame_rate_n;
				header.frame_rate_d = video.frame_rate_d;
				header.aspect_ratio = video.aspect_ratio;
				header.color_space = video.color_space.into();

				header.data_length = c_len(video.data.len())?;
				header.data = owned_copy(&video.data, &mut data);

				if let Some(buf) = video.compressed {
					header.compressed_length = c_len(buf.len())?;
					header.compressed_data = owned_copy(&buf, &mut compressed);
				}
			}
			Media::Audio(audio) => {
				header.codec = audio.codec.0 as c_int;
				header.sample_rate = audio.sample_rate;
				header.channels = audio.channels;
				header.samples_per_channel = audio.samples_per_channel;

				header.data_length = c_len(audio.data.len())?;
				header.data = owned_copy(&audio.data, &mut data);
			}
			Media::Metadata(xml) => {
				let xml = codec::to_cstring(&xml);
				header.data = xml.as_ptr().cast_mut().cast();
				header.data_length = c_len(xml.as_bytes_with_nul().len())?;
				text = Some(xml);
			}
		}

		let frame_metadata = frame.frame_metadata.map(|meta| codec::to_cstring(&meta));
		if let Some(meta) = &frame_metadata {
			header.frame_metadata = meta.as_ptr().cast_mut().cast();
			header.frame_metadata_length = c_len(meta.as_bytes_with_nul().len())?;
		}

		#[cfg(test)]
		LIVE_FRAMES.with(|live| live.set(live.get() + 1));

		Ok(Self {
			header,
			_data: data,
			_compressed: compressed,
			_text: text,
			_frame_metadata: frame_metadata,
		})
	}

	/// The pointer handed to C, valid for as long as this value lives.
	pub fn as_ptr(&self) -> *mut OMTMediaFrame {
		std::ptr::from_ref(self.header.as_ref()).cast_mut()
	}
}

#[cfg(test)]
impl Drop for RetainedFrame {
	fn drop(&mut self) {
		LIVE_FRAMES.with(|live| live.set(live.get() - 1));
	}
}

/// Copy `bytes` into `owner`, returning a pointer to the copy or null when empty.
fn owned_copy(bytes: &[u8], owner: &mut Option<Box<[u8]>>) -> *mut c_void {
	if bytes.is_empty() {
		return std::ptr::null_mut();
	}
	owner.insert(Box::from(bytes)).as_mut_ptr().cast()
}
