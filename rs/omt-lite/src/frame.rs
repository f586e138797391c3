use bytes::Bytes;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

use crate::Error;

/// The largest metadata payload, including per-frame metadata, in bytes.
pub const MAX_METADATA_LENGTH: usize = 65536;

/// The largest number of planar audio channels.
pub const MAX_AUDIO_CHANNELS: u32 = 32;

/// The kind of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum FrameType {
	Metadata = 1,
	Video = 2,
	Audio = 4,
}

bitflags::bitflags! {
	/// A set of [FrameType]s, used to subscribe and to filter receives.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct FrameTypes: i32 {
		const METADATA = 1;
		const VIDEO = 2;
		const AUDIO = 4;
	}
}

impl From<FrameType> for FrameTypes {
	fn from(kind: FrameType) -> Self {
		FrameTypes::from_bits_truncate(kind.into())
	}
}

bitflags::bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct VideoFlags: i32 {
		const INTERLACED = 1;
		const ALPHA = 2;
		const PREMULTIPLIED = 4;
		const PREVIEW = 8;
		const HIGH_BIT_DEPTH = 16;
	}
}

bitflags::bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct ReceiveFlags: i32 {
		/// Receive only a 1/8th preview of the video.
		const PREVIEW = 1;
		/// Include the compressed video alongside the decoded frame.
		const INCLUDE_COMPRESSED = 2;
		/// Deliver only the compressed video.
		const COMPRESSED_ONLY = 4;
	}
}

/// Video encoding quality.
///
/// A sender created with [Quality::Default] follows the highest suggestion among its receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, IntoPrimitive)]
#[repr(i32)]
pub enum Quality {
	#[default]
	Default = 0,
	Low = 1,
	Medium = 50,
	High = 100,
}

impl Quality {
	/// Map an arbitrary level onto the closest quality band.
	pub fn from_level(level: i32) -> Self {
		match level {
			i32::MIN..=0 => Self::Default,
			1 => Self::Low,
			2..=50 => Self::Medium,
			_ => Self::High,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, FromPrimitive)]
#[repr(i32)]
pub enum ColorSpace {
	#[default]
	Undefined = 0,
	BT601 = 601,
	BT709 = 709,
}

/// The decoded video format a receiver would like to get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, FromPrimitive)]
#[repr(i32)]
pub enum PreferredVideoFormat {
	#[default]
	Uyvy = 0,
	UyvyOrBgra = 1,
	Bgra = 2,
	UyvyOrUyva = 3,
	UyvyOrUyvaOrP216OrPa16 = 4,
	P216 = 5,
}

/// A FourCC codec identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Codec(pub u32);

impl Codec {
	pub const VMX1: Self = Self::fourcc(*b"VMX1");
	pub const FPA1: Self = Self::fourcc(*b"FPA1");
	pub const UYVY: Self = Self::fourcc(*b"UYVY");
	pub const YUY2: Self = Self::fourcc(*b"YUY2");
	pub const BGRA: Self = Self::fourcc(*b"BGRA");
	pub const NV12: Self = Self::fourcc(*b"NV12");
	pub const YV12: Self = Self::fourcc(*b"YV12");
	pub const UYVA: Self = Self::fourcc(*b"UYVA");
	pub const P216: Self = Self::fourcc(*b"P216");
	pub const PA16: Self = Self::fourcc(*b"PA16");

	pub const fn fourcc(code: [u8; 4]) -> Self {
		Self(u32::from_le_bytes(code))
	}
}

impl std::fmt::Debug for Codec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = self.0.to_le_bytes();
		match std::str::from_utf8(&code) {
			Ok(code) if code.chars().all(|c| c.is_ascii_alphanumeric()) => write!(f, "{}", code),
			_ => write!(f, "{:#010x}", self.0),
		}
	}
}

#[derive(Clone, Debug)]
pub struct VideoFrame {
	pub codec: Codec,
	pub width: i32,
	pub height: i32,

	/// Bytes per row of pixels.
	pub stride: i32,
	pub flags: VideoFlags,
	pub frame_rate_n: i32,
	pub frame_rate_d: i32,

	/// Display aspect ratio as width / height.
	pub aspect_ratio: f32,
	pub color_space: ColorSpace,

	pub data: Bytes,

	/// The original VMX1 frame, if requested by the receiver.
	pub compressed: Option<Bytes>,
}

#[derive(Clone, Debug)]
pub struct AudioFrame {
	pub codec: Codec,
	pub sample_rate: i32,
	pub channels: i32,
	pub samples_per_channel: i32,

	/// Planar 32-bit float samples, one plane per channel.
	pub data: Bytes,
}

#[derive(Clone, Debug)]
pub enum Media {
	Video(VideoFrame),
	Audio(AudioFrame),

	/// A UTF-8 XML document.
	Metadata(String),
}

/// A single video, audio or metadata frame.
#[derive(Clone, Debug)]
pub struct MediaFrame {
	/// Presentation time where one second is 10,000,000.
	///
	/// -1 asks the sender to generate timestamps itself.
	pub timestamp: i64,

	/// Optional per-frame metadata, UTF-8.
	pub frame_metadata: Option<String>,

	pub media: Media,
}

impl MediaFrame {
	pub fn metadata<S: Into<String>>(xml: S) -> Self {
		Self {
			timestamp: 0,
			frame_metadata: None,
			media: Media::Metadata(xml.into()),
		}
	}

	pub fn kind(&self) -> FrameType {
		match self.media {
			Media::Video(_) => FrameType::Video,
			Media::Audio(_) => FrameType::Audio,
			Media::Metadata(_) => FrameType::Metadata,
		}
	}

	/// The payload size in bytes, as accounted in statistics.
	pub fn size(&self) -> usize {
		match &self.media {
			Media::Video(video) => video.data.len() + video.compressed.as_ref().map_or(0, Bytes::len),
			Media::Audio(audio) => audio.data.len(),
			Media::Metadata(xml) => xml.len() + 1,
		}
	}

	pub fn validate(&self) -> Result<(), Error> {
		if let Some(meta) = &self.frame_metadata {
			if meta.len() >= MAX_METADATA_LENGTH {
				return Err(Error::InvalidFrame("frame metadata too large"));
			}
		}

		match &self.media {
			Media::Video(video) => {
				if video.width <= 0 || video.height <= 0 {
					return Err(Error::InvalidFrame("video dimensions must be positive"));
				}
				if video.data.is_empty() {
					return Err(Error::InvalidFrame("video frame has no data"));
				}
			}
			Media::Audio(audio) => {
				let channels = u32::try_from(audio.channels).unwrap_or(0);
				if channels == 0 || channels > MAX_AUDIO_CHANNELS {
					return Err(Error::InvalidFrame("audio channels out of range"));
				}
				let samples = usize::try_from(audio.samples_per_channel)
					.map_err(|_| Error::InvalidFrame("negative samples per channel"))?;
				if audio.data.len() < samples.saturating_mul(channels as usize * 4) {
					return Err(Error::InvalidFrame("audio data shorter than samples * channels"));
				}
			}
			Media::Metadata(xml) => {
				if xml.len() >= MAX_METADATA_LENGTH {
					return Err(Error::InvalidFrame("metadata too large"));
				}
			}
		}

		Ok(())
	}
}
