//! Named constants for the `c_int` fields and parameters of the C API.
//!
//! Each enum is `int` sized in the generated header, so the values can be passed wherever a frame
//! type, codec, quality or flag set is expected.

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OMTFrameType {
	None = 0,
	Metadata = 1,
	Video = 2,
	Audio = 4,
}

/// A FourCC codec; the first character is the least significant byte.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OMTCodec {
	VMX1 = 0x31584D56,
	/// Planar 32-bit float audio.
	FPA1 = 0x31415046,
	UYVY = 0x59565955,
	YUY2 = 0x32595559,
	BGRA = 0x41524742,
	NV12 = 0x3231564E,
	YV12 = 0x32315659,
	UYVA = 0x41565955,
	P216 = 0x36313250,
	PA16 = 0x36314150,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OMTQuality {
	Default = 0,
	Low = 1,
	Medium = 50,
	High = 100,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OMTColorSpace {
	Undefined = 0,
	BT601 = 601,
	BT709 = 709,
}

/// Bits of `OMTMediaFrame::Flags`, combined with `|`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OMTVideoFlags {
	None = 0,
	Interlaced = 1,
	Alpha = 2,
	PreMultiplied = 4,
	Preview = 8,
	HighBitDepth = 16,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OMTPreferredVideoFormat {
	UYVY = 0,
	UYVYorBGRA = 1,
	BGRA = 2,
	UYVYorUYVA = 3,
	UYVYorUYVAorP216orPA16 = 4,
	P216 = 5,
}

/// Bits accepted by `omt_receive_create`, combined with `|`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OMTReceiveFlags {
	None = 0,
	Preview = 1,
	IncludeCompressed = 2,
	CompressedOnly = 4,
}
