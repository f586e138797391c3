use std::ffi::{c_char, c_int};
use std::path::PathBuf;

use omt_lite::{FrameTypes, PreferredVideoFormat, Quality, ReceiveFlags};

use crate::{codec, ffi, log, Context, Error, Id, OMTMediaFrame, OMTSenderInfo, OMTStatistics, OMTTally};

/// A sender handle. Never dereferenced: the pointer value is the handle.
#[allow(non_camel_case_types)]
pub struct omt_send_t {
	_private: [u8; 0],
}

/// A receiver handle. Never dereferenced: the pointer value is the handle.
#[allow(non_camel_case_types)]
pub struct omt_receive_t {
	_private: [u8; 0],
}

fn frame_types(value: c_int) -> FrameTypes {
	FrameTypes::from_bits_truncate(value)
}

/// Copy a caller frame, which must be non-null.
unsafe fn read_frame(frame: *const OMTMediaFrame) -> Result<omt_lite::MediaFrame, Error> {
	let frame = unsafe { frame.as_ref() }.ok_or(Error::InvalidPointer)?;
	unsafe { frame.read() }
}

/// Return the addresses of every sender currently visible.
///
/// The array and its strings stay valid until the next call. Returns null with `count` set to 0
/// when nothing has been found, or null without touching `count` if `count` is null.
///
/// # Safety
/// - `count` must be null or a valid pointer to an int.
#[no_mangle]
pub unsafe extern "C" fn omt_discovery_getaddresses(count: *mut c_int) -> *mut *mut c_char {
	ffi::enter("omt_discovery_getaddresses", || {
		let count = unsafe { count.as_mut() }.ok_or(Error::InvalidPointer)?;
		Context::global().discovery()?.addresses(count)
	})
}

/// Create a receiver for `address`, either a discovery name or an `omt://host:port` URL.
///
/// Returns null on failure; see [omt_last_error].
///
/// # Safety
/// - `address` must be a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn omt_receive_create(
	address: *const c_char,
	frame_types_mask: c_int,
	format: c_int,
	flags: c_int,
) -> *mut omt_receive_t {
	ffi::enter("omt_receive_create", || {
		let address = unsafe { codec::read_str(address) }?;
		let id = Context::global().receive_create(
			address,
			frame_types(frame_types_mask),
			PreferredVideoFormat::from(format),
			ReceiveFlags::from_bits_truncate(flags),
		)?;
		Ok(id.into_ptr())
	})
}

/// Destroy a receiver, freeing every frame it returned. The handle must not be used again.
///
/// # Safety
/// - No other call may be in flight on `instance`.
#[no_mangle]
pub unsafe extern "C" fn omt_receive_destroy(instance: *mut omt_receive_t) {
	ffi::enter("omt_receive_destroy", || Context::global().receive_destroy(Id::from_ptr(instance)?))
}

/// Wait up to `timeout_milliseconds` for a frame of any of `frame_types_mask`.
///
/// The frame is valid until the next call returning the same frame type, or until destroyed.
/// Returns null on timeout.
///
/// # Safety
/// - `instance` must be null or a handle from [omt_receive_create].
#[no_mangle]
pub unsafe extern "C" fn omt_receive(
	instance: *mut omt_receive_t,
	frame_types_mask: c_int,
	timeout_milliseconds: c_int,
) -> *mut OMTMediaFrame {
	ffi::enter("omt_receive", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance
			.as_receive()?
			.receive(frame_types(frame_types_mask), ffi::parse_timeout(timeout_milliseconds))
	})
}

/// Send a metadata frame back to the sender, returning the bytes sent.
///
/// # Safety
/// - `frame` must point to a valid frame whose buffers match their lengths.
#[no_mangle]
pub unsafe extern "C" fn omt_receive_send(instance: *mut omt_receive_t, frame: *const OMTMediaFrame) -> c_int {
	ffi::enter("omt_receive_send", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let frame = unsafe { read_frame(frame) }?;
		instance.as_receive()?.send(frame)
	})
}

/// Set the tally of this receiver. The sender sees the combined tally of all receivers.
///
/// # Safety
/// - `tally` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_receive_settally(instance: *mut omt_receive_t, tally: *const OMTTally) {
	ffi::enter("omt_receive_settally", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let tally = unsafe { tally.as_ref() }.ok_or(Error::InvalidPointer)?;
		instance.as_receive()?.set_tally((*tally).into());
		Ok(())
	})
}

/// Wait up to `timeout_milliseconds` for the tally to change.
///
/// Returns 1 if it changed, 0 otherwise. The current tally is written either way. A null `tally`
/// returns 0 immediately.
///
/// # Safety
/// - `tally` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_receive_gettally(
	instance: *mut omt_receive_t,
	timeout_milliseconds: c_int,
	tally: *mut OMTTally,
) -> c_int {
	ffi::enter("omt_receive_gettally", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let out = unsafe { tally.as_mut() }.ok_or(Error::InvalidPointer)?;
		instance
			.as_receive()?
			.tally(ffi::parse_timeout(timeout_milliseconds), Some(out))
	})
}

/// Change the receive flags, effective from the next frame.
///
/// # Safety
/// - `instance` must be null or a handle from [omt_receive_create].
#[no_mangle]
pub unsafe extern "C" fn omt_receive_setflags(instance: *mut omt_receive_t, flags: c_int) {
	ffi::enter("omt_receive_setflags", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance.as_receive()?.set_flags(ReceiveFlags::from_bits_truncate(flags));
		Ok(())
	})
}

/// Suggest a video quality to the sender.
///
/// # Safety
/// - `instance` must be null or a handle from [omt_receive_create].
#[no_mangle]
pub unsafe extern "C" fn omt_receive_setsuggestedquality(instance: *mut omt_receive_t, quality: c_int) {
	ffi::enter("omt_receive_setsuggestedquality", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance
			.as_receive()?
			.set_suggested_quality(Quality::from_level(quality));
		Ok(())
	})
}

/// Fill `info` with what the sender published about itself; left untouched if nothing was published.
///
/// # Safety
/// - `info` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_receive_getsenderinformation(instance: *mut omt_receive_t, info: *mut OMTSenderInfo) {
	ffi::enter("omt_receive_getsenderinformation", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let sender_info = instance.as_receive()?.sender_information();
		if let (Some(sender_info), Some(out)) = (sender_info, unsafe { info.as_mut() }) {
			out.write(&sender_info);
		}
		Ok(())
	})
}

/// # Safety
/// - `stats` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_receive_getvideostatistics(instance: *mut omt_receive_t, stats: *mut OMTStatistics) {
	ffi::enter("omt_receive_getvideostatistics", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance.as_receive()?.video_statistics(unsafe { stats.as_mut() });
		Ok(())
	})
}

/// # Safety
/// - `stats` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_receive_getaudiostatistics(instance: *mut omt_receive_t, stats: *mut OMTStatistics) {
	ffi::enter("omt_receive_getaudiostatistics", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance.as_receive()?.audio_statistics(unsafe { stats.as_mut() });
		Ok(())
	})
}

/// Create a sender published as `HOSTNAME (name)`.
///
/// Returns null on failure; see [omt_last_error].
///
/// # Safety
/// - `name` must be a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn omt_send_create(name: *const c_char, quality: c_int) -> *mut omt_send_t {
	ffi::enter("omt_send_create", || {
		let name = unsafe { codec::read_str(name) }?;
		let id = Context::global().send_create(name, Quality::from_level(quality))?;
		Ok(id.into_ptr())
	})
}

/// # Safety
/// - `info` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_send_setsenderinformation(instance: *mut omt_send_t, info: *const OMTSenderInfo) {
	ffi::enter("omt_send_setsenderinformation", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let info = unsafe { info.as_ref() }.ok_or(Error::InvalidPointer)?;
		instance.as_send()?.set_sender_information(info.read());
		Ok(())
	})
}

/// Add XML sent to every receiver when it connects, and now to those already connected.
///
/// # Safety
/// - `metadata` must be null or a null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn omt_send_addconnectionmetadata(instance: *mut omt_send_t, metadata: *const c_char) {
	ffi::enter("omt_send_addconnectionmetadata", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let metadata = unsafe { codec::read_string_lossy(metadata) }.ok_or(Error::InvalidPointer)?;
		instance.as_send()?.add_connection_metadata(&metadata)
	})
}

/// # Safety
/// - `instance` must be null or a handle from [omt_send_create].
#[no_mangle]
pub unsafe extern "C" fn omt_send_clearconnectionmetadata(instance: *mut omt_send_t) {
	ffi::enter("omt_send_clearconnectionmetadata", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance.as_send()?.clear_connection_metadata();
		Ok(())
	})
}

/// Send new receivers to `new_address` instead. Null or an empty string stops redirecting.
///
/// # Safety
/// - `new_address` must be null or a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn omt_send_setredirect(instance: *mut omt_send_t, new_address: *const c_char) {
	ffi::enter("omt_send_setredirect", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let address = match new_address.is_null() {
			true => None,
			false => Some(unsafe { codec::read_str(new_address) }?).filter(|address| !address.is_empty()),
		};
		instance.as_send()?.set_redirect(address)
	})
}

/// Write the discovery address into `address`.
///
/// Pass null to get the required length, terminator included. Returns 0 if `max_length` is not
/// larger than that.
///
/// # Safety
/// - `address` must be null or valid for `max_length` bytes.
#[no_mangle]
pub unsafe extern "C" fn omt_send_getaddress(
	instance: *mut omt_send_t,
	address: *mut c_char,
	max_length: c_int,
) -> c_int {
	ffi::enter("omt_send_getaddress", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		match instance.as_send()?.address() {
			Some(value) => Ok(unsafe { codec::write_string(&value, address, max_length) }),
			None => Ok(0),
		}
	})
}

/// Destroy a sender, freeing any frame it returned. The handle must not be used again.
///
/// # Safety
/// - No other call may be in flight on `instance`.
#[no_mangle]
pub unsafe extern "C" fn omt_send_destroy(instance: *mut omt_send_t) {
	ffi::enter("omt_send_destroy", || Context::global().send_destroy(Id::from_ptr(instance)?))
}

/// Send a frame to every connected receiver, returning the bytes sent.
///
/// # Safety
/// - `frame` must point to a valid frame whose buffers match their lengths.
#[no_mangle]
pub unsafe extern "C" fn omt_send(instance: *mut omt_send_t, frame: *const OMTMediaFrame) -> c_int {
	ffi::enter("omt_send", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let frame = unsafe { read_frame(frame) }?;
		instance.as_send()?.send(frame)
	})
}

/// The number of connections; each receiver uses one for video and metadata plus one for audio.
///
/// # Safety
/// - `instance` must be null or a handle from [omt_send_create].
#[no_mangle]
pub unsafe extern "C" fn omt_send_connections(instance: *mut omt_send_t) -> c_int {
	ffi::enter("omt_send_connections", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		Ok(instance.as_send()?.connections())
	})
}

/// Wait up to `timeout_milliseconds` for metadata from a receiver.
///
/// The frame is valid until the next call or until destroyed. Returns null on timeout.
///
/// # Safety
/// - `instance` must be null or a handle from [omt_send_create].
#[no_mangle]
pub unsafe extern "C" fn omt_send_receive(
	instance: *mut omt_send_t,
	timeout_milliseconds: c_int,
) -> *mut OMTMediaFrame {
	ffi::enter("omt_send_receive", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance.as_send()?.receive(ffi::parse_timeout(timeout_milliseconds))
	})
}

/// Wait up to `timeout_milliseconds` for the combined tally of all receivers to change.
///
/// Returns 1 if it changed, 0 otherwise. The current tally is written either way.
///
/// # Safety
/// - `tally` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_send_gettally(
	instance: *mut omt_send_t,
	timeout_milliseconds: c_int,
	tally: *mut OMTTally,
) -> c_int {
	ffi::enter("omt_send_gettally", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		let out = unsafe { tally.as_mut() };
		instance.as_send()?.tally(ffi::parse_timeout(timeout_milliseconds), out)
	})
}

/// # Safety
/// - `stats` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_send_getvideostatistics(instance: *mut omt_send_t, stats: *mut OMTStatistics) {
	ffi::enter("omt_send_getvideostatistics", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance.as_send()?.video_statistics(unsafe { stats.as_mut() });
		Ok(())
	})
}

/// # Safety
/// - `stats` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn omt_send_getaudiostatistics(instance: *mut omt_send_t, stats: *mut OMTStatistics) {
	ffi::enter("omt_send_getaudiostatistics", || {
		let instance = Context::global().get(Id::from_ptr(instance)?)?;
		instance.as_send()?.audio_statistics(unsafe { stats.as_mut() });
		Ok(())
	})
}

/// Log to `filename` from now on. Null disables logging to a file.
///
/// # Safety
/// - `filename` must be null or a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn omt_setloggingfilename(filename: *const c_char) {
	ffi::enter("omt_setloggingfilename", || {
		let path = match filename.is_null() {
			true => None,
			false => Some(PathBuf::from(unsafe { codec::read_str(filename) }?)),
		};
		log::set_file(path);
		Ok(())
	})
}

/// Change which events are logged, using a level like `debug` or a list of filter directives.
///
/// Returns 1 on success, 0 if `filter` could not be parsed.
///
/// # Safety
/// - `filter` must be a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn omt_setloglevel(filter: *const c_char) -> c_int {
	ffi::enter("omt_setloglevel", || {
		log::set_filter(unsafe { codec::read_str(filter) }?)?;
		Ok(1)
	})
}

/// Copy the message of the last failure on this thread into `buffer`.
///
/// Uses the same length protocol as [omt_send_getaddress]. Returns 0 if nothing has failed yet.
///
/// # Safety
/// - `buffer` must be null or valid for `max_length` bytes.
#[no_mangle]
pub unsafe extern "C" fn omt_last_error(buffer: *mut c_char, max_length: c_int) -> c_int {
	unsafe { ffi::last_error(buffer, max_length) }
}

/// Write a setting into `value` using the same length protocol as [omt_send_getaddress].
///
/// Returns 0 if the setting doesn't exist.
///
/// # Safety
/// - `name` must be a null-terminated UTF-8 string.
/// - `value` must be null or valid for `max_length` bytes.
#[no_mangle]
pub unsafe extern "C" fn omt_settings_get_string(name: *const c_char, value: *mut c_char, max_length: c_int) -> c_int {
	ffi::enter("omt_settings_get_string", || {
		let name = unsafe { codec::read_str(name) }?;
		match Context::global().settings().string(name) {
			Some(setting) => Ok(unsafe { codec::write_string(&setting, value, max_length) }),
			None => Ok(0),
		}
	})
}

/// # Safety
/// - `name` and `value` must be null-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn omt_settings_set_string(name: *const c_char, value: *const c_char) {
	ffi::enter("omt_settings_set_string", || {
		let name = unsafe { codec::read_str(name) }?;
		let value = unsafe { codec::read_str(value) }?;
		Context::global().settings().set_string(name, value);
		Ok(())
	})
}

/// Returns 0 if the setting doesn't exist or isn't a number.
///
/// # Safety
/// - `name` must be a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn omt_settings_get_integer(name: *const c_char) -> c_int {
	ffi::enter("omt_settings_get_integer", || {
		let name = unsafe { codec::read_str(name) }?;
		Ok(Context::global().settings().integer(name).unwrap_or(0))
	})
}

/// # Safety
/// - `name` must be a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn omt_settings_set_integer(name: *const c_char, value: c_int) {
	ffi::enter("omt_settings_set_integer", || {
		let name = unsafe { codec::read_str(name) }?;
		Context::global().settings().set_integer(name, value);
		Ok(())
	})
}
